//! Helpers for working with the system `ninja` binary in integration tests.

use camino::Utf8Path;
use std::process::{Command, ExitStatus, Output};
use thiserror::Error;

/// Errors that can occur when asking Ninja to check a build file.
#[derive(Error, Debug)]
pub enum NinjaUnavailable {
    /// `ninja --version` failed to spawn, most likely because Ninja is not
    /// present in `PATH`.
    #[error("failed to spawn `ninja --version`: {0}")]
    Spawn(#[source] std::io::Error),
    /// `ninja --version` executed but returned a non-success status.
    #[error("`ninja --version` returned non-success status: {0}")]
    Failed(ExitStatus),
}

/// Check that Ninja is installed. Callers should skip their scenario when
/// this returns `Err`.
pub fn ninja_installed() -> Result<(), NinjaUnavailable> {
    let output = Command::new("ninja")
        .arg("--version")
        .output()
        .map_err(NinjaUnavailable::Spawn)?;
    if !output.status.success() {
        return Err(NinjaUnavailable::Failed(output.status));
    }
    Ok(())
}

/// Run `ninja -n` over the build file in `build_dir` without building
/// anything, returning the process output.
pub fn dry_run(build_dir: &Utf8Path, targets: &[&str]) -> std::io::Result<Output> {
    Command::new("ninja")
        .arg("-n")
        .arg("-C")
        .arg(build_dir.as_str())
        .args(targets)
        .output()
}
