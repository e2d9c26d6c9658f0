//! Helpers for constructing project description fixtures in tests.

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use tempfile::TempDir;

/// Prefix the provided description body with the standard version header.
pub fn manifest_yaml(body: &str) -> String {
    format!("kiln_version: 1.0.0\n{body}")
}

/// A temporary project directory holding a `Kilnfile`.
#[derive(Debug)]
pub struct Project {
    dir: TempDir,
    root: Utf8PathBuf,
}

impl Project {
    /// Create a project whose `Kilnfile` holds `yaml` verbatim.
    pub fn new(yaml: &str) -> Result<Self> {
        let dir = TempDir::new().context("create project dir")?;
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
            .map_err(|path| anyhow::anyhow!("non UTF-8 temp dir {}", path.display()))?;
        fs::write(root.join("Kilnfile"), yaml).context("write Kilnfile")?;
        Ok(Self { dir, root })
    }

    /// Create a project from a body without the version header.
    pub fn with_body(body: &str) -> Result<Self> {
        Self::new(&manifest_yaml(body))
    }

    /// Project directory.
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Path of the `Kilnfile`.
    pub fn manifest_path(&self) -> Utf8PathBuf {
        self.root.join("Kilnfile")
    }

    /// Default output directory inside the project.
    pub fn build_dir(&self) -> Utf8PathBuf {
        self.root.join("build")
    }

    /// Borrow the underlying temporary directory.
    pub const fn temp_dir(&self) -> &TempDir {
        &self.dir
    }
}
