//! Error types for the runner module.

// Scoped suppression for version-dependent lint false positives from
// miette/thiserror derive macros.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

/// Errors raised while orchestrating a configuration run.
#[derive(Debug, Error, Diagnostic)]
pub enum RunnerError {
    /// The project description does not exist.
    #[error("no {manifest_name} found in {directory}")]
    #[diagnostic(
        code(kiln::runner::manifest_not_found),
        help("create a {manifest_name} or point at one with --file")
    )]
    ManifestNotFound {
        /// Expected file name.
        manifest_name: String,
        /// Directory that was searched.
        directory: Utf8PathBuf,
    },

    /// The description path names a directory or ends in `..`.
    #[error("'{path}' does not name a file")]
    #[diagnostic(code(kiln::runner::manifest_path))]
    ManifestPathMissingName {
        /// Path as resolved.
        path: Utf8PathBuf,
    },

    /// A command line path is not valid UTF-8.
    #[error("path is not valid UTF-8: {path}")]
    #[diagnostic(code(kiln::runner::non_utf8_path))]
    NonUtf8Path {
        /// Lossy rendering of the path.
        path: String,
    },
}
