//! Translates project description errors into actionable diagnostics.
//!
//! [`ManifestSource`] retains the YAML content and [`ManifestName`] labels its
//! origin. [`map_yaml_error`] and [`map_data_error`] convert parser and
//! deserialisation failures into [`miette`] diagnostics with spans, hints and
//! stable codes. [`ManifestError`] covers every failure between reading the
//! file and filling the target graph.
//
// Scoped suppression for version-dependent lint false positives from
// miette/thiserror derive macros.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use miette::Diagnostic;
use thiserror::Error;

use crate::graph::GraphError;

mod yaml;

pub use yaml::map_yaml_error;

/// YAML source content for a project description.
///
/// # Examples
/// ```rust
/// use kiln::manifest::ManifestSource;
/// let source = ManifestSource::from("targets: []");
/// assert_eq!(source.as_str(), "targets: []");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ManifestSource(String);

impl ManifestSource {
    /// Wrap YAML text.
    #[must_use]
    pub fn new(src: impl Into<String>) -> Self {
        Self(src.into())
    }

    /// View the stored source as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&str> for ManifestSource {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl AsRef<str> for ManifestSource {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

/// Display name for a project description used in diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ManifestName(String);

impl ManifestName {
    /// Label the description being processed.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Access the label.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&str> for ManifestName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl AsRef<str> for ManifestName {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for ManifestName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0.as_str())
    }
}

/// Errors raised while loading a project description or applying it.
#[derive(Debug, Error, Diagnostic)]
pub enum ManifestError {
    /// Parsing failed and produced the supplied diagnostic.
    #[error("failed to parse {name}")]
    #[diagnostic(code(kiln::manifest::parse))]
    Parse {
        /// Description being parsed.
        name: ManifestName,
        /// Underlying diagnostic reported by the parser or validator.
        #[source]
        #[diagnostic_source]
        source: Box<dyn Diagnostic + Send + Sync + 'static>,
    },

    /// The description targets an incompatible format version.
    #[error("{name} requires format {version}, this build understands {supported}")]
    #[diagnostic(code(kiln::manifest::version))]
    UnsupportedVersion {
        /// Description being parsed.
        name: ManifestName,
        /// Declared `kiln_version`.
        version: semver::Version,
        /// Accepted range.
        supported: semver::VersionReq,
    },

    /// A `when` expression could not be compiled or evaluated.
    #[error("invalid condition `{expression}`")]
    #[diagnostic(
        code(kiln::manifest::condition),
        help("conditions may use `platform`, `render`, `debug` and `optimize`")
    )]
    Condition {
        /// Expression as written.
        expression: String,
        /// Template engine failure.
        #[source]
        source: Box<minijinja::Error>,
    },

    /// A test target names no subject.
    #[error("test target '{target}' needs a `subject`")]
    #[diagnostic(code(kiln::manifest::missing_subject))]
    MissingSubject {
        /// Offending target.
        target: String,
    },

    /// A non-test target names a subject.
    #[error("only test targets take a `subject`, but '{target}' is a {kind}")]
    #[diagnostic(code(kiln::manifest::unexpected_subject))]
    UnexpectedSubject {
        /// Offending target.
        target: String,
        /// Declared kind.
        kind: crate::graph::TargetKind,
    },

    /// A file-scope flag block asked to be exported.
    #[error("file-scope {group:?} flags cannot be public")]
    #[diagnostic(code(kiln::manifest::public_global_flags))]
    PublicGlobalFlags {
        /// Group of the offending block.
        group: crate::graph::FlagGroup,
    },

    /// The target graph refused a declaration.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),
}

#[derive(Debug, Error, Diagnostic)]
#[error("{name} has an invalid structure: {source}")]
#[diagnostic(code(kiln::manifest::structure))]
struct DataDiagnostic {
    #[source]
    source: serde_json::Error,
    name: ManifestName,
}

/// Map a [`serde_json`] structural error into a diagnostic without a source
/// span. `serde_json` reports no byte offsets for data validation failures,
/// so the diagnostic only carries the description name and the message.
#[must_use]
pub fn map_data_error(
    err: serde_json::Error,
    name: &ManifestName,
) -> Box<dyn Diagnostic + Send + Sync + 'static> {
    Box::new(DataDiagnostic {
        source: err,
        name: name.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result, ensure};
    use serde_json::Value;

    #[test]
    fn map_data_error_formats_message_and_code() -> Result<()> {
        let name = ManifestName::new("Kilnfile");
        let err = serde_json::from_str::<Value>("{\"key\":}")
            .expect_err("expected serde_json parse error");
        let details = err.to_string();
        let diag = map_data_error(err, &name);
        let message = diag.to_string();
        ensure!(
            message == format!("Kilnfile has an invalid structure: {details}"),
            "unexpected message: {message}"
        );
        let code = diag
            .code()
            .map(|c| c.to_string())
            .context("structure diagnostic should expose a code")?;
        ensure!(
            code == "kiln::manifest::structure",
            "unexpected diagnostic code {code}"
        );
        Ok(())
    }

    #[test]
    fn parse_error_wraps_the_structure_diagnostic() -> Result<()> {
        let name = ManifestName::new("example");
        let err = serde_json::from_str::<Value>("not json")
            .expect_err("expected serde_json parse failure");
        let wrapped = ManifestError::Parse {
            source: map_data_error(err, &name),
            name,
        };
        ensure!(
            wrapped.to_string() == "failed to parse example",
            "unexpected outer error message: {wrapped}"
        );
        let inner_code = match &wrapped {
            ManifestError::Parse { source, .. } => source
                .code()
                .map(|c| c.to_string())
                .context("source diagnostic should have a code")?,
            other => anyhow::bail!("unexpected variant {other:?}"),
        };
        ensure!(
            inner_code == "kiln::manifest::structure",
            "unexpected inner diagnostic code {inner_code}"
        );
        Ok(())
    }
}
