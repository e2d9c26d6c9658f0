//! Project description loading.
//!
//! A `Kilnfile` is parsed in two steps: YAML into a [`ManifestValue`], then
//! the value into [`KilnManifest`]. Splitting the steps keeps syntax errors
//! (with source spans) apart from structural ones (unknown keys, wrong
//! types). [`populate`] then applies the description to a target graph,
//! evaluating `when` conditions against the variant.

use anyhow::{Context, Result};
use semver::VersionReq;
use std::{fs, path::Path};

use crate::ast::KilnManifest;

mod conditions;
mod diagnostics;
mod hints;
mod populate;

pub use conditions::Conditions;
pub use diagnostics::{ManifestError, ManifestName, ManifestSource, map_data_error, map_yaml_error};
pub use populate::populate;

/// Untyped document produced by the YAML parser.
pub type ManifestValue = serde_json::Value;

/// Default file name of a project description.
pub const DEFAULT_MANIFEST: &str = "Kilnfile";

/// Range of `kiln_version` values this build understands.
const SUPPORTED_VERSIONS: &str = "^1";

/// Parse a description labelled `name` in diagnostics.
///
/// # Errors
///
/// Returns [`ManifestError::Parse`] for malformed YAML or an invalid
/// structure, and [`ManifestError::UnsupportedVersion`] for incompatible
/// format versions.
pub fn from_str_named(yaml: &str, name: &ManifestName) -> Result<KilnManifest, ManifestError> {
    let doc: ManifestValue = serde_saphyr::from_str(yaml).map_err(|e| ManifestError::Parse {
        source: map_yaml_error(e, &ManifestSource::from(yaml), name),
        name: name.clone(),
    })?;
    let manifest: KilnManifest =
        serde_json::from_value(doc).map_err(|e| ManifestError::Parse {
            source: map_data_error(e, name),
            name: name.clone(),
        })?;
    check_version(&manifest, name)?;
    Ok(manifest)
}

fn check_version(manifest: &KilnManifest, name: &ManifestName) -> Result<(), ManifestError> {
    let supported = VersionReq::parse(SUPPORTED_VERSIONS).unwrap_or(VersionReq::STAR);
    if supported.matches(&manifest.kiln_version) {
        Ok(())
    } else {
        Err(ManifestError::UnsupportedVersion {
            name: name.clone(),
            version: manifest.kiln_version.clone(),
            supported,
        })
    }
}

/// Parse a description held in memory.
///
/// # Errors
///
/// See [`from_str_named`].
pub fn from_str(yaml: &str) -> Result<KilnManifest, ManifestError> {
    from_str_named(yaml, &ManifestName::new(DEFAULT_MANIFEST))
}

/// Load a [`KilnManifest`] from `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or does not parse.
pub fn from_path(path: impl AsRef<Path>) -> Result<KilnManifest> {
    let path_ref = path.as_ref();
    let data = fs::read_to_string(path_ref)
        .with_context(|| format!("failed to read {}", path_ref.display()))?;
    let name = ManifestName::new(path_ref.display().to_string());
    Ok(from_str_named(&data, &name)?)
}
