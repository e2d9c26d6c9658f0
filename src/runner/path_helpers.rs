//! Path resolution helpers for the runner module.
//!
//! Keeps project description lookup out of the orchestration code.

use camino::{Utf8Path, Utf8PathBuf};

use super::RunnerError;
use crate::cli::Cli;

/// Absolute path of the project description named on the command line.
///
/// Relative paths are taken against `working_dir`.
///
/// # Errors
///
/// Returns [`RunnerError::NonUtf8Path`] when `--file` is not UTF-8 and
/// [`RunnerError::ManifestPathMissingName`] when it names no file.
pub(super) fn resolve_manifest_path(
    cli: &Cli,
    working_dir: &Utf8Path,
) -> Result<Utf8PathBuf, RunnerError> {
    let file = Utf8PathBuf::from_path_buf(cli.file.clone()).map_err(|path| {
        RunnerError::NonUtf8Path {
            path: path.display().to_string(),
        }
    })?;
    let resolved = if file.is_absolute() {
        file
    } else {
        working_dir.join(file)
    };
    if resolved.file_name().is_none() {
        return Err(RunnerError::ManifestPathMissingName { path: resolved });
    }
    Ok(resolved)
}

/// Directory holding the project description, exposed as `$root`.
pub(super) fn source_dir(manifest_path: &Utf8Path) -> Utf8PathBuf {
    manifest_path
        .parent()
        .map_or_else(|| Utf8PathBuf::from("/"), Utf8Path::to_path_buf)
}

/// Fail with a readable error when the description is absent.
///
/// # Errors
///
/// Returns [`RunnerError::ManifestNotFound`] if nothing exists at the path.
pub(super) fn ensure_manifest_exists(manifest_path: &Utf8Path) -> Result<(), RunnerError> {
    if manifest_path.exists() {
        return Ok(());
    }
    Err(RunnerError::ManifestNotFound {
        manifest_name: manifest_path.file_name().unwrap_or_default().to_owned(),
        directory: source_dir(manifest_path),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Kilnfile", "/work/Kilnfile")]
    #[case("proj/Kilnfile", "/work/proj/Kilnfile")]
    #[case("/abs/Kilnfile", "/abs/Kilnfile")]
    fn description_paths_are_absolute(#[case] file: &str, #[case] expected: &str) {
        let cli = Cli {
            file: file.into(),
            ..Cli::default()
        };
        let resolved = resolve_manifest_path(&cli, Utf8Path::new("/work")).expect("resolves");
        assert_eq!(resolved, expected);
        assert_eq!(source_dir(&resolved), Utf8Path::new(expected).parent().expect("parent"));
    }

    #[test]
    fn directories_are_not_descriptions() {
        let cli = Cli {
            file: "proj/..".into(),
            ..Cli::default()
        };
        let err = resolve_manifest_path(&cli, Utf8Path::new("/work")).expect_err("no file name");
        assert!(matches!(err, RunnerError::ManifestPathMissingName { .. }));
    }

    #[test]
    fn missing_descriptions_name_the_directory() {
        let err = ensure_manifest_exists(Utf8Path::new("/nowhere/at/all/Kilnfile"))
            .expect_err("missing");
        assert_eq!(err.to_string(), "no Kilnfile found in /nowhere/at/all");
    }
}
