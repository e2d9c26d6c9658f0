//! Variant configuration for a single configuration run.
//!
//! A [`Variant`] fixes the target platform, the render backend and the
//! debug/optimize switches before any rule or target is declared. Every other
//! component reads it; none mutate it. Validation happens once, up front, so
//! an unsupported combination aborts the run before graph construction.

// Scoped suppression for version-dependent lint false positives from
// miette/thiserror derive macros.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use camino::{Utf8Path, Utf8PathBuf};
use itertools::Itertools;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

use crate::cli::Cli;

/// Errors raised while validating the requested variant.
#[derive(Debug, Error, Diagnostic, PartialEq, Eq)]
pub enum VariantError {
    /// The host operating system has no toolchain table.
    #[error("unsupported platform '{os}'")]
    #[diagnostic(
        code(kiln::variant::platform),
        help("supported platforms: linux, windows")
    )]
    UnsupportedPlatform {
        /// Operating system identifier that was rejected.
        os: String,
    },

    /// The render backend string is not one of the known choices.
    #[error("unknown render backend '{value}' (expected one of: {expected})")]
    #[diagnostic(code(kiln::variant::backend))]
    UnknownBackend {
        /// Value supplied by the caller.
        value: String,
        /// Comma separated list of accepted values.
        expected: String,
    },

    /// The render backend cannot be built for the target platform.
    #[error("render backend '{backend}' is not available on {platform}")]
    #[diagnostic(code(kiln::variant::combination))]
    UnsupportedBackend {
        /// Requested backend.
        backend: RenderBackend,
        /// Target platform of the run.
        platform: Platform,
    },

    /// The process environment could not be inspected.
    #[error("cannot determine {detail}")]
    #[diagnostic(code(kiln::variant::environment))]
    Environment {
        /// What was being looked up, with the underlying failure.
        detail: String,
    },

    /// A path required by the run is not valid UTF-8.
    #[error("path '{path}' is not valid UTF-8")]
    #[diagnostic(code(kiln::variant::path))]
    NonUtf8Path {
        /// Lossy rendering of the offending path.
        path: String,
    },
}

/// Target platform of the generated build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Linux with the clang toolchain and GNU ar.
    Linux,
    /// Windows with clang against the MSVC runtime and `lld-link`.
    Windows,
}

impl Platform {
    /// Detect the platform the process is running on.
    ///
    /// # Errors
    ///
    /// Returns [`VariantError::UnsupportedPlatform`] when the host has no
    /// toolchain table.
    pub fn host() -> Result<Self, VariantError> {
        Self::from_os(std::env::consts::OS)
    }

    /// Map an operating system identifier (as in `std::env::consts::OS`).
    ///
    /// # Errors
    ///
    /// Returns [`VariantError::UnsupportedPlatform`] for unknown identifiers.
    pub fn from_os(os: &str) -> Result<Self, VariantError> {
        match os {
            "linux" => Ok(Self::Linux),
            "windows" => Ok(Self::Windows),
            other => Err(VariantError::UnsupportedPlatform {
                os: other.to_owned(),
            }),
        }
    }

    /// Lowercase identifier used in conditions and diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Windows => "windows",
        }
    }

    /// File extension of compiled objects.
    #[must_use]
    pub const fn object_extension(self) -> &'static str {
        match self {
            Self::Linux => "o",
            Self::Windows => "obj",
        }
    }

    /// Suffix appended to linked executables.
    #[must_use]
    pub const fn executable_suffix(self) -> &'static str {
        match self {
            Self::Linux => "",
            Self::Windows => ".exe",
        }
    }

    /// File name of the static archive for library `name`.
    #[must_use]
    pub fn archive_file_name(self, name: &str) -> String {
        match self {
            Self::Linux => format!("lib{name}.a"),
            Self::Windows => format!("{name}.lib"),
        }
    }
}

impl Display for Platform {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = VariantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_os(s.trim())
    }
}

/// Rendering backend compiled into the application.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderBackend {
    /// OpenGL, available everywhere.
    #[default]
    #[serde(rename = "opengl")]
    OpenGl,
    /// Direct3D 11, Windows only.
    #[serde(rename = "d3d11")]
    D3d11,
}

impl RenderBackend {
    /// Every backend, in the order they are listed to users.
    pub const ALL: [Self; 2] = [Self::OpenGl, Self::D3d11];

    /// Identifier accepted on the command line.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenGl => "opengl",
            Self::D3d11 => "d3d11",
        }
    }

    /// Whether the backend can be built for `platform`.
    #[must_use]
    pub const fn supported_on(self, platform: Platform) -> bool {
        match self {
            Self::OpenGl => true,
            Self::D3d11 => matches!(platform, Platform::Windows),
        }
    }
}

impl Display for RenderBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RenderBackend {
    type Err = VariantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|backend| backend.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| VariantError::UnknownBackend {
                value: wanted.to_owned(),
                expected: Self::ALL.iter().map(|b| b.as_str()).join(", "),
            })
    }
}

/// How the configuration step was invoked, replayed by the regeneration edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Absolute path of the configuring executable.
    pub program: Utf8PathBuf,
    /// Arguments passed after the program name.
    pub args: Vec<String>,
    /// Directory the configuration ran from.
    pub working_dir: Utf8PathBuf,
    /// Configuration files whose settings fed the run.
    pub config_files: Vec<Utf8PathBuf>,
}

impl Invocation {
    /// Describe an invocation explicitly.
    #[must_use]
    pub fn new(
        program: impl Into<Utf8PathBuf>,
        args: Vec<String>,
        working_dir: impl Into<Utf8PathBuf>,
    ) -> Self {
        Self {
            program: program.into(),
            args,
            working_dir: working_dir.into(),
            config_files: Vec::new(),
        }
    }

    /// Record the configuration files read for this run, anchoring relative
    /// paths at the working directory.
    #[must_use]
    pub fn with_config_files(mut self, files: impl IntoIterator<Item = Utf8PathBuf>) -> Self {
        self.config_files = files
            .into_iter()
            .map(|file| {
                if file.is_absolute() {
                    file
                } else {
                    self.working_dir.join(file)
                }
            })
            .collect();
        self
    }

    /// Capture the running process as the invocation to replay.
    ///
    /// # Errors
    ///
    /// Returns [`VariantError::Environment`] if the executable or working
    /// directory cannot be queried, or [`VariantError::NonUtf8Path`] if either
    /// is not UTF-8.
    pub fn current(args: Vec<String>) -> Result<Self, VariantError> {
        let program = std::env::current_exe().map_err(|err| VariantError::Environment {
            detail: format!("the current executable: {err}"),
        })?;
        let working_dir = std::env::current_dir().map_err(|err| VariantError::Environment {
            detail: format!("the working directory: {err}"),
        })?;
        Ok(Self {
            program: utf8(program)?,
            args,
            working_dir: utf8(working_dir)?,
            config_files: Vec::new(),
        })
    }
}

fn utf8(path: std::path::PathBuf) -> Result<Utf8PathBuf, VariantError> {
    Utf8PathBuf::from_path_buf(path).map_err(|invalid| VariantError::NonUtf8Path {
        path: invalid.display().to_string(),
    })
}

/// Immutable choices for one configuration run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    /// Platform the emitted toolchain commands target.
    pub platform: Platform,
    /// Render backend selected for the application.
    pub render: RenderBackend,
    /// Compile and link with debug information.
    pub debug: bool,
    /// Compile with optimisation.
    pub optimize: bool,
    /// Directory receiving `build.ninja` and every build artefact.
    pub out_dir: Utf8PathBuf,
    /// Absolute project source directory, exposed as `$root`.
    pub source_dir: Utf8PathBuf,
    /// Generator tool overriding the one named by the project description,
    /// made absolute against the invocation's working directory.
    pub generator: Option<Utf8PathBuf>,
    /// Invocation replayed when the configuration inputs change.
    pub invocation: Invocation,
}

impl Variant {
    /// Build a variant from merged CLI settings.
    ///
    /// `source_dir` is the absolute directory holding the project
    /// description.
    ///
    /// # Errors
    ///
    /// Returns a [`VariantError`] when the host platform is unsupported, a
    /// path is not UTF-8 or the backend is unavailable on the platform.
    pub fn from_cli(
        cli: &Cli,
        source_dir: Utf8PathBuf,
        invocation: Invocation,
    ) -> Result<Self, VariantError> {
        let platform = match cli.platform {
            Some(platform) => platform,
            None => Platform::host()?,
        };
        let generator = cli
            .generator
            .clone()
            .map(utf8)
            .transpose()?
            .map(|path| {
                if path.is_absolute() {
                    path
                } else {
                    invocation.working_dir.join(path)
                }
            });
        let variant = Self {
            platform,
            render: cli.render,
            debug: cli.debug,
            optimize: cli.optimize,
            out_dir: utf8(cli.out.clone())?,
            source_dir,
            generator,
            invocation,
        };
        variant.validate()?;
        Ok(variant)
    }

    /// Check that the platform and backend can be combined.
    ///
    /// # Errors
    ///
    /// Returns [`VariantError::UnsupportedBackend`] for combinations without
    /// a toolchain.
    pub const fn validate(&self) -> Result<(), VariantError> {
        if self.render.supported_on(self.platform) {
            Ok(())
        } else {
            Err(VariantError::UnsupportedBackend {
                backend: self.render,
                platform: self.platform,
            })
        }
    }

    /// Path of the emitted build description.
    #[must_use]
    pub fn build_file(&self) -> Utf8PathBuf {
        self.out_dir.join(BUILD_FILE_NAME)
    }

    /// The source directory as a borrowed path.
    #[must_use]
    pub fn source_dir(&self) -> &Utf8Path {
        &self.source_dir
    }
}

/// File name of the emitted build description inside the output directory.
pub const BUILD_FILE_NAME: &str = "build.ninja";
