//! Ready-made variants for tests that bypass the command line.

use camino::Utf8Path;
use kiln::variant::{Invocation, Platform, RenderBackend, Variant};

/// A non-debug, non-optimised OpenGL variant rooted at `source_dir`.
///
/// The invocation replays `/usr/bin/kiln` from `source_dir` without
/// arguments and the output directory is `build`.
pub fn variant(platform: Platform, source_dir: &Utf8Path) -> Variant {
    Variant {
        platform,
        render: RenderBackend::OpenGl,
        debug: false,
        optimize: false,
        out_dir: source_dir.join("build"),
        source_dir: source_dir.to_path_buf(),
        generator: None,
        invocation: Invocation::new("/usr/bin/kiln", Vec::new(), source_dir),
    }
}
