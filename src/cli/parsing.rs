//! CLI parsing helpers for clap value parsers.

use crate::variant::{Platform, RenderBackend};

/// Parse a render backend name, listing the accepted names on failure.
pub(super) fn parse_render_backend(s: &str) -> Result<RenderBackend, String> {
    s.parse().map_err(|err: crate::variant::VariantError| err.to_string())
}

/// Parse a platform override such as `linux` or `windows`.
pub(super) fn parse_platform(s: &str) -> Result<Platform, String> {
    s.trim()
        .to_ascii_lowercase()
        .parse()
        .map_err(|err: crate::variant::VariantError| err.to_string())
}
