//! YAML parsing diagnostics.
//!
//! Converts `serde_saphyr` parse errors into [`miette`] diagnostics pointing
//! at the offending character of the project description, with a hint for
//! common mistakes such as tab indentation.

use super::{ManifestName, ManifestSource};
use crate::manifest::hints::YAML_HINTS;
use miette::{Diagnostic, NamedSource, SourceSpan};
use serde_saphyr::{Error as YamlError, Location};
use thiserror::Error;

/// Byte offset of a one-based line and column.
///
/// Columns past the end of the line clamp to its end; `\r\n` endings are
/// handled like `\n`.
fn byte_index(src: &str, line: u64, column: u64) -> usize {
    let target_line = usize::try_from(line.saturating_sub(1)).unwrap_or(usize::MAX);
    let target_column = usize::try_from(column.saturating_sub(1)).unwrap_or(usize::MAX);
    let mut offset = 0usize;
    for (idx, segment) in src.split_inclusive('\n').enumerate() {
        if idx == target_line {
            let line_text = segment.trim_end_matches(['\n', '\r']);
            let column_offset = line_text
                .char_indices()
                .nth(target_column)
                .map_or(line_text.len(), |(byte_idx, _)| byte_idx);
            return offset + column_offset;
        }
        offset += segment.len();
    }
    src.len()
}

fn to_span(src: &ManifestSource, loc: Location) -> SourceSpan {
    let at = byte_index(src.as_str(), loc.line(), loc.column());
    let bytes = src.as_str().as_bytes();
    let is_line_break = |b: u8| b == b'\n' || b == b'\r';
    let (start, end) = match bytes.get(at) {
        Some(&b) if !is_line_break(b) => (at, at + 1),
        _ => {
            let start = if at > 0 && bytes.get(at - 1).is_some_and(|p| !is_line_break(*p)) {
                at - 1
            } else {
                at
            };
            (start, at)
        }
    };
    SourceSpan::new(start.into(), end.saturating_sub(start))
}

#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(kiln::yaml::parse))]
struct YamlDiagnostic {
    #[source_code]
    src: NamedSource<String>,
    #[label("parse error here")]
    span: Option<SourceSpan>,
    #[help]
    help: Option<String>,
    #[source]
    source: YamlError,
    message: String,
}

fn has_tab_indent(src: &ManifestSource, location: Option<Location>) -> bool {
    let Some(loc) = location else {
        return false;
    };
    let line_idx = usize::try_from(loc.line().saturating_sub(1)).unwrap_or(usize::MAX);
    src.as_str()
        .lines()
        .nth(line_idx)
        .unwrap_or_default()
        .chars()
        .take_while(|c| c.is_whitespace())
        .any(|c| c == '\t')
}

fn hint_for(err_str: &str, src: &ManifestSource, loc: Option<Location>) -> Option<String> {
    if has_tab_indent(src, loc) {
        return Some("Use spaces for indentation; tabs are invalid in YAML.".into());
    }
    let lower = err_str.to_lowercase();
    YAML_HINTS
        .iter()
        .find(|(needle, _)| lower.contains(*needle))
        .map(|(_, hint)| (*hint).into())
}

/// Map a `serde_saphyr` parse error into a [`miette`] diagnostic.
///
/// Errors without a location are reported at line 1, column 1.
#[must_use]
pub fn map_yaml_error(
    err: YamlError,
    src: &ManifestSource,
    name: &ManifestName,
) -> Box<dyn Diagnostic + Send + Sync + 'static> {
    let loc = err.location();
    let (line, col, span) = loc.map_or((1, 1, None), |l| {
        (l.line(), l.column(), Some(to_span(src, l)))
    });
    let err_str = err.to_string();
    let help = hint_for(&err_str, src, loc);
    Box::new(YamlDiagnostic {
        src: NamedSource::new(name.as_str(), src.as_str().to_owned()),
        span,
        help,
        source: err,
        message: format!("YAML parse error at line {line}, column {col}: {err_str}"),
    })
}
