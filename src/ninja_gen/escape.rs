//! Escaping and quoting for the emitted build file.
//!
//! Two layers apply. Ninja reads `$` sequences first, so paths escape spaces
//! and colons as `$ ` and `$:` and literal dollars as `$$`. Variable values
//! then reach a shell (or the Windows argument parser) after Ninja expands
//! them, so each word is also quoted for the target platform. Ninja variable
//! references (`$name`, `${name}`) are never quoted; they expand before the
//! shell runs.

use shell_quote::{QuoteRefExt, Sh};

use crate::variant::Platform;

/// Piece of a word as Ninja will read it.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment<'a> {
    /// Text with Ninja escapes already resolved.
    Literal(String),
    /// A variable reference, kept as written.
    Reference(&'a str),
}

fn is_varname_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-')
}

/// Split `word` into literal text and Ninja variable references.
///
/// `$$`, `$ ` and `$:` resolve to their literal character. A `$` that starts
/// no valid sequence is taken literally.
fn segments(word: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut literal = String::new();
    let mut rest = word;
    while let Some(pos) = rest.find('$') {
        let (before, from_dollar) = rest.split_at(pos);
        literal.push_str(before);
        let after = from_dollar.get(1..).unwrap_or_default();
        let mut chars = after.chars();
        let reference_len = match chars.next() {
            Some(ch @ ('$' | ' ' | ':')) => {
                literal.push(ch);
                rest = after.get(1..).unwrap_or_default();
                continue;
            }
            Some('{') => after.find('}').map(|close| close + 1),
            Some(ch) if is_varname_char(ch) => {
                Some(after.find(|c: char| !is_varname_char(c)).unwrap_or(after.len()))
            }
            _ => None,
        };
        match reference_len {
            Some(len) => {
                if !literal.is_empty() {
                    out.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                out.push(Segment::Reference(from_dollar.get(..=len).unwrap_or(from_dollar)));
                rest = after.get(len..).unwrap_or_default();
            }
            None => {
                literal.push('$');
                rest = after;
            }
        }
    }
    literal.push_str(rest);
    if !literal.is_empty() {
        out.push(Segment::Literal(literal));
    }
    out
}

/// Escape a path for use on a `build` or `default` line.
///
/// Spaces and colons gain a `$` prefix; variable references and existing
/// escapes are kept.
#[must_use]
pub fn escape_path(path: &str) -> String {
    segments(path)
        .into_iter()
        .map(|segment| match segment {
            Segment::Reference(reference) => reference.to_owned(),
            Segment::Literal(text) => text
                .chars()
                .map(|ch| match ch {
                    '$' => String::from("$$"),
                    ' ' => String::from("$ "),
                    ':' => String::from("$:"),
                    other => other.to_string(),
                })
                .collect(),
        })
        .collect()
}

/// Escape literal text so Ninja reads it back unchanged.
#[must_use]
pub fn escape_literal(text: &str) -> String {
    text.replace('$', "$$")
}

fn is_shell_safe(platform: Platform, ch: char) -> bool {
    ch.is_ascii_alphanumeric()
        || matches!(ch, '-' | '_' | '.' | '/' | '=' | '+' | ',' | ':' | '@')
        || (platform == Platform::Windows && ch == '\\')
}

fn quote_posix(text: &str) -> String {
    let bytes: Vec<u8> = text.quoted(Sh);
    match String::from_utf8(bytes) {
        Ok(quoted) => quoted,
        Err(err) => {
            debug_assert!(false, "shell quoting produced non UTF-8 bytes: {err}");
            String::from_utf8_lossy(err.as_bytes()).into_owned()
        }
    }
}

/// Quote for the argument splitting rules of the Microsoft C runtime.
fn quote_msvc(text: &str) -> String {
    let mut buf = String::with_capacity(text.len() + 2);
    buf.push('"');
    let mut backslashes = 0_usize;
    for ch in text.chars() {
        match ch {
            '\\' => backslashes += 1,
            '"' => {
                buf.push_str(&"\\".repeat(backslashes * 2 + 1));
                buf.push('"');
                backslashes = 0;
            }
            other => {
                buf.push_str(&"\\".repeat(backslashes));
                buf.push(other);
                backslashes = 0;
            }
        }
    }
    buf.push_str(&"\\".repeat(backslashes * 2));
    buf.push('"');
    buf
}

fn quote_text(platform: Platform, text: &str) -> String {
    if !text.is_empty() && text.chars().all(|ch| is_shell_safe(platform, ch)) {
        return text.to_owned();
    }
    match platform {
        Platform::Linux => quote_posix(text),
        Platform::Windows => quote_msvc(text),
    }
}

/// Quote literal text as one shell word and escape it for Ninja.
#[must_use]
pub fn quote_literal(platform: Platform, text: &str) -> String {
    escape_literal(&quote_text(platform, text))
}

/// Quote one word of a variable value, keeping Ninja references intact.
#[must_use]
pub fn quote_word(platform: Platform, word: &str) -> String {
    let parts = segments(word);
    if parts.is_empty() {
        return quote_literal(platform, "");
    }
    parts
        .into_iter()
        .map(|segment| match segment {
            Segment::Reference(reference) => reference.to_owned(),
            Segment::Literal(text) => quote_literal(platform, &text),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("$root/src/main.cpp", "$root/src/main.cpp")]
    #[case("$root/my dir/a.c", "$root/my$ dir/a.c")]
    #[case("C:/proj/a.c", "C$:/proj/a.c")]
    #[case("${builddir}/x", "${builddir}/x")]
    #[case("cost$", "cost$$")]
    #[case("a$ b", "a$ b")]
    fn paths_escape_spaces_and_colons(#[case] raw: &str, #[case] escaped: &str) {
        assert_eq!(escape_path(raw), escaped);
    }

    #[test]
    fn segments_split_references_from_text() {
        assert_eq!(
            segments("-I$root/external"),
            vec![
                Segment::Literal(String::from("-I")),
                Segment::Reference("$root"),
                Segment::Literal(String::from("/external")),
            ]
        );
        assert_eq!(
            segments("$out.d"),
            vec![Segment::Reference("$out"), Segment::Literal(String::from(".d"))]
        );
    }

    #[rstest]
    #[case(Platform::Linux)]
    #[case(Platform::Windows)]
    fn plain_words_are_left_alone(#[case] platform: Platform) {
        assert_eq!(quote_word(platform, "-std=c++20"), "-std=c++20");
        assert_eq!(quote_word(platform, "-I$root/src"), "-I$root/src");
    }

    #[test]
    fn posix_quoting_survives_shell_splitting() {
        let quoted = quote_word(Platform::Linux, "-DASSETS_DIR=\"/opt/my assets\"");
        let words = shlex::split(&quoted).expect("balanced quoting");
        assert_eq!(words, ["-DASSETS_DIR=\"/opt/my assets\""]);
    }

    #[test]
    fn references_stay_outside_quotes() {
        let quoted = quote_word(Platform::Linux, "-DASSETS_DIR=\"$root/assets\"");
        assert!(quoted.contains("$root"));
        let expanded = quoted.replace("$root", "/src");
        let words = shlex::split(&expanded).expect("balanced quoting");
        assert_eq!(words, ["-DASSETS_DIR=\"/src/assets\""]);
    }

    #[rstest]
    #[case("say \"hi\"", r#""say \"hi\"""#)]
    #[case(r"C:\dir with space\", r#""C:\dir with space\\""#)]
    #[case("", "\"\"")]
    fn msvc_quoting_escapes_quotes_and_trailing_backslashes(
        #[case] raw: &str,
        #[case] quoted: &str,
    ) {
        assert_eq!(quote_text(Platform::Windows, raw), quoted);
    }

    #[test]
    fn literal_dollars_are_escaped_after_quoting() {
        assert_eq!(quote_literal(Platform::Linux, "/home/u/bin"), "/home/u/bin");
        let quoted = quote_literal(Platform::Linux, "/tmp/a$b c");
        assert!(quoted.contains("$$"));
        assert!(!quoted.replace("$$", "").contains('$'));
    }
}
