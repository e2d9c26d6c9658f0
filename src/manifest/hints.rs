//! Help text attached to YAML parse failures, keyed by a lowercase fragment
//! of the parser message.

pub(crate) const YAML_HINTS: [(&str, &str); 6] = [
    (
        "did not find expected '-'",
        "Each entry under `targets:` or `flags:` starts with '-' at the same indentation.",
    ),
    (
        "expected ':'",
        "Write target fields as `key: value`, for example `kind: library`.",
    ),
    (
        "mapping values are not allowed",
        "Quote values containing ':' such as `when: \"platform == 'linux'\"`.",
    ),
    (
        "found character that cannot start any token",
        "Quote values starting with '@', '`' or '%', and indent with spaces.",
    ),
    (
        "did not find expected ',' or ']'",
        "Close inline lists such as `cxx: [main.cpp, util.cpp]` with ']'.",
    ),
    (
        "unknown escape character",
        "Use single quotes for defines containing backslashes.",
    ),
];
