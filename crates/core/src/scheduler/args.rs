//! Rendering of option maps into command-line arguments.
//!
//! Shared by compute-job arguments and scheduler submission options:
//! - `true` renders as a bare `--name` flag, `false` is omitted
//! - `null` values are omitted
//! - everything else renders as `--name=value`
//! - with [`Quoting::Shell`], values with whitespace or shell metacharacters
//!   are single-quoted

use crate::job::{ArgMap, ArgValue};

/// How rendered values are protected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quoting {
    /// Output is interpreted by a shell; anything not plainly inert is quoted.
    Shell,
    /// Output is passed as separate argv entries; values are left as-is.
    Argv,
}

/// Renders every non-null option in `args` (in key order).
pub fn render_args(args: &ArgMap, quoting: Quoting) -> Vec<String> {
    args.iter()
        .filter_map(|(name, value)| render_one(name, value.as_ref()?, quoting))
        .collect()
}

fn render_one(name: &str, value: &ArgValue, quoting: Quoting) -> Option<String> {
    match value {
        ArgValue::Flag(true) => Some(format!("--{}", name)),
        ArgValue::Flag(false) => None,
        other => {
            let text = other.to_string();
            let text = match quoting {
                Quoting::Shell => shell_word(&text),
                Quoting::Argv => text,
            };
            Some(format!("--{}={}", name, text))
        }
    }
}

/// Leaves `s` bare when every character is shell-inert, otherwise
/// single-quotes it (embedded `'` becomes `'\''`).
pub fn shell_word(s: &str) -> String {
    if !s.is_empty() && s.chars().all(is_shell_safe) {
        return s.to_string();
    }
    format!("'{}'", s.replace('\'', r"'\''"))
}

fn is_shell_safe(ch: char) -> bool {
    ch.is_ascii_alphanumeric()
        || matches!(ch, '_' | '.' | '/' | ':' | '=' | ',' | '+' | '@' | '%' | '-')
}
