//! `[%clk ...]` / `[%eval ...]` commands embedded in move comments.

use regex::Regex;
use std::sync::LazyLock;

static COMMAND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[%(clk|eval)\s+([^\]]*?)\s*\]").expect("comment command pattern is valid")
});

static SPACES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct CommentParts {
    pub text: Option<String>,
    pub clk: Option<String>,
    pub eval: Option<String>,
}

/// Pulls clock and evaluation commands out of a raw comment. Other commands
/// (`[%csl ...]`, `[%cal ...]`) stay in the text.
pub(crate) fn split_commands(raw: &str) -> CommentParts {
    let mut parts = CommentParts::default();

    for caps in COMMAND.captures_iter(raw) {
        let value = caps[2].to_string();
        let slot = match &caps[1] {
            "clk" => &mut parts.clk,
            _ => &mut parts.eval,
        };
        if slot.is_none() {
            *slot = Some(value);
        }
    }

    let stripped = COMMAND.replace_all(raw, " ");
    let text = SPACES.replace_all(stripped.trim(), " ");
    if !text.is_empty() {
        parts.text = Some(text.into_owned());
    }

    parts
}

/// Inverse of [`split_commands`]: commands first, then the free text.
pub(crate) fn join_commands(clk: Option<&str>, eval: Option<&str>, text: Option<&str>) -> String {
    let mut out = String::new();
    for (name, value) in [("clk", clk), ("eval", eval)] {
        if let Some(value) = value {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str("[%");
            out.push_str(name);
            out.push(' ');
            out.push_str(value);
            out.push(']');
        }
    }
    if let Some(text) = text.filter(|t| !t.is_empty()) {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(text);
    }
    out
}
