//! Source-text preprocessing.
//!
//! The YAML grammar allows colons in tag names, so `!else:` parses as one
//! tag instead of a tagged key. Before parsing, every free-standing
//! `!else:` is rewritten to `!else :`. The rewrite is byte-level and does
//! not respect string literals; a literal-style block containing `!else:`
//! at end of line will be modified. Known limitation, carried forward.

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::Regex;

pub fn rewrite_else_tags(text: &str) -> Cow<'_, str> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"(?m)(\s*!else):(\s*#.*|\s*)$").expect("else-rewrite pattern is valid")
    });
    re.replace_all(text, "$1 :$2")
}
