use std::rc::Rc;

use crate::error::{Error, Result, SourceSpan};

use super::ast::{FmtPart, FmtString};
use super::parser;

/// Scan a format string into literal runs and `{expression}` slots.
///
/// `{{` and `}}` are literal braces. A lone `}` stays literal (so `}}` can
/// appear unpaired without breaking text). Inside a slot, braces nest by
/// simple counting; the scanner is not aware of string literals, matching
/// the documented behavior of the preprocessing it descends from.
pub fn parse_format(text: &str, base: &SourceSpan) -> Result<Rc<FmtString>> {
    let mut parts = Vec::new();
    let mut lit = String::new();
    let mut line = 0usize;
    let mut col = 0usize;
    let mut chars = text.char_indices().peekable();

    fn bump(c: char, line: &mut usize, col: &mut usize) {
        if c == '\n' {
            *line += 1;
            *col = 0;
        } else {
            *col += 1;
        }
    }

    while let Some((i, c)) = chars.next() {
        match c {
            '{' if matches!(chars.peek(), Some((_, '{'))) => {
                chars.next();
                lit.push('{');
                bump('{', &mut line, &mut col);
                bump('{', &mut line, &mut col);
            }
            '}' if matches!(chars.peek(), Some((_, '}'))) => {
                chars.next();
                lit.push('}');
                bump('}', &mut line, &mut col);
                bump('}', &mut line, &mut col);
            }
            '{' => {
                let open = base.offset(line, col);
                bump(c, &mut line, &mut col);
                let start = i + 1;
                let slot_span = base.offset(line, col);
                let mut depth = 1usize;
                let mut end = None;
                for (j, c) in chars.by_ref() {
                    bump(c, &mut line, &mut col);
                    match c {
                        '{' => depth += 1,
                        '}' => {
                            depth -= 1;
                            if depth == 0 {
                                end = Some(j);
                                break;
                            }
                        }
                        _ => {}
                    }
                }
                let end =
                    end.ok_or_else(|| Error::parse("unterminated `{` in format string", open))?;
                if !lit.is_empty() {
                    parts.push(FmtPart::Lit(std::mem::take(&mut lit)));
                }
                let slot = parser::parse_expression(&text[start..end], &slot_span)?;
                parts.push(FmtPart::Slot(slot));
            }
            c => {
                lit.push(c);
                bump(c, &mut line, &mut col);
            }
        }
    }
    if !lit.is_empty() {
        parts.push(FmtPart::Lit(lit));
    }
    Ok(Rc::new(FmtString {
        parts,
        span: base.clone(),
    }))
}
