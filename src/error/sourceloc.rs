use std::fmt;
use std::rc::Rc;

/// A point in a source document: file, 1-based line, 1-based column.
///
/// Spans are attached to every token, AST node, tuple, and scope so that
/// errors and `explain_value` can point back at the YAML that produced a
/// value. The file name is shared via `Rc` because a single document stamps
/// thousands of spans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpan {
    pub file: Rc<str>,
    pub line: usize,
    pub col: usize,
}

impl SourceSpan {
    pub fn new(file: impl Into<Rc<str>>, line: usize, col: usize) -> Self {
        SourceSpan {
            file: file.into(),
            line,
            col,
        }
    }

    pub fn unknown() -> Self {
        SourceSpan::new("<unknown>", 1, 1)
    }

    /// Span at a (line, column) offset inside the text this span starts at.
    ///
    /// Offsets on the first line shift the column; later lines restart the
    /// column count. Used to place tokens of an embedded expression relative
    /// to the YAML scalar that carries it.
    pub fn offset(&self, dline: usize, dcol: usize) -> Self {
        if dline == 0 {
            SourceSpan::new(self.file.clone(), self.line, self.col + dcol)
        } else {
            SourceSpan::new(self.file.clone(), self.line + dline, dcol + 1)
        }
    }
}

impl fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.col)
    }
}
