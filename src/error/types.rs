use std::fmt;

use super::sourceloc::SourceSpan;

/// The error taxonomy of the engine.
///
/// Every error carries a primary span (where the offending construct lives)
/// and, once it has crossed one or more deferred-value forcings, a trace of
/// the keys that were being forced at the time.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    /// Expression tokenization failed.
    Lex { message: String },
    /// Expression parsing failed.
    Parse { message: String },
    /// Surfaced from the YAML collaborator or document structure checks.
    Yaml { message: String },
    /// Identifier resolution exhausted locals, supers, ups, and globals.
    UndefinedName { name: String },
    /// Wrong operand or composition type.
    TypeMismatch { expected: String, got: String },
    /// Wrong number of arguments to a lambda or builtin.
    Arity { expected: usize, got: usize },
    /// Division by zero, integer overflow, failed numeric conversion.
    Arithmetic { message: String },
    IndexOutOfRange { index: i64, length: usize },
    KeyNotFound { key: String },
    /// A value depends on itself. The chain lists the keys being forced,
    /// from the first occurrence of the repeated cell to the repeat.
    CycleDetected { chain: Vec<String> },
    Import { path: String, cause: String },
    /// A host-supplied or built-in function reported a failure.
    Function { name: String, message: String },
}

/// One step of the forcing stack, recorded while an error unwinds.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceFrame {
    pub what: String,
    pub at: SourceSpan,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Error {
    pub kind: ErrorKind,
    pub span: SourceSpan,
    pub trace: Vec<TraceFrame>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn new(kind: ErrorKind, span: SourceSpan) -> Self {
        Error {
            kind,
            span,
            trace: Vec::new(),
        }
    }

    pub fn lex(message: impl Into<String>, span: SourceSpan) -> Self {
        Error::new(
            ErrorKind::Lex {
                message: message.into(),
            },
            span,
        )
    }

    pub fn parse(message: impl Into<String>, span: SourceSpan) -> Self {
        Error::new(
            ErrorKind::Parse {
                message: message.into(),
            },
            span,
        )
    }

    pub fn yaml(message: impl Into<String>, span: SourceSpan) -> Self {
        Error::new(
            ErrorKind::Yaml {
                message: message.into(),
            },
            span,
        )
    }

    pub fn undefined_name(name: impl Into<String>, span: SourceSpan) -> Self {
        Error::new(ErrorKind::UndefinedName { name: name.into() }, span)
    }

    pub fn type_mismatch(
        expected: impl Into<String>,
        got: impl Into<String>,
        span: SourceSpan,
    ) -> Self {
        Error::new(
            ErrorKind::TypeMismatch {
                expected: expected.into(),
                got: got.into(),
            },
            span,
        )
    }

    pub fn arity(expected: usize, got: usize, span: SourceSpan) -> Self {
        Error::new(ErrorKind::Arity { expected, got }, span)
    }

    pub fn arithmetic(message: impl Into<String>, span: SourceSpan) -> Self {
        Error::new(
            ErrorKind::Arithmetic {
                message: message.into(),
            },
            span,
        )
    }

    pub fn index_out_of_range(index: i64, length: usize, span: SourceSpan) -> Self {
        Error::new(ErrorKind::IndexOutOfRange { index, length }, span)
    }

    pub fn key_not_found(key: impl Into<String>, span: SourceSpan) -> Self {
        Error::new(ErrorKind::KeyNotFound { key: key.into() }, span)
    }

    pub fn cycle(chain: Vec<String>, span: SourceSpan) -> Self {
        Error::new(ErrorKind::CycleDetected { chain }, span)
    }

    pub fn import(path: impl Into<String>, cause: impl Into<String>, span: SourceSpan) -> Self {
        Error::new(
            ErrorKind::Import {
                path: path.into(),
                cause: cause.into(),
            },
            span,
        )
    }

    pub fn function(name: impl Into<String>, message: impl Into<String>, span: SourceSpan) -> Self {
        Error::new(
            ErrorKind::Function {
                name: name.into(),
                message: message.into(),
            },
            span,
        )
    }

    /// Record the key whose forcing this error escaped through.
    pub fn with_frame(mut self, what: impl Into<String>, at: SourceSpan) -> Self {
        self.trace.push(TraceFrame {
            what: what.into(),
            at,
        });
        self
    }

    /// One-line description of the failure, without span or trace.
    pub fn describe(&self) -> String {
        match &self.kind {
            ErrorKind::Lex { message } => format!("lex error: {}", message),
            ErrorKind::Parse { message } => format!("parse error: {}", message),
            ErrorKind::Yaml { message } => format!("YAML error: {}", message),
            ErrorKind::UndefinedName { name } => {
                format!("there is no variable called `{}` in this scope", name)
            }
            ErrorKind::TypeMismatch { expected, got } => {
                format!("type mismatch: expected {}, got {}", expected, got)
            }
            ErrorKind::Arity { expected, got } => format!(
                "expected {} argument{}, got {}",
                expected,
                if *expected == 1 { "" } else { "s" },
                got
            ),
            ErrorKind::Arithmetic { message } => format!("arithmetic error: {}", message),
            ErrorKind::IndexOutOfRange { index, length } => {
                format!("index {} out of range for length {}", index, length)
            }
            ErrorKind::KeyNotFound { key } => format!("no key `{}` in this tuple", key),
            ErrorKind::CycleDetected { chain } => {
                format!("dependency cycle in tuple values: {}", chain.join(" -> "))
            }
            ErrorKind::Import { path, cause } => {
                format!("could not import `{}`: {}", path, cause)
            }
            ErrorKind::Function { name, message } => {
                format!("function `{}` failed: {}", name, message)
            }
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n  at {}", self.describe(), self.span)?;
        for frame in &self.trace {
            write!(f, "\n  while {} at {}", frame.what, frame.at)?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {}
