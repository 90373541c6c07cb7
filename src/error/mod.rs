//! Typed errors and source locations.
//!
//! Replaces ad-hoc string errors with a closed error enum so callers can
//! match on failure modes, and threads a source span plus a forcing trace
//! through every failure.

mod sourceloc;
mod types;

pub use sourceloc::SourceSpan;
pub use types::{Error, ErrorKind, Result, TraceFrame};
