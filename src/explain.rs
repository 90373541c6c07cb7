//! Provenance traces.
//!
//! While a deferred value is forced, the evaluator records what was
//! evaluated, where it was defined, which names it resolved and where
//! resolution succeeded, and the traces of any nested forcings. The finished
//! trace is stored in the forced slot, keyed by (tuple, key) through the
//! slot itself, and rendered on demand by `explain_value`.

use std::rc::Rc;

use crate::error::SourceSpan;

#[derive(Debug)]
pub struct Trace {
    /// What was evaluated, e.g. "expression `beans + 1`".
    pub what: String,
    pub at: SourceSpan,
    /// Names resolved while evaluating, with the defining tuple's span.
    pub names: Vec<NameDep>,
    /// Traces of deferred values forced along the way.
    pub children: Vec<Rc<Trace>>,
}

#[derive(Debug)]
pub struct NameDep {
    pub name: Rc<str>,
    pub at: SourceSpan,
}

/// In-progress trace for one forcing; finished into an immutable `Trace`.
pub struct TraceBuilder {
    what: String,
    at: SourceSpan,
    names: Vec<NameDep>,
    children: Vec<Rc<Trace>>,
}

impl TraceBuilder {
    pub fn new(what: impl Into<String>, at: SourceSpan) -> Self {
        TraceBuilder {
            what: what.into(),
            at,
            names: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn record_name(&mut self, name: Rc<str>, at: SourceSpan) {
        // One record per name is enough; expressions like `x + x` resolve
        // the same name twice.
        if self.names.iter().all(|dep| dep.name != name) {
            self.names.push(NameDep { name, at });
        }
    }

    pub fn record_child(&mut self, child: Rc<Trace>) {
        self.children.push(child);
    }

    pub fn finish(self) -> Rc<Trace> {
        Rc::new(Trace {
            what: self.what,
            at: self.at,
            names: self.names,
            children: self.children,
        })
    }
}

/// Render a trace as an indented explanation.
pub fn render(trace: &Trace, lead: &str) -> String {
    let mut out = String::new();
    render_into(trace, lead, 0, &mut out);
    out
}

fn render_into(trace: &Trace, lead: &str, indent: usize, out: &mut String) {
    let pad = "    ".repeat(indent);
    out.push_str(&format!("{}{} {} at {}", pad, lead, trace.what, trace.at));
    for dep in &trace.names {
        out.push('\n');
        out.push_str(&format!(
            "{}     - with `{}` resolved in the tuple at {}",
            pad, dep.name, dep.at
        ));
    }
    for child in &trace.children {
        out.push('\n');
        render_into(child, "from", indent + 1, out);
    }
}
