use std::fmt;
use std::rc::{Rc, Weak};

use crate::error::SourceSpan;
use crate::tuple::Tuple;

/// A link in the name-resolution chain.
///
/// `locals` is the tuple whose entries are the in-scope identifiers; `up` is
/// the enclosing lexical scope, `super` the scope of the composition
/// predecessor. A tuple's own scope holds its locals weakly to break the
/// tuple<->scope cycle (the tuple is kept alive by whoever holds it as a
/// value); binding scopes introduced for lambda calls hold their parameter
/// tuple strongly, since nothing else owns it.
#[derive(Clone)]
pub struct Scope {
    inner: Rc<ScopeData>,
}

enum Locals {
    Weak(Weak<Tuple>),
    Strong(Rc<Tuple>),
}

struct ScopeData {
    locals: Locals,
    up: Option<Scope>,
    supr: Option<Scope>,
    origin: SourceSpan,
}

impl Scope {
    /// Scope of a tuple under construction; `locals` points back at it.
    pub fn new(
        locals: Weak<Tuple>,
        up: Option<Scope>,
        supr: Option<Scope>,
        origin: SourceSpan,
    ) -> Scope {
        Scope {
            inner: Rc::new(ScopeData {
                locals: Locals::Weak(locals),
                up,
                supr,
                origin,
            }),
        }
    }

    /// Scope owning its locals: used for lambda parameter bindings, whose
    /// tuple would otherwise be dropped when the call returns even though
    /// values created during the call may still resolve names through it.
    pub fn binding(locals: Rc<Tuple>, up: Option<Scope>, origin: SourceSpan) -> Scope {
        Scope {
            inner: Rc::new(ScopeData {
                locals: Locals::Strong(locals),
                up,
                supr: None,
                origin,
            }),
        }
    }

    /// The tuple whose entries this scope resolves. `None` only if a weakly
    /// held tuple has been dropped, which cannot happen while it is
    /// reachable through the value graph being evaluated.
    pub fn locals(&self) -> Option<Rc<Tuple>> {
        match &self.inner.locals {
            Locals::Weak(w) => w.upgrade(),
            Locals::Strong(t) => Some(t.clone()),
        }
    }

    pub fn up(&self) -> Option<Scope> {
        self.inner.up.clone()
    }

    pub fn superscope(&self) -> Option<Scope> {
        self.inner.supr.clone()
    }

    pub fn origin(&self) -> &SourceSpan {
        &self.inner.origin
    }

    pub fn ptr_eq(&self, other: &Scope) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<scope at {}>", self.inner.origin)
    }
}
