use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::error::SourceSpan;
use crate::expr::ast::{ExprRef, FmtString};
use crate::explain::Trace;
use crate::scope::Scope;
use crate::value::Value;

/// The unit of configuration: an ordered mapping of keys to values or
/// deferred expressions, with its own scope and composition metadata.
///
/// Identity is the `Rc` pointer; several scopes may share one tuple. A
/// tuple created from a mapping that carries `!if`/`!elif`/`!else`
/// directives also records them as latent `CondLadder`s; they are applied
/// by composition the first time the tuple is inspected (see
/// `compose::view`), so that guards see overrides supplied by later
/// composites.
pub struct Tuple {
    entries: RefCell<Vec<Entry>>,
    index: RefCell<FxHashMap<Rc<str>, usize>>,
    scope: Scope,
    supers: Vec<Rc<Tuple>>,
    ladders: RefCell<Vec<Rc<CondLadder>>>,
    resolved: RefCell<Option<Rc<Tuple>>>,
    resolving: Cell<bool>,
    origin: SourceSpan,
}

pub struct Entry {
    pub key: Rc<str>,
    pub slot: RefCell<Slot>,
}

/// The memo cell of a tuple entry.
///
/// `Deferred -> InProgress -> Forced` is the forcing state machine; an
/// evaluation error resets the cell to `Deferred` so unrelated keys stay
/// accessible. `Forced` keeps the thunk because composition re-scopes the
/// original expression, not the memoized value.
#[derive(Clone)]
pub enum Slot {
    Literal(Value),
    Deferred(Rc<Thunk>),
    InProgress(Rc<Thunk>),
    Forced {
        value: Value,
        thunk: Rc<Thunk>,
        trace: Option<Rc<Trace>>,
    },
}

/// A deferred computation: what to evaluate, and the scope to evaluate it
/// in. Immutable; re-scoping during composition builds a fresh thunk (and
/// therefore a fresh memo cell).
pub struct Thunk {
    pub kind: ThunkKind,
    pub scope: Scope,
    pub origin: SourceSpan,
    /// Human-readable description for traces, e.g. "expression `a + b`".
    pub descr: Rc<str>,
}

pub enum ThunkKind {
    Expr(ExprRef),
    Fmt(Rc<FmtString>),
    /// Import path; interpolated before resolution.
    Import(Rc<FmtString>),
    Composite(Rc<Vec<CompositePart>>),
    List(Rc<Vec<ListItem>>),
}

pub enum CompositePart {
    Expr(ExprRef),
    Tuple(Rc<Tuple>),
}

pub enum ListItem {
    Done(Value),
    Deferred(Rc<Thunk>),
}

/// One `!if`/`!elif`/`!else` group from a mapping. The first arm whose
/// guard is truthy contributes its body as a composite part; `fallback`
/// contributes when no guard fires.
pub struct CondLadder {
    pub arms: Vec<LadderArm>,
    pub fallback: Option<Rc<Tuple>>,
    pub origin: SourceSpan,
}

pub struct LadderArm {
    pub guard: ExprRef,
    pub body: Rc<Tuple>,
}

impl Tuple {
    /// Create an empty tuple whose own scope is wired to it, linking `up`
    /// (lexical parent) and `super` (composition predecessor).
    pub fn new(
        up: Option<Scope>,
        supr: Option<Scope>,
        supers: Vec<Rc<Tuple>>,
        origin: SourceSpan,
    ) -> Rc<Tuple> {
        Rc::new_cyclic(|weak| Tuple {
            entries: RefCell::new(Vec::new()),
            index: RefCell::new(FxHashMap::default()),
            scope: Scope::new(weak.clone(), up, supr, origin.clone()),
            supers,
            ladders: RefCell::new(Vec::new()),
            resolved: RefCell::new(None),
            resolving: Cell::new(false),
            origin,
        })
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn origin(&self) -> &SourceSpan {
        &self.origin
    }

    pub fn supers(&self) -> &[Rc<Tuple>] {
        &self.supers
    }

    /// Append an entry. Returns false when the key is already present.
    pub fn insert(&self, key: Rc<str>, slot: Slot) -> bool {
        let mut index = self.index.borrow_mut();
        if index.contains_key(&key) {
            return false;
        }
        let mut entries = self.entries.borrow_mut();
        index.insert(key.clone(), entries.len());
        entries.push(Entry {
            key,
            slot: RefCell::new(slot),
        });
        true
    }

    pub fn push_ladder(&self, ladder: Rc<CondLadder>) {
        self.ladders.borrow_mut().push(ladder);
    }

    pub fn ladders(&self) -> Vec<Rc<CondLadder>> {
        self.ladders.borrow().clone()
    }

    pub fn has_ladders(&self) -> bool {
        !self.ladders.borrow().is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn keys(&self) -> Vec<Rc<str>> {
        self.entries.borrow().iter().map(|e| e.key.clone()).collect()
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.index.borrow().contains_key(key)
    }

    pub fn key_index(&self, key: &str) -> Option<usize> {
        self.index.borrow().get(key).copied()
    }

    /// Snapshot of the slot state for a key.
    pub fn slot(&self, key: &str) -> Option<Slot> {
        let idx = self.key_index(key)?;
        let entries = self.entries.borrow();
        let slot = entries[idx].slot.borrow().clone();
        Some(slot)
    }

    pub fn slot_at(&self, idx: usize) -> (Rc<str>, Slot) {
        let entries = self.entries.borrow();
        let key = entries[idx].key.clone();
        let slot = entries[idx].slot.borrow().clone();
        (key, slot)
    }

    pub fn set_slot(&self, key: &str, slot: Slot) {
        if let Some(idx) = self.key_index(key) {
            let entries = self.entries.borrow();
            *entries[idx].slot.borrow_mut() = slot;
        }
    }

    pub(crate) fn resolved(&self) -> Option<Rc<Tuple>> {
        self.resolved.borrow().clone()
    }

    pub(crate) fn set_resolved(&self, view: Rc<Tuple>) {
        *self.resolved.borrow_mut() = Some(view);
    }

    pub(crate) fn is_resolving(&self) -> bool {
        self.resolving.get()
    }

    pub(crate) fn set_resolving(&self, on: bool) {
        self.resolving.set(on);
    }

    /// Stable address used to identify cells on the forcing stack.
    pub fn id(&self) -> usize {
        self as *const Tuple as usize
    }
}

impl fmt::Debug for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<String> = self.keys().iter().map(|k| k.to_string()).collect();
        write!(f, "Tuple{{{}}}", keys.join(", "))
    }
}
