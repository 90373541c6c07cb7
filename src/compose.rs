//! The tuple-composition algebra.
//!
//! `compose(A, B)` produces a new tuple whose keys are the ordered union of
//! both operands, whose values are the rightmost definitions, and whose
//! deferred expressions are re-scoped so they re-evaluate against the
//! composite. The composite's scope links `up` to the leftmost operand's
//! lexical parent and `super` to the leftmost operand itself, so
//! `super.super.x` walks the composition history.

use std::collections::VecDeque;
use std::rc::Rc;

use crate::error::{Result, SourceSpan};
use crate::eval::{self, EvalContext};
use crate::scope::Scope;
use crate::tuple::{CondLadder, ListItem, Slot, Thunk, ThunkKind, Tuple};
use crate::value::Value;

/// Compose two tuples. `up` overrides the composite's lexical parent and is
/// used when merging nested tuples under an enclosing composite; pass `None`
/// for the ordinary juxtaposition/extension operation.
///
/// Composing with an empty, ladder-free operand is an identity and returns
/// the other operand unchanged.
pub fn compose(
    a: &Rc<Tuple>,
    b: &Rc<Tuple>,
    up: Option<Scope>,
    origin: &SourceSpan,
) -> Result<Rc<Tuple>> {
    compose_impl(a, b, up, origin, true)
}

/// Composition variant for ladder resolution: the result carries no latent
/// ladders of its own (the caller tracks them in its work queue).
pub(crate) fn compose_stripped(
    a: &Rc<Tuple>,
    b: &Rc<Tuple>,
    origin: &SourceSpan,
) -> Result<Rc<Tuple>> {
    compose_impl(a, b, None, origin, false)
}

fn compose_impl(
    a: &Rc<Tuple>,
    b: &Rc<Tuple>,
    up: Option<Scope>,
    origin: &SourceSpan,
    carry_ladders: bool,
) -> Result<Rc<Tuple>> {
    if up.is_none() {
        if b.is_empty() && !b.has_ladders() {
            return Ok(a.clone());
        }
        if a.is_empty() && !a.has_ladders() {
            return Ok(b.clone());
        }
    }
    let up = up.or_else(|| a.scope().up());
    let c = Tuple::new(
        up,
        Some(a.scope().clone()),
        vec![a.clone(), b.clone()],
        origin.clone(),
    );

    // A's keys first, in order; overridden values come from B.
    for i in 0..a.len() {
        let (key, a_slot) = a.slot_at(i);
        match b.slot(&key) {
            Some(b_slot) => {
                if is_null_literal(&b_slot) {
                    continue; // erased
                }
                if let (Some(ta), Some(tb)) = (tuple_literal(&a_slot), tuple_literal(&b_slot)) {
                    let merged = compose_impl(&ta, &tb, Some(c.scope().clone()), origin, true)?;
                    c.insert(key, Slot::Literal(Value::Tuple(merged)));
                } else {
                    c.insert(key, rescope_slot(&b_slot, c.scope()));
                }
            }
            None => {
                c.insert(key, rescope_slot(&a_slot, c.scope()));
            }
        }
    }
    // Then B's new keys, in B's order.
    for i in 0..b.len() {
        let (key, b_slot) = b.slot_at(i);
        if a.has_key(&key) || is_null_literal(&b_slot) {
            continue;
        }
        c.insert(key, rescope_slot(&b_slot, c.scope()));
    }

    if carry_ladders {
        for ladder in a.ladders() {
            c.push_ladder(ladder);
        }
        for ladder in b.ladders() {
            c.push_ladder(ladder);
        }
    }
    Ok(c)
}

fn tuple_literal(slot: &Slot) -> Option<Rc<Tuple>> {
    match slot {
        Slot::Literal(Value::Tuple(t)) => Some(t.clone()),
        _ => None,
    }
}

fn is_null_literal(slot: &Slot) -> bool {
    matches!(slot, Slot::Literal(Value::Null))
}

/// Re-target a slot at a composite's scope. Deferred and already-forced
/// values become fresh deferreds (fresh memo cells: the re-scoped value may
/// legitimately differ); nested tuples are cloned with the original linked
/// in as `super`.
pub(crate) fn rescope_slot(slot: &Slot, scope: &Scope) -> Slot {
    match slot {
        Slot::Literal(Value::Tuple(t)) => Slot::Literal(Value::Tuple(rescope_tuple(t, scope))),
        Slot::Literal(v) => Slot::Literal(v.clone()),
        Slot::Deferred(thunk) | Slot::InProgress(thunk) => {
            Slot::Deferred(rescope_thunk(thunk, scope))
        }
        Slot::Forced { thunk, .. } => Slot::Deferred(rescope_thunk(thunk, scope)),
    }
}

pub(crate) fn rescope_thunk(thunk: &Thunk, scope: &Scope) -> Rc<Thunk> {
    let kind = match &thunk.kind {
        ThunkKind::Expr(e) => ThunkKind::Expr(e.clone()),
        ThunkKind::Fmt(f) => ThunkKind::Fmt(f.clone()),
        ThunkKind::Import(path) => ThunkKind::Import(path.clone()),
        ThunkKind::Composite(parts) => ThunkKind::Composite(parts.clone()),
        ThunkKind::List(items) => ThunkKind::List(Rc::new(
            items
                .iter()
                .map(|item| match item {
                    ListItem::Done(Value::Tuple(t)) => {
                        ListItem::Done(Value::Tuple(rescope_tuple(t, scope)))
                    }
                    ListItem::Done(v) => ListItem::Done(v.clone()),
                    ListItem::Deferred(th) => ListItem::Deferred(rescope_thunk(th, scope)),
                })
                .collect(),
        )),
    };
    Rc::new(Thunk {
        kind,
        scope: scope.clone(),
        origin: thunk.origin.clone(),
        descr: thunk.descr.clone(),
    })
}

/// Deep-clone a tuple under a new lexical parent; the original becomes the
/// clone's `super`, so inherited expressions can still reach it explicitly.
pub fn rescope_tuple(t: &Rc<Tuple>, up: &Scope) -> Rc<Tuple> {
    let c = Tuple::new(
        Some(up.clone()),
        Some(t.scope().clone()),
        vec![t.clone()],
        t.origin().clone(),
    );
    for i in 0..t.len() {
        let (key, slot) = t.slot_at(i);
        c.insert(key, rescope_slot(&slot, c.scope()));
    }
    for ladder in t.ladders() {
        c.push_ladder(ladder);
    }
    c
}

/// The inspectable form of a tuple: identical to the tuple itself unless it
/// carries conditional ladders, in which case the ladders are applied (each
/// guard evaluated lazily, first truthy arm composed in) the first time the
/// tuple is inspected, and the composite is cached.
///
/// Guards see the composite built so far, so a ladder inherited through
/// composition picks up keys the composite supplies.
pub fn view(t: &Rc<Tuple>, ctx: &mut EvalContext) -> Result<Rc<Tuple>> {
    if let Some(resolved) = t.resolved() {
        return Ok(resolved);
    }
    if !t.has_ladders() || t.is_resolving() {
        return Ok(t.clone());
    }
    t.set_resolving(true);
    let result = apply_ladders(t, ctx);
    t.set_resolving(false);
    let resolved = result?;
    t.set_resolved(resolved.clone());
    Ok(resolved)
}

fn apply_ladders(t: &Rc<Tuple>, ctx: &mut EvalContext) -> Result<Rc<Tuple>> {
    let mut acc = t.clone();
    let mut work: VecDeque<Rc<CondLadder>> = t.ladders().into();
    while let Some(ladder) = work.pop_front() {
        let mut chosen: Option<Rc<Tuple>> = None;
        for arm in &ladder.arms {
            let scope = acc.scope().clone();
            let guard = eval::eval_expr(&arm.guard, &scope, ctx)?;
            if guard.is_truthy() {
                chosen = Some(arm.body.clone());
                break;
            }
        }
        let chosen = chosen.or_else(|| ladder.fallback.clone());
        if let Some(body) = chosen {
            acc = compose_stripped(&acc, &body, &ladder.origin)?;
            // Directives nested inside the chosen branch resolve next.
            for (i, nested) in body.ladders().into_iter().enumerate() {
                work.insert(i, nested);
            }
        }
    }
    Ok(acc)
}
