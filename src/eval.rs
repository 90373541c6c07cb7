//! The expression evaluator.
//!
//! Walks expression ASTs against a scope, forcing deferred tuple entries on
//! demand, memoizing results, and detecting cycles through the per-cell
//! state machine plus a forcing stack kept on the context.

use std::rc::Rc;

use crate::builtins;
use crate::compose::{self, view};
use crate::error::{Error, Result, SourceSpan};
use crate::expr::ast::{
    BinaryOp, Expr, ExprKind, FmtPart, FmtString, MapEntry, MapKey, UnaryOp,
};
use crate::explain::{Trace, TraceBuilder};
use crate::loader::{LoaderEnv, StringifyStyle};
use crate::scope::Scope;
use crate::tuple::{CompositePart, ListItem, Slot, Thunk, ThunkKind, Tuple};
use crate::value::{Lambda, Value};

/// Evaluation bookkeeping for one top-level operation on a loaded
/// configuration: the forcing stack (for cycle chains), an expression depth
/// counter, and the provenance trace under construction.
pub struct EvalContext<'e> {
    pub(crate) env: &'e LoaderEnv,
    depth: usize,
    force_stack: Vec<ForceFrame>,
    trace_stack: Vec<TraceBuilder>,
}

struct ForceFrame {
    tuple: usize,
    key: Rc<str>,
}

impl<'e> EvalContext<'e> {
    pub(crate) fn new(env: &'e LoaderEnv) -> Self {
        EvalContext {
            env,
            depth: 0,
            force_stack: Vec::new(),
            trace_stack: Vec::new(),
        }
    }

    fn record_name(&mut self, name: &Rc<str>, at: SourceSpan) {
        if let Some(top) = self.trace_stack.last_mut() {
            top.record_name(name.clone(), at);
        }
    }

    fn chain_with(&self, key: &str) -> Vec<String> {
        let mut chain: Vec<String> = self.force_stack.iter().map(|f| f.key.to_string()).collect();
        chain.push(key.to_string());
        chain
    }
}

/// Force the entry `key` of an already-viewed tuple. Returns `None` when
/// the key is absent.
pub fn force_entry(tup: &Rc<Tuple>, key: &str, ctx: &mut EvalContext) -> Result<Option<Value>> {
    let idx = match tup.key_index(key) {
        Some(idx) => idx,
        None => return Ok(None),
    };
    let (key_rc, snapshot) = tup.slot_at(idx);
    match snapshot {
        Slot::Literal(value) => Ok(Some(value)),
        Slot::Forced { value, .. } => Ok(Some(value)),
        Slot::InProgress(thunk) => {
            let cell = (tup.id(), key_rc.clone());
            let start = ctx
                .force_stack
                .iter()
                .position(|f| f.tuple == cell.0 && f.key == cell.1)
                .unwrap_or(0);
            let mut chain: Vec<String> = ctx.force_stack[start..]
                .iter()
                .map(|f| f.key.to_string())
                .collect();
            chain.push(key.to_string());
            Err(Error::cycle(chain, thunk.origin.clone()))
        }
        Slot::Deferred(thunk) => {
            if ctx.force_stack.len() >= ctx.env.options.max_depth {
                return Err(Error::cycle(ctx.chain_with(key), thunk.origin.clone()));
            }
            tup.set_slot(key, Slot::InProgress(thunk.clone()));
            ctx.force_stack.push(ForceFrame {
                tuple: tup.id(),
                key: key_rc,
            });
            ctx.trace_stack
                .push(TraceBuilder::new(thunk.descr.to_string(), thunk.origin.clone()));
            let result = eval_thunk(&thunk, ctx);
            let builder = ctx.trace_stack.pop().expect("trace stack underflow");
            ctx.force_stack.pop();
            match result {
                Ok(value) => {
                    let trace = builder.finish();
                    if let Some(parent) = ctx.trace_stack.last_mut() {
                        parent.record_child(trace.clone());
                    }
                    tup.set_slot(
                        key,
                        Slot::Forced {
                            value: value.clone(),
                            thunk,
                            trace: Some(trace),
                        },
                    );
                    Ok(Some(value))
                }
                Err(err) => {
                    tup.set_slot(key, Slot::Deferred(thunk.clone()));
                    Err(err.with_frame(format!("forcing `{}`", key), thunk.origin.clone()))
                }
            }
        }
    }
}

/// Look up `key` on a tuple value: resolve conditional directives, then
/// force. The public indexing/attribute path.
pub fn tuple_get(tup: &Rc<Tuple>, key: &str, ctx: &mut EvalContext) -> Result<Option<Value>> {
    let viewed = view(tup, ctx)?;
    force_entry(&viewed, key, ctx)
}

/// The trace recorded when `key` was forced, if any.
pub fn tuple_trace(tup: &Rc<Tuple>, key: &str, ctx: &mut EvalContext) -> Result<Option<TupleSlotInfo>> {
    let viewed = view(tup, ctx)?;
    Ok(viewed.slot(key).map(|slot| match slot {
        Slot::Literal(_) => TupleSlotInfo::Literal,
        Slot::Deferred(th) | Slot::InProgress(th) => TupleSlotInfo::Unforced(th.origin.clone()),
        Slot::Forced { trace, thunk, .. } => TupleSlotInfo::Forced(trace, thunk.origin.clone()),
    }))
}

pub enum TupleSlotInfo {
    Literal,
    Unforced(SourceSpan),
    Forced(Option<Rc<Trace>>, SourceSpan),
}

/// Identifier resolution: locals, then the `super` chain one hop at a time,
/// then the enclosing (`up`) scope, then loader globals. `null`-valued
/// entries do not satisfy a lookup; the search continues outward.
pub fn lookup_name(
    name: &Rc<str>,
    scope: &Scope,
    span: &SourceSpan,
    ctx: &mut EvalContext,
) -> Result<Value> {
    let mut outer = Some(scope.clone());
    while let Some(sc) = outer {
        let mut hop = Some(sc.clone());
        while let Some(h) = hop {
            if let Some(tup) = h.locals() {
                let viewed = view(&tup, ctx)?;
                if let Some(value) = force_entry(&viewed, name, ctx)? {
                    if !matches!(value, Value::Null) {
                        ctx.record_name(name, viewed.origin().clone());
                        return Ok(value);
                    }
                }
            }
            hop = h.superscope();
        }
        outer = sc.up();
    }
    if let Some(value) = ctx.env.options.globals.get(name.as_ref()) {
        return Ok(value.clone());
    }
    Err(Error::undefined_name(name.as_ref(), span.clone()))
}

pub fn eval_expr(expr: &Expr, scope: &Scope, ctx: &mut EvalContext) -> Result<Value> {
    if ctx.depth >= ctx.env.options.max_depth {
        let mut chain = ctx.chain_with("...");
        if chain.len() == 1 {
            chain = vec!["<deep recursion>".to_string()];
        }
        return Err(Error::cycle(chain, expr.span.clone()));
    }
    ctx.depth += 1;
    let result = eval_expr_inner(expr, scope, ctx);
    ctx.depth -= 1;
    result
}

fn eval_expr_inner(expr: &Expr, scope: &Scope, ctx: &mut EvalContext) -> Result<Value> {
    match &expr.kind {
        ExprKind::Ident(name) => match name.as_ref() {
            "up" => enclosing_tuple(scope, &expr.span),
            "super" => predecessor_tuple(scope, &expr.span),
            _ => lookup_name(name, scope, &expr.span, ctx),
        },
        ExprKind::Int(n) => Ok(Value::Int(*n)),
        ExprKind::Float(x) => Ok(Value::Float(*x)),
        ExprKind::Bool(b) => Ok(Value::Bool(*b)),
        ExprKind::Null => Ok(Value::Null),
        ExprKind::Str(format) => {
            let text = render_format(format, scope, ctx)?;
            Ok(Value::Str(Rc::from(text.as_str())))
        }
        ExprKind::List(items) => {
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                values.push(eval_expr(item, scope, ctx)?);
            }
            Ok(Value::List(Rc::new(values)))
        }
        ExprKind::Map(entries) => {
            let tup = build_anon_tuple(entries, scope, &expr.span, ctx)?;
            Ok(Value::Tuple(tup))
        }
        ExprKind::Unary(UnaryOp::Neg, operand) => {
            match eval_expr(operand, scope, ctx)? {
                Value::Int(n) => n
                    .checked_neg()
                    .map(Value::Int)
                    .ok_or_else(|| Error::arithmetic("integer overflow", expr.span.clone())),
                Value::Float(x) => Ok(Value::Float(-x)),
                v => Err(Error::type_mismatch("number", v.type_name(), expr.span.clone())),
            }
        }
        ExprKind::Unary(UnaryOp::Not, operand) => {
            let v = eval_expr(operand, scope, ctx)?;
            Ok(Value::Bool(!v.is_truthy()))
        }
        ExprKind::Binary(BinaryOp::And, left, right) => {
            let l = eval_expr(left, scope, ctx)?;
            if !l.is_truthy() {
                return Ok(l);
            }
            eval_expr(right, scope, ctx)
        }
        ExprKind::Binary(BinaryOp::Or, left, right) => {
            let l = eval_expr(left, scope, ctx)?;
            if l.is_truthy() {
                return Ok(l);
            }
            eval_expr(right, scope, ctx)
        }
        ExprKind::Binary(op, left, right) => {
            let l = eval_expr(left, scope, ctx)?;
            let r = eval_expr(right, scope, ctx)?;
            binary_op(*op, l, r, &expr.span, ctx)
        }
        ExprKind::Conditional {
            then,
            cond,
            otherwise,
        } => {
            if eval_expr(cond, scope, ctx)?.is_truthy() {
                eval_expr(then, scope, ctx)
            } else {
                eval_expr(otherwise, scope, ctx)
            }
        }
        ExprKind::Compose(left, right) => {
            let l = eval_expr(left, scope, ctx)?;
            let r = eval_expr(right, scope, ctx)?;
            let (lt, rt) = (expect_tuple(&l, &left.span)?, expect_tuple(&r, &right.span)?);
            let composed = compose::compose(&lt, &rt, None, &expr.span)?;
            Ok(Value::Tuple(composed))
        }
        ExprKind::Extend(target, entries) => {
            let base = eval_expr(target, scope, ctx)?;
            let base = expect_tuple(&base, &target.span)?;
            let anon = build_anon_tuple(entries, scope, &expr.span, ctx)?;
            let composed = compose::compose(&base, &anon, None, &expr.span)?;
            Ok(Value::Tuple(composed))
        }
        ExprKind::Attr(target, name) => {
            let v = eval_expr(target, scope, ctx)?;
            attr_get(&v, name, &expr.span, ctx)
        }
        ExprKind::Index(target, index) => {
            let v = eval_expr(target, scope, ctx)?;
            let i = eval_expr(index, scope, ctx)?;
            index_get(&v, &i, &expr.span, ctx)
        }
        ExprKind::Call(callee, args) => {
            if let ExprKind::Ident(name) = &callee.kind {
                if let Some(host) = ctx.env.options.functions.get(name.as_ref()).cloned() {
                    let mut values = Vec::with_capacity(args.len());
                    for arg in args {
                        values.push(eval_expr(arg, scope, ctx)?);
                    }
                    return host(&values).map_err(|message| {
                        Error::function(name.as_ref(), message, expr.span.clone())
                    });
                }
                if let Some(builtin) = builtins::lookup(name) {
                    let mut values = Vec::with_capacity(args.len());
                    for arg in args {
                        values.push(eval_expr(arg, scope, ctx)?);
                    }
                    return builtin(ctx, &values, &expr.span);
                }
            }
            let callee_value = eval_expr(callee, scope, ctx)?;
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(eval_expr(arg, scope, ctx)?);
            }
            call_value(&callee_value, values, &expr.span, ctx)
        }
        ExprKind::CondCall(cond, then, otherwise) => {
            if eval_expr(cond, scope, ctx)?.is_truthy() {
                eval_expr(then, scope, ctx)
            } else {
                eval_expr(otherwise, scope, ctx)
            }
        }
        ExprKind::Lambda(def) => Ok(Value::Lambda(Rc::new(Lambda {
            params: def.params.clone(),
            body: def.body.clone(),
            captured: scope.clone(),
            origin: def.span.clone(),
        }))),
    }
}

fn enclosing_tuple(scope: &Scope, span: &SourceSpan) -> Result<Value> {
    scope
        .up()
        .and_then(|s| s.locals())
        .map(Value::Tuple)
        .ok_or_else(|| Error::undefined_name("up", span.clone()))
}

fn predecessor_tuple(scope: &Scope, span: &SourceSpan) -> Result<Value> {
    scope
        .superscope()
        .and_then(|s| s.locals())
        .map(Value::Tuple)
        .ok_or_else(|| Error::undefined_name("super", span.clone()))
}

fn expect_tuple(v: &Value, span: &SourceSpan) -> Result<Rc<Tuple>> {
    v.as_tuple()
        .cloned()
        .ok_or_else(|| Error::type_mismatch("tuple", v.type_name(), span.clone()))
}

/// Apply a lambda or reject a non-callable value.
pub fn call_value(
    callee: &Value,
    args: Vec<Value>,
    span: &SourceSpan,
    ctx: &mut EvalContext,
) -> Result<Value> {
    let lambda = match callee {
        Value::Lambda(l) => l.clone(),
        v => {
            return Err(Error::type_mismatch("function", v.type_name(), span.clone()));
        }
    };
    if args.len() != lambda.params.len() {
        return Err(Error::arity(lambda.params.len(), args.len(), span.clone()));
    }
    let bindings = Tuple::new(None, None, Vec::new(), lambda.origin.clone());
    for (param, arg) in lambda.params.iter().zip(args) {
        bindings.insert(param.clone(), Slot::Literal(arg));
    }
    let call_scope = Scope::binding(
        bindings,
        Some(lambda.captured.clone()),
        lambda.origin.clone(),
    );
    eval_expr(&lambda.body, &call_scope, ctx)
}

fn attr_get(v: &Value, name: &str, span: &SourceSpan, ctx: &mut EvalContext) -> Result<Value> {
    let tup = match v {
        Value::Tuple(t) => t,
        v => {
            return Err(Error::type_mismatch("tuple", v.type_name(), span.clone()));
        }
    };
    match name {
        "up" => enclosing_tuple(tup.scope(), span),
        "super" => predecessor_tuple(tup.scope(), span),
        _ => tuple_get(tup, name, ctx)?
            .ok_or_else(|| Error::key_not_found(name, span.clone())),
    }
}

fn index_get(v: &Value, index: &Value, span: &SourceSpan, ctx: &mut EvalContext) -> Result<Value> {
    match (v, index) {
        (Value::List(items), Value::Int(i)) => {
            let len = items.len();
            let real = if *i < 0 { len as i64 + *i } else { *i };
            if real < 0 || real as usize >= len {
                return Err(Error::index_out_of_range(*i, len, span.clone()));
            }
            Ok(items[real as usize].clone())
        }
        (Value::List(_), other) => Err(Error::type_mismatch(
            "integer index",
            other.type_name(),
            span.clone(),
        )),
        (Value::Tuple(_), Value::Str(key)) => attr_get(v, key, span, ctx),
        (Value::Tuple(_), other) => Err(Error::type_mismatch(
            "string key",
            other.type_name(),
            span.clone(),
        )),
        (other, _) => Err(Error::type_mismatch(
            "list or tuple",
            other.type_name(),
            span.clone(),
        )),
    }
}

fn binary_op(
    op: BinaryOp,
    l: Value,
    r: Value,
    span: &SourceSpan,
    ctx: &mut EvalContext,
) -> Result<Value> {
    match op {
        BinaryOp::Add => match (&l, &r) {
            (Value::Int(a), Value::Int(b)) => a
                .checked_add(*b)
                .map(Value::Int)
                .ok_or_else(|| Error::arithmetic("integer overflow", span.clone())),
            (Value::Str(a), Value::Str(b)) => {
                let mut s = a.to_string();
                s.push_str(b);
                Ok(Value::Str(Rc::from(s.as_str())))
            }
            (Value::List(a), Value::List(b)) => {
                let mut items = a.as_ref().clone();
                items.extend(b.iter().cloned());
                Ok(Value::List(Rc::new(items)))
            }
            _ => both_floats(&l, &r, span, "`+`").map(|(a, b)| Value::Float(a + b)),
        },
        BinaryOp::Sub => int_or_float(
            &l,
            &r,
            span,
            "`-`",
            |a, b| a.checked_sub(b),
            |a, b| a - b,
        ),
        BinaryOp::Mul => int_or_float(
            &l,
            &r,
            span,
            "`*`",
            |a, b| a.checked_mul(b),
            |a, b| a * b,
        ),
        BinaryOp::Div => {
            let (a, b) = both_floats(&l, &r, span, "`/`")?;
            if b == 0.0 {
                return Err(Error::arithmetic("division by zero", span.clone()));
            }
            Ok(Value::Float(a / b))
        }
        BinaryOp::Mod => match (&l, &r) {
            (Value::Int(a), Value::Int(b)) => {
                if *b == 0 {
                    return Err(Error::arithmetic("modulo by zero", span.clone()));
                }
                a.checked_rem(*b)
                    .map(Value::Int)
                    .ok_or_else(|| Error::arithmetic("integer overflow", span.clone()))
            }
            _ => {
                let (a, b) = both_floats(&l, &r, span, "`%`")?;
                if b == 0.0 {
                    return Err(Error::arithmetic("modulo by zero", span.clone()));
                }
                Ok(Value::Float(a % b))
            }
        },
        BinaryOp::Eq => Ok(Value::Bool(l == r)),
        BinaryOp::Ne => Ok(Value::Bool(l != r)),
        BinaryOp::Lt => compare(&l, &r, span).map(|o| Value::Bool(o == std::cmp::Ordering::Less)),
        BinaryOp::Le => compare(&l, &r, span).map(|o| Value::Bool(o != std::cmp::Ordering::Greater)),
        BinaryOp::Gt => compare(&l, &r, span).map(|o| Value::Bool(o == std::cmp::Ordering::Greater)),
        BinaryOp::Ge => compare(&l, &r, span).map(|o| Value::Bool(o != std::cmp::Ordering::Less)),
        BinaryOp::In => membership(&l, &r, span, ctx).map(Value::Bool),
        BinaryOp::Is => Ok(Value::Bool(identity(&l, &r))),
        BinaryOp::And | BinaryOp::Or => unreachable!("logical operators evaluate lazily"),
    }
}

fn both_floats(l: &Value, r: &Value, span: &SourceSpan, op: &str) -> Result<(f64, f64)> {
    match (l.as_float(), r.as_float()) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => {
            let got = if l.as_float().is_none() { l } else { r };
            Err(Error::type_mismatch(
                format!("numeric operands for {}", op),
                got.type_name(),
                span.clone(),
            ))
        }
    }
}

fn int_or_float(
    l: &Value,
    r: &Value,
    span: &SourceSpan,
    op: &str,
    int_op: impl Fn(i64, i64) -> Option<i64>,
    float_op: impl Fn(f64, f64) -> f64,
) -> Result<Value> {
    match (l, r) {
        (Value::Int(a), Value::Int(b)) => int_op(*a, *b)
            .map(Value::Int)
            .ok_or_else(|| Error::arithmetic("integer overflow", span.clone())),
        _ => both_floats(l, r, span, op).map(|(a, b)| Value::Float(float_op(a, b))),
    }
}

fn compare(l: &Value, r: &Value, span: &SourceSpan) -> Result<std::cmp::Ordering> {
    match (l, r) {
        (Value::Int(a), Value::Int(b)) => Ok(a.cmp(b)),
        (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
        _ => match (l.as_float(), r.as_float()) {
            (Some(a), Some(b)) => a.partial_cmp(&b).ok_or_else(|| {
                Error::arithmetic("comparison with NaN is unordered", span.clone())
            }),
            _ => Err(Error::type_mismatch(
                "comparable operands",
                format!("{} and {}", l.type_name(), r.type_name()),
                span.clone(),
            )),
        },
    }
}

fn membership(l: &Value, r: &Value, span: &SourceSpan, ctx: &mut EvalContext) -> Result<bool> {
    match r {
        Value::List(items) => Ok(items.iter().any(|item| item == l)),
        Value::Tuple(t) => match l {
            Value::Str(key) => {
                let viewed = view(t, ctx)?;
                Ok(viewed.has_key(key))
            }
            other => Err(Error::type_mismatch(
                "string key",
                other.type_name(),
                span.clone(),
            )),
        },
        Value::Str(haystack) => match l {
            Value::Str(needle) => Ok(haystack.contains(needle.as_ref())),
            other => Err(Error::type_mismatch(
                "string",
                other.type_name(),
                span.clone(),
            )),
        },
        other => Err(Error::type_mismatch(
            "list, tuple, or string",
            other.type_name(),
            span.clone(),
        )),
    }
}

/// `is`: identity on booleans, null, and integers; everything else is
/// never identical.
fn identity(l: &Value, r: &Value) -> bool {
    match (l, r) {
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Null, Value::Null) => true,
        _ => false,
    }
}

/// Materialize a mapping literal as an anonymous tuple in `scope`. Quoted
/// keys are interpolated now, in the enclosing scope; values defer; nested
/// mapping literals materialize eagerly so composition can merge them.
pub fn build_anon_tuple(
    entries: &[MapEntry],
    scope: &Scope,
    span: &SourceSpan,
    ctx: &mut EvalContext,
) -> Result<Rc<Tuple>> {
    let tup = Tuple::new(Some(scope.clone()), None, Vec::new(), span.clone());
    for entry in entries {
        let key: Rc<str> = match &entry.key {
            MapKey::Literal(name) => name.clone(),
            MapKey::Interpolated(format) => {
                Rc::from(render_format(format, scope, ctx)?.as_str())
            }
        };
        let slot = match &entry.value.kind {
            ExprKind::Map(nested) => {
                let scope = tup.scope().clone();
                let nested_tup = build_anon_tuple(nested, &scope, &entry.value.span, ctx)?;
                Slot::Literal(Value::Tuple(nested_tup))
            }
            _ => Slot::Deferred(Rc::new(Thunk {
                kind: ThunkKind::Expr(entry.value.clone()),
                scope: tup.scope().clone(),
                origin: entry.value.span.clone(),
                descr: Rc::from("expression in mapping literal"),
            })),
        };
        if !tup.insert(key.clone(), slot) {
            return Err(Error::parse(
                format!("duplicate key `{}` in mapping literal", key),
                entry.key_span.clone(),
            ));
        }
    }
    Ok(tup)
}

/// Interpolate a format string in `scope`.
pub fn render_format(
    format: &FmtString,
    scope: &Scope,
    ctx: &mut EvalContext,
) -> Result<String> {
    let mut out = String::new();
    for part in &format.parts {
        match part {
            FmtPart::Lit(text) => out.push_str(text),
            FmtPart::Slot(expr) => {
                let value = eval_expr(expr, scope, ctx)?;
                out.push_str(&stringify(&value, ctx.env.options.stringify, ctx)?);
            }
        }
    }
    Ok(out)
}

/// Evaluate a deferred computation in its captured scope.
pub fn eval_thunk(thunk: &Thunk, ctx: &mut EvalContext) -> Result<Value> {
    match &thunk.kind {
        ThunkKind::Expr(expr) => eval_expr(expr, &thunk.scope, ctx),
        ThunkKind::Fmt(format) => {
            let text = render_format(format, &thunk.scope, ctx)?;
            Ok(Value::Str(Rc::from(text.as_str())))
        }
        ThunkKind::Import(path) => {
            let text = render_format(path, &thunk.scope, ctx)?;
            let module = crate::loader::load_import(ctx.env, &text, &thunk.origin)?;
            Ok(Value::Tuple(module))
        }
        ThunkKind::Composite(parts) => {
            let mut acc: Option<Rc<Tuple>> = None;
            for part in parts.iter() {
                let value = match part {
                    CompositePart::Expr(expr) => eval_expr(expr, &thunk.scope, ctx)?,
                    CompositePart::Tuple(t) => Value::Tuple(t.clone()),
                };
                let t = expect_tuple(&value, &thunk.origin)?;
                acc = Some(match acc {
                    None => t,
                    Some(prev) => compose::compose(&prev, &t, None, &thunk.origin)?,
                });
            }
            match acc {
                Some(t) => Ok(Value::Tuple(t)),
                None => Err(Error::yaml(
                    "`!composite` requires at least one part",
                    thunk.origin.clone(),
                )),
            }
        }
        ThunkKind::List(items) => {
            let mut values = Vec::with_capacity(items.len());
            for item in items.iter() {
                match item {
                    ListItem::Done(v) => values.push(v.clone()),
                    ListItem::Deferred(th) => values.push(eval_thunk(th, ctx)?),
                }
            }
            Ok(Value::List(Rc::new(values)))
        }
    }
}

/// Render a value as text. Terse style prints top-level strings bare;
/// diagnostic style quotes them everywhere. Strings nested in containers
/// are always quoted. Forces tuple entries as needed. Tuples reached
/// through themselves render as `{...}` instead of recursing forever.
pub fn stringify(v: &Value, style: StringifyStyle, ctx: &mut EvalContext) -> Result<String> {
    match v {
        Value::Str(s) => match style {
            StringifyStyle::Terse => Ok(s.to_string()),
            StringifyStyle::Diagnostic => Ok(format!("'{}'", s)),
        },
        _ => stringify_nested(v, ctx, &mut Vec::new()),
    }
}

fn stringify_nested(v: &Value, ctx: &mut EvalContext, seen: &mut Vec<usize>) -> Result<String> {
    match v {
        Value::Str(s) => Ok(format!("'{}'", s)),
        Value::Int(n) => Ok(n.to_string()),
        Value::Float(x) => Ok(x.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok("null".to_string()),
        Value::External => Ok("external".to_string()),
        Value::List(items) => {
            let mut parts = Vec::with_capacity(items.len());
            for item in items.iter() {
                parts.push(stringify_nested(item, ctx, seen)?);
            }
            Ok(format!("[{}]", parts.join(", ")))
        }
        Value::Tuple(t) => {
            let viewed = view(t, ctx)?;
            if seen.contains(&viewed.id()) {
                return Ok("{...}".to_string());
            }
            seen.push(viewed.id());
            let mut parts = Vec::new();
            for key in viewed.keys() {
                let value = force_entry(&viewed, &key, ctx)?.unwrap_or(Value::Null);
                parts.push(format!("{}: {}", key, stringify_nested(&value, ctx, seen)?));
            }
            seen.pop();
            Ok(format!("{{{}}}", parts.join(", ")))
        }
        Value::Lambda(l) => Ok(format!("<lambda ({})>", l.params.join(", "))),
    }
}

/// Force every key of a tuple, recursively. Returns the same tuple value
/// with all memo cells filled.
pub fn evaluate_fully(tup: &Rc<Tuple>, ctx: &mut EvalContext) -> Result<Rc<Tuple>> {
    let mut visited = Vec::new();
    let viewed = evaluate_fully_inner(tup, ctx, &mut visited)?;
    Ok(viewed)
}

fn evaluate_fully_inner(
    tup: &Rc<Tuple>,
    ctx: &mut EvalContext,
    visited: &mut Vec<usize>,
) -> Result<Rc<Tuple>> {
    let viewed = view(tup, ctx)?;
    if visited.contains(&viewed.id()) {
        return Ok(viewed);
    }
    visited.push(viewed.id());
    for key in viewed.keys() {
        if let Some(Value::Tuple(nested)) = force_entry(&viewed, &key, ctx)? {
            evaluate_fully_inner(&nested, ctx, visited)?;
        }
    }
    Ok(viewed)
}
