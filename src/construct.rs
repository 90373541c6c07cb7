//! From YAML nodes to tuples.
//!
//! Wires the tag table: `!expr`, `!fmt`, `!import`, `!lambda`,
//! `!composite`, `!null`, `!external`, and the `!if`/`!elif`/`!else`
//! directives that group into conditional ladders. Untagged mappings become
//! tuples, sequences become lists, scalars resolve by the core schema.

use std::rc::Rc;

use crate::error::{Error, Result, SourceSpan};
use crate::expr::{parse_expression, parse_format, parse_lambda};
use crate::scope::Scope;
use crate::tuple::{
    CompositePart, CondLadder, LadderArm, ListItem, Slot, Thunk, ThunkKind, Tuple,
};
use crate::value::{Lambda, Value};
use crate::yaml::{resolve_plain_scalar, NodeKind, PlainScalar, YamlNode};

/// Construct the top-level tuple of a document. The root must be an
/// untagged mapping.
pub fn construct_root(node: &YamlNode) -> Result<Rc<Tuple>> {
    if let Some(tag) = &node.tag {
        return Err(Error::yaml(
            format!("the document root cannot carry tag `{}`", tag),
            node.span.clone(),
        ));
    }
    match &node.kind {
        NodeKind::Map(pairs) => construct_tuple(pairs, &node.span, None),
        _ => Err(Error::yaml(
            "the document root must be a mapping",
            node.span.clone(),
        )),
    }
}

struct LadderBuilder {
    arms: Vec<LadderArm>,
    fallback: Option<Rc<Tuple>>,
    origin: SourceSpan,
}

impl LadderBuilder {
    fn finish(self, owner: &Rc<Tuple>) {
        owner.push_ladder(Rc::new(CondLadder {
            arms: self.arms,
            fallback: self.fallback,
            origin: self.origin,
        }));
    }
}

fn construct_tuple(
    pairs: &[(YamlNode, YamlNode)],
    span: &SourceSpan,
    up: Option<Scope>,
) -> Result<Rc<Tuple>> {
    let tup = Tuple::new(up, None, Vec::new(), span.clone());
    let mut ladder: Option<LadderBuilder> = None;

    for (key_node, value_node) in pairs {
        match key_node.tag.as_deref() {
            Some("!if") => {
                if let Some(open) = ladder.take() {
                    open.finish(&tup);
                }
                let guard = parse_expression(directive_text(key_node)?, &key_node.span)?;
                let body = directive_body(value_node, &tup)?;
                ladder = Some(LadderBuilder {
                    arms: vec![LadderArm { guard, body }],
                    fallback: None,
                    origin: key_node.span.clone(),
                });
            }
            Some("!elif") => {
                let open = ladder.as_mut().ok_or_else(|| {
                    Error::yaml(
                        "`!elif` directive is not paired to an `!if` directive",
                        key_node.span.clone(),
                    )
                })?;
                let guard = parse_expression(directive_text(key_node)?, &key_node.span)?;
                let body = directive_body(value_node, &tup)?;
                open.arms.push(LadderArm { guard, body });
            }
            Some("!else") => {
                let text = directive_text(key_node)?;
                if !text.trim().is_empty() {
                    return Err(Error::yaml(
                        format!("`!else` should not have a value attached, but contained `{}`", text),
                        key_node.span.clone(),
                    ));
                }
                let mut open = ladder.take().ok_or_else(|| {
                    Error::yaml(
                        "`!else` directive is not paired to an `!if` directive",
                        key_node.span.clone(),
                    )
                })?;
                open.fallback = Some(directive_body(value_node, &tup)?);
                open.finish(&tup);
            }
            _ => {
                if let Some(open) = ladder.take() {
                    open.finish(&tup);
                }
                let key = plain_key(key_node)?;
                let slot = construct_value(value_node, tup.scope())?;
                if !tup.insert(Rc::from(key), slot) {
                    return Err(Error::yaml(
                        format!("duplicate tuple key `{}`", key),
                        key_node.span.clone(),
                    ));
                }
            }
        }
    }
    if let Some(open) = ladder.take() {
        open.finish(&tup);
    }
    Ok(tup)
}

fn directive_text(node: &YamlNode) -> Result<&str> {
    match &node.kind {
        NodeKind::Scalar { text, .. } => Ok(text),
        _ => Err(Error::yaml(
            "conditional directives must be scalar keys",
            node.span.clone(),
        )),
    }
}

fn directive_body(node: &YamlNode, owner: &Rc<Tuple>) -> Result<Rc<Tuple>> {
    if node.tag.is_some() {
        return Err(Error::yaml(
            "conditional bodies must be plain mappings; for individual values use `!expr cond(c, a, b)`",
            node.span.clone(),
        ));
    }
    match &node.kind {
        NodeKind::Map(pairs) => {
            construct_tuple(pairs, &node.span, Some(owner.scope().clone()))
        }
        _ => Err(Error::yaml(
            "conditional bodies must be mappings; for individual values use `!expr cond(c, a, b)`",
            node.span.clone(),
        )),
    }
}

fn plain_key(node: &YamlNode) -> Result<&str> {
    if let Some(tag) = &node.tag {
        return Err(Error::yaml(
            format!("mapping keys must be plain scalars, not `{}`", tag),
            node.span.clone(),
        ));
    }
    match &node.kind {
        NodeKind::Scalar { text, .. } => Ok(text),
        _ => Err(Error::yaml(
            "mapping keys must be scalars",
            node.span.clone(),
        )),
    }
}

fn scalar_payload<'n>(node: &'n YamlNode, tag: &str) -> Result<&'n str> {
    match &node.kind {
        NodeKind::Scalar { text, .. } => Ok(text),
        _ => Err(Error::yaml(
            format!("`{}` requires a scalar value", tag),
            node.span.clone(),
        )),
    }
}

fn construct_value(node: &YamlNode, owner_scope: &Scope) -> Result<Slot> {
    match node.tag.as_deref() {
        Some("!expr") => {
            let text = scalar_payload(node, "!expr")?;
            let expr = parse_expression(text, &node.span)?;
            Ok(Slot::Deferred(Rc::new(Thunk {
                kind: ThunkKind::Expr(expr),
                scope: owner_scope.clone(),
                origin: node.span.clone(),
                descr: Rc::from(format!("expression `{}`", text.trim()).as_str()),
            })))
        }
        Some("!fmt") => {
            let text = scalar_payload(node, "!fmt")?;
            let format = parse_format(text, &node.span)?;
            Ok(Slot::Deferred(Rc::new(Thunk {
                kind: ThunkKind::Fmt(format),
                scope: owner_scope.clone(),
                origin: node.span.clone(),
                descr: Rc::from(format!("format string `{}`", text.trim()).as_str()),
            })))
        }
        Some("!import") => {
            let text = scalar_payload(node, "!import")?;
            let path = parse_format(text, &node.span)?;
            Ok(Slot::Deferred(Rc::new(Thunk {
                kind: ThunkKind::Import(path),
                scope: owner_scope.clone(),
                origin: node.span.clone(),
                descr: Rc::from(format!("import `{}`", text.trim()).as_str()),
            })))
        }
        Some("!lambda") => {
            let text = scalar_payload(node, "!lambda")?;
            let def = parse_lambda(text, &node.span)?;
            Ok(Slot::Literal(Value::Lambda(Rc::new(Lambda {
                params: def.params.clone(),
                body: def.body.clone(),
                captured: owner_scope.clone(),
                origin: node.span.clone(),
            }))))
        }
        Some("!composite") => {
            let parts = composite_parts(node, owner_scope)?;
            Ok(Slot::Deferred(Rc::new(Thunk {
                kind: ThunkKind::Composite(Rc::new(parts)),
                scope: owner_scope.clone(),
                origin: node.span.clone(),
                descr: Rc::from("tuple composite"),
            })))
        }
        Some("!null") => {
            let text = scalar_payload(node, "!null")?;
            if !text.is_empty() {
                return Err(Error::yaml(
                    format!("`!null` got an unexpected value `{}`", text),
                    node.span.clone(),
                ));
            }
            Ok(Slot::Literal(Value::Null))
        }
        Some("!external") => {
            let text = scalar_payload(node, "!external")?;
            if !text.is_empty() {
                return Err(Error::yaml(
                    format!("`!external` got an unexpected value `{}`", text),
                    node.span.clone(),
                ));
            }
            Ok(Slot::Literal(Value::External))
        }
        Some(tag @ ("!if" | "!elif" | "!else")) => Err(Error::yaml(
            format!("`{}` must appear as a mapping key", tag),
            node.span.clone(),
        )),
        Some("!!str") => {
            let text = scalar_payload(node, "!!str")?;
            Ok(Slot::Literal(Value::Str(Rc::from(text))))
        }
        Some("!!int") => {
            let text = scalar_payload(node, "!!int")?;
            text.trim()
                .parse::<i64>()
                .map(|n| Slot::Literal(Value::Int(n)))
                .map_err(|_| {
                    Error::yaml(format!("invalid integer `{}`", text), node.span.clone())
                })
        }
        Some("!!float") => {
            let text = scalar_payload(node, "!!float")?;
            text.trim()
                .parse::<f64>()
                .map(|x| Slot::Literal(Value::Float(x)))
                .map_err(|_| Error::yaml(format!("invalid float `{}`", text), node.span.clone()))
        }
        Some("!!bool") => {
            let text = scalar_payload(node, "!!bool")?;
            match resolve_plain_scalar(text.trim()) {
                PlainScalar::Bool(b) => Ok(Slot::Literal(Value::Bool(b))),
                _ => Err(Error::yaml(
                    format!("invalid boolean `{}`", text),
                    node.span.clone(),
                )),
            }
        }
        Some("!!null") => Ok(Slot::Literal(Value::Null)),
        Some(tag) => Err(Error::yaml(
            format!("no constructor bound for tag `{}`", tag),
            node.span.clone(),
        )),
        None => match &node.kind {
            NodeKind::Scalar { text, quoted } => {
                if *quoted {
                    return Ok(Slot::Literal(Value::Str(Rc::from(text.as_str()))));
                }
                Ok(Slot::Literal(match resolve_plain_scalar(text) {
                    PlainScalar::Null => Value::Null,
                    PlainScalar::Bool(b) => Value::Bool(b),
                    PlainScalar::Int(n) => Value::Int(n),
                    PlainScalar::Float(x) => Value::Float(x),
                    PlainScalar::Str => Value::Str(Rc::from(text.as_str())),
                }))
            }
            NodeKind::Map(pairs) => {
                let nested = construct_tuple(pairs, &node.span, Some(owner_scope.clone()))?;
                Ok(Slot::Literal(Value::Tuple(nested)))
            }
            NodeKind::Seq(items) => {
                let mut constructed = Vec::with_capacity(items.len());
                for item in items {
                    constructed.push(construct_value(item, owner_scope)?);
                }
                if constructed
                    .iter()
                    .all(|slot| matches!(slot, Slot::Literal(_)))
                {
                    let values: Vec<Value> = constructed
                        .into_iter()
                        .map(|slot| match slot {
                            Slot::Literal(v) => v,
                            _ => unreachable!(),
                        })
                        .collect();
                    Ok(Slot::Literal(Value::List(Rc::new(values))))
                } else {
                    let items: Vec<ListItem> = constructed
                        .into_iter()
                        .map(|slot| match slot {
                            Slot::Literal(v) => ListItem::Done(v),
                            Slot::Deferred(th) => ListItem::Deferred(th),
                            _ => unreachable!(),
                        })
                        .collect();
                    Ok(Slot::Deferred(Rc::new(Thunk {
                        kind: ThunkKind::List(Rc::new(items)),
                        scope: owner_scope.clone(),
                        origin: node.span.clone(),
                        descr: Rc::from("list with deferred elements"),
                    })))
                }
            }
        },
    }
}

fn composite_parts(node: &YamlNode, owner_scope: &Scope) -> Result<Vec<CompositePart>> {
    let parts = match &node.kind {
        NodeKind::Scalar { text, .. } => {
            vec![CompositePart::Expr(parse_expression(text, &node.span)?)]
        }
        NodeKind::Seq(items) => {
            let mut parts = Vec::with_capacity(items.len());
            for item in items {
                match (&item.kind, item.tag.as_deref()) {
                    (NodeKind::Scalar { text, .. }, None | Some("!expr")) => {
                        parts.push(CompositePart::Expr(parse_expression(text, &item.span)?));
                    }
                    (NodeKind::Map(pairs), None) => {
                        let part =
                            construct_tuple(pairs, &item.span, Some(owner_scope.clone()))?;
                        parts.push(CompositePart::Tuple(part));
                    }
                    _ => {
                        return Err(Error::yaml(
                            "`!composite` parts must be names, expressions, or mappings",
                            item.span.clone(),
                        ))
                    }
                }
            }
            parts
        }
        NodeKind::Map(_) => {
            return Err(Error::yaml(
                "`!composite` takes a name list or a sequence, not a mapping",
                node.span.clone(),
            ))
        }
    };
    if parts.is_empty() {
        return Err(Error::yaml(
            "`!composite` requires at least one part",
            node.span.clone(),
        ));
    }
    Ok(parts)
}
