//! Built-in functions available without registration.
//!
//! User-supplied functions shadow these by name. `cond` is not here: it
//! evaluates lazily and is handled as a special form by the parser and
//! evaluator.

use std::rc::Rc;

use crate::error::{Error, Result, SourceSpan};
use crate::eval::{stringify, EvalContext};
use crate::loader::StringifyStyle;
use crate::value::Value;

pub type BuiltinFn = fn(&mut EvalContext, &[Value], &SourceSpan) -> Result<Value>;

pub fn lookup(name: &str) -> Option<BuiltinFn> {
    match name {
        "len" => Some(builtin_len),
        "int" => Some(builtin_int),
        "float" => Some(builtin_float),
        "str" => Some(builtin_str),
        _ => None,
    }
}

fn one_arg<'a>(args: &'a [Value], span: &SourceSpan) -> Result<&'a Value> {
    if args.len() != 1 {
        return Err(Error::arity(1, args.len(), span.clone()));
    }
    Ok(&args[0])
}

fn builtin_len(ctx: &mut EvalContext, args: &[Value], span: &SourceSpan) -> Result<Value> {
    let arg = one_arg(args, span)?;
    let len = match arg {
        Value::Str(s) => s.chars().count(),
        Value::List(items) => items.len(),
        Value::Tuple(t) => crate::compose::view(t, ctx)?.len(),
        v => {
            return Err(Error::type_mismatch(
                "string, list, or tuple",
                v.type_name(),
                span.clone(),
            ))
        }
    };
    Ok(Value::Int(len as i64))
}

fn builtin_int(_ctx: &mut EvalContext, args: &[Value], span: &SourceSpan) -> Result<Value> {
    let arg = one_arg(args, span)?;
    match arg {
        Value::Int(n) => Ok(Value::Int(*n)),
        Value::Float(x) => Ok(Value::Int(*x as i64)),
        Value::Bool(b) => Ok(Value::Int(if *b { 1 } else { 0 })),
        Value::Str(s) => s.trim().parse::<i64>().map(Value::Int).map_err(|_| {
            Error::function("int", format!("invalid integer literal `{}`", s), span.clone())
        }),
        v => Err(Error::type_mismatch(
            "number, boolean, or string",
            v.type_name(),
            span.clone(),
        )),
    }
}

fn builtin_float(_ctx: &mut EvalContext, args: &[Value], span: &SourceSpan) -> Result<Value> {
    let arg = one_arg(args, span)?;
    match arg {
        Value::Int(n) => Ok(Value::Float(*n as f64)),
        Value::Float(x) => Ok(Value::Float(*x)),
        Value::Bool(b) => Ok(Value::Float(if *b { 1.0 } else { 0.0 })),
        Value::Str(s) => s.trim().parse::<f64>().map(Value::Float).map_err(|_| {
            Error::function("float", format!("invalid float literal `{}`", s), span.clone())
        }),
        v => Err(Error::type_mismatch(
            "number, boolean, or string",
            v.type_name(),
            span.clone(),
        )),
    }
}

fn builtin_str(ctx: &mut EvalContext, args: &[Value], span: &SourceSpan) -> Result<Value> {
    let arg = one_arg(args, span)?;
    let text = stringify(arg, StringifyStyle::Terse, ctx)?;
    Ok(Value::Str(Rc::from(text.as_str())))
}
