use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::error::SourceSpan;
use crate::expr::ast::ExprRef;
use crate::scope::Scope;
use crate::tuple::Tuple;

/// A concrete configuration value.
///
/// `Str`, `List`, `Tuple`, and `Lambda` payloads are reference-counted so
/// values clone cheaply while tuples keep their identity. Deferred values
/// never appear here: a tuple slot is forced before its value escapes.
#[derive(Clone)]
pub enum Value {
    Str(Rc<str>),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// Erases a key when composited onto it.
    Null,
    /// Inert placeholder for values a later composite is expected to supply.
    External,
    List(Rc<Vec<Value>>),
    Tuple(Rc<Tuple>),
    Lambda(Rc<Lambda>),
}

/// A user-defined function with its captured lexical scope.
pub struct Lambda {
    pub params: SmallVec<[Rc<str>; 4]>,
    pub body: ExprRef,
    pub captured: Scope,
    pub origin: SourceSpan,
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Str(_) => "string",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Bool(_) => "boolean",
            Value::Null => "null",
            Value::External => "external",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Lambda(_) => "lambda",
        }
    }

    /// Truthiness for guards, `cond`, and the logical operators: empty and
    /// zero values are falsy, as are `null` and `external`.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Str(s) => !s.is_empty(),
            Value::Int(n) => *n != 0,
            Value::Float(x) => *x != 0.0,
            Value::Bool(b) => *b,
            Value::Null | Value::External => false,
            Value::List(items) => !items.is_empty(),
            Value::Tuple(t) => !t.is_empty() || t.has_ladders(),
            Value::Lambda(_) => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&Rc<Tuple>> {
        match self {
            Value::Tuple(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) => (*a as f64) == *b,
            (Value::Float(a), Value::Int(b)) => *a == (*b as f64),
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Null, Value::Null) => true,
            (Value::External, Value::External) => true,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Tuple(a), Value::Tuple(b)) => Rc::ptr_eq(a, b),
            (Value::Lambda(a), Value::Lambda(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", x),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Null => write!(f, "null"),
            Value::External => write!(f, "external"),
            Value::List(items) => f.debug_list().entries(items.iter()).finish(),
            Value::Tuple(t) => write!(f, "<tuple with {} keys>", t.len()),
            Value::Lambda(l) => write!(f, "<lambda ({})>", l.params.join(", ")),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Rc::from(s.as_str()))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(Rc::new(items))
    }
}
