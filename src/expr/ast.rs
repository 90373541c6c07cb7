use std::rc::Rc;

use smallvec::SmallVec;

use crate::error::SourceSpan;

pub type ExprRef = Rc<Expr>;

/// An expression node with the span of its first token.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: SourceSpan,
}

impl Expr {
    pub fn new(kind: ExprKind, span: SourceSpan) -> ExprRef {
        Rc::new(Expr { kind, span })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Ident(Rc<str>),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
    /// String literal; contents are format-interpolated at evaluation time.
    Str(Rc<FmtString>),
    List(Vec<ExprRef>),
    /// Mapping literal `{ key: expr, ... }`.
    Map(Vec<MapEntry>),
    Unary(UnaryOp, ExprRef),
    Binary(BinaryOp, ExprRef, ExprRef),
    /// `a if cond else b`.
    Conditional {
        then: ExprRef,
        cond: ExprRef,
        otherwise: ExprRef,
    },
    /// Juxtaposition: `a b` composes two tuples.
    Compose(ExprRef, ExprRef),
    /// Extension: `x { key: expr, ... }`.
    Extend(ExprRef, Vec<MapEntry>),
    Attr(ExprRef, Rc<str>),
    Index(ExprRef, ExprRef),
    Call(ExprRef, SmallVec<[ExprRef; 4]>),
    /// `cond(p, a, b)`: only the selected branch is evaluated.
    CondCall(ExprRef, ExprRef, ExprRef),
    Lambda(Rc<LambdaDef>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapEntry {
    pub key: MapKey,
    pub key_span: SourceSpan,
    pub value: ExprRef,
}

/// Bare identifier keys are taken literally; quoted keys are interpolated
/// in the enclosing scope when the tuple is materialized.
#[derive(Debug, Clone, PartialEq)]
pub enum MapKey {
    Literal(Rc<str>),
    Interpolated(Rc<FmtString>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LambdaDef {
    pub params: SmallVec<[Rc<str>; 4]>,
    pub body: ExprRef,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    Is,
    And,
    Or,
}

/// A parsed format string: literal runs and `{expression}` slots.
#[derive(Debug, Clone, PartialEq)]
pub struct FmtString {
    pub parts: Vec<FmtPart>,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FmtPart {
    Lit(String),
    Slot(ExprRef),
}

impl FmtString {
    /// The plain text, when the string contains no slots.
    pub fn literal_only(&self) -> Option<String> {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                FmtPart::Lit(s) => out.push_str(s),
                FmtPart::Slot(_) => return None,
            }
        }
        Some(out)
    }
}
