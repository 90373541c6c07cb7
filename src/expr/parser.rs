use std::rc::Rc;

use smallvec::SmallVec;

use crate::error::{Error, Result, SourceSpan};

use super::ast::{
    BinaryOp, Expr, ExprKind, ExprRef, LambdaDef, MapEntry, MapKey, UnaryOp,
};
use super::fmt;
use super::lexer::Lexer;
use super::token::{SpannedToken, Token};

/// Parse a complete expression from source text.
pub fn parse_expression(text: &str, base: &SourceSpan) -> Result<ExprRef> {
    let tokens = Lexer::new(text, base.clone()).tokenize()?;
    let mut parser = Parser::new(tokens, base.clone());
    let expr = parser.expr()?;
    parser.expect_end()?;
    Ok(expr)
}

/// Parse a `!lambda` payload: `params ':' body`, with an optional leading
/// `lambda` keyword.
pub fn parse_lambda(text: &str, base: &SourceSpan) -> Result<Rc<LambdaDef>> {
    let tokens = Lexer::new(text, base.clone()).tokenize()?;
    let mut parser = Parser::new(tokens, base.clone());
    parser.eat(&Token::Lambda);
    let def = parser.lambda_tail(base.clone())?;
    parser.expect_end()?;
    Ok(def)
}

/// Recursive-descent parser over the token stream, one method per
/// precedence level (loosest first).
struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
    end: SourceSpan,
}

impl Parser {
    fn new(tokens: Vec<SpannedToken>, end: SourceSpan) -> Self {
        let end = tokens.last().map(|t| t.span.clone()).unwrap_or(end);
        Parser { tokens, pos: 0, end }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|t| &t.token)
    }

    fn here(&self) -> SourceSpan {
        self.tokens
            .get(self.pos)
            .map(|t| t.span.clone())
            .unwrap_or_else(|| self.end.clone())
    }

    fn advance(&mut self) -> Option<SpannedToken> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token) -> Result<SourceSpan> {
        let span = self.here();
        match self.peek() {
            Some(t) if t == token => {
                self.pos += 1;
                Ok(span)
            }
            Some(t) => Err(Error::parse(
                format!("expected {}, found {}", token.describe(), t.describe()),
                span,
            )),
            None => Err(Error::parse(
                format!("expected {}, found end of expression", token.describe()),
                span,
            )),
        }
    }

    fn expect_end(&mut self) -> Result<()> {
        match self.peek() {
            None => Ok(()),
            Some(t) => Err(Error::parse(
                format!("unexpected {} after expression", t.describe()),
                self.here(),
            )),
        }
    }

    fn expr(&mut self) -> Result<ExprRef> {
        if self.peek() == Some(&Token::Lambda) {
            let span = self.here();
            self.advance();
            let def = self.lambda_tail(span.clone())?;
            return Ok(Expr::new(ExprKind::Lambda(def), span));
        }
        self.conditional()
    }

    fn lambda_tail(&mut self, span: SourceSpan) -> Result<Rc<LambdaDef>> {
        let mut params: SmallVec<[Rc<str>; 4]> = SmallVec::new();
        if self.peek() != Some(&Token::Colon) {
            loop {
                let at = self.here();
                match self.advance().map(|t| t.token) {
                    Some(Token::Ident(name)) => params.push(Rc::from(name.as_str())),
                    Some(t) => {
                        return Err(Error::parse(
                            format!("expected parameter name, found {}", t.describe()),
                            at,
                        ))
                    }
                    None => {
                        return Err(Error::parse(
                            "expected parameter name, found end of expression",
                            at,
                        ))
                    }
                }
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }
        self.expect(&Token::Colon)?;
        let body = self.expr()?;
        Ok(Rc::new(LambdaDef { params, body, span }))
    }

    fn conditional(&mut self) -> Result<ExprRef> {
        let value = self.or_expr()?;
        if self.eat(&Token::If) {
            let cond = self.or_expr()?;
            self.expect(&Token::Else)?;
            let otherwise = self.conditional()?;
            let span = value.span.clone();
            return Ok(Expr::new(
                ExprKind::Conditional {
                    then: value,
                    cond,
                    otherwise,
                },
                span,
            ));
        }
        Ok(value)
    }

    fn or_expr(&mut self) -> Result<ExprRef> {
        let mut left = self.and_expr()?;
        while self.eat(&Token::Or) {
            let right = self.and_expr()?;
            let span = left.span.clone();
            left = Expr::new(ExprKind::Binary(BinaryOp::Or, left, right), span);
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<ExprRef> {
        let mut left = self.not_expr()?;
        while self.eat(&Token::And) {
            let right = self.not_expr()?;
            let span = left.span.clone();
            left = Expr::new(ExprKind::Binary(BinaryOp::And, left, right), span);
        }
        Ok(left)
    }

    fn not_expr(&mut self) -> Result<ExprRef> {
        if self.peek() == Some(&Token::Not) {
            let span = self.here();
            self.advance();
            let operand = self.not_expr()?;
            return Ok(Expr::new(ExprKind::Unary(UnaryOp::Not, operand), span));
        }
        self.comparison()
    }

    fn comparison_op(&self) -> Option<BinaryOp> {
        match self.peek() {
            Some(Token::Eq) => Some(BinaryOp::Eq),
            Some(Token::Ne) => Some(BinaryOp::Ne),
            Some(Token::Lt) => Some(BinaryOp::Lt),
            Some(Token::Le) => Some(BinaryOp::Le),
            Some(Token::Gt) => Some(BinaryOp::Gt),
            Some(Token::Ge) => Some(BinaryOp::Ge),
            Some(Token::In) => Some(BinaryOp::In),
            Some(Token::Is) => Some(BinaryOp::Is),
            _ => None,
        }
    }

    fn comparison(&mut self) -> Result<ExprRef> {
        let left = self.additive()?;
        if let Some(op) = self.comparison_op() {
            self.advance();
            let right = self.additive()?;
            if self.comparison_op().is_some() {
                return Err(Error::parse(
                    "comparison operators do not chain",
                    self.here(),
                ));
            }
            let span = left.span.clone();
            return Ok(Expr::new(ExprKind::Binary(op, left, right), span));
        }
        Ok(left)
    }

    fn additive(&mut self) -> Result<ExprRef> {
        let mut left = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.multiplicative()?;
            let span = left.span.clone();
            left = Expr::new(ExprKind::Binary(op, left, right), span);
        }
        Ok(left)
    }

    fn multiplicative(&mut self) -> Result<ExprRef> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Percent) => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.unary()?;
            let span = left.span.clone();
            left = Expr::new(ExprKind::Binary(op, left, right), span);
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<ExprRef> {
        if self.peek() == Some(&Token::Minus) {
            let span = self.here();
            self.advance();
            let operand = self.unary()?;
            return Ok(Expr::new(ExprKind::Unary(UnaryOp::Neg, operand), span));
        }
        self.juxtaposition()
    }

    /// Adjacency of two postfix expressions is tuple composition. Binds
    /// tighter than arithmetic, looser than call/index/attribute.
    fn juxtaposition(&mut self) -> Result<ExprRef> {
        let mut left = self.postfix()?;
        while self.starts_primary() {
            let right = self.postfix()?;
            let span = left.span.clone();
            left = Expr::new(ExprKind::Compose(left, right), span);
        }
        Ok(left)
    }

    fn starts_primary(&self) -> bool {
        matches!(
            self.peek(),
            Some(Token::Ident(_))
                | Some(Token::Int(_))
                | Some(Token::Float(_))
                | Some(Token::Str(_))
                | Some(Token::True)
                | Some(Token::False)
                | Some(Token::Null)
                | Some(Token::LParen)
                | Some(Token::LBracket)
                | Some(Token::Cond)
        )
    }

    fn postfix(&mut self) -> Result<ExprRef> {
        let mut expr = self.primary()?;
        loop {
            match self.peek() {
                Some(Token::LParen) => {
                    let span = expr.span.clone();
                    self.advance();
                    let mut args: SmallVec<[ExprRef; 4]> = SmallVec::new();
                    if self.peek() != Some(&Token::RParen) {
                        loop {
                            args.push(self.expr()?);
                            if !self.eat(&Token::Comma) {
                                break;
                            }
                        }
                    }
                    self.expect(&Token::RParen)?;
                    expr = Expr::new(ExprKind::Call(expr, args), span);
                }
                Some(Token::LBracket) => {
                    let span = expr.span.clone();
                    self.advance();
                    let index = self.expr()?;
                    self.expect(&Token::RBracket)?;
                    expr = Expr::new(ExprKind::Index(expr, index), span);
                }
                Some(Token::Dot) => {
                    let span = expr.span.clone();
                    self.advance();
                    let at = self.here();
                    match self.advance().map(|t| t.token) {
                        Some(Token::Ident(name)) => {
                            expr = Expr::new(
                                ExprKind::Attr(expr, Rc::from(name.as_str())),
                                span,
                            );
                        }
                        Some(t) => {
                            return Err(Error::parse(
                                format!("expected attribute name after `.`, found {}", t.describe()),
                                at,
                            ))
                        }
                        None => {
                            return Err(Error::parse(
                                "expected attribute name after `.`",
                                at,
                            ))
                        }
                    }
                }
                Some(Token::LBrace) => {
                    let span = expr.span.clone();
                    self.advance();
                    let entries = self.map_entries()?;
                    expr = Expr::new(ExprKind::Extend(expr, entries), span);
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn primary(&mut self) -> Result<ExprRef> {
        let span = self.here();
        match self.advance().map(|t| t.token) {
            Some(Token::Ident(name)) => {
                Ok(Expr::new(ExprKind::Ident(Rc::from(name.as_str())), span))
            }
            Some(Token::Int(n)) => Ok(Expr::new(ExprKind::Int(n), span)),
            Some(Token::Float(x)) => Ok(Expr::new(ExprKind::Float(x), span)),
            Some(Token::Str(text)) => {
                let format = fmt::parse_format(&text, &span)?;
                Ok(Expr::new(ExprKind::Str(format), span))
            }
            Some(Token::True) => Ok(Expr::new(ExprKind::Bool(true), span)),
            Some(Token::False) => Ok(Expr::new(ExprKind::Bool(false), span)),
            Some(Token::Null) => Ok(Expr::new(ExprKind::Null, span)),
            Some(Token::LParen) => {
                let inner = self.expr()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(Token::LBracket) => {
                let mut items = Vec::new();
                if self.peek() != Some(&Token::RBracket) {
                    loop {
                        items.push(self.expr()?);
                        if !self.eat(&Token::Comma) {
                            break;
                        }
                        if self.peek() == Some(&Token::RBracket) {
                            break;
                        }
                    }
                }
                self.expect(&Token::RBracket)?;
                Ok(Expr::new(ExprKind::List(items), span))
            }
            Some(Token::LBrace) => {
                let entries = self.map_entries()?;
                Ok(Expr::new(ExprKind::Map(entries), span))
            }
            Some(Token::Cond) => {
                self.expect(&Token::LParen)?;
                let cond = self.expr()?;
                self.expect(&Token::Comma)?;
                let then = self.expr()?;
                self.expect(&Token::Comma)?;
                let otherwise = self.expr()?;
                self.eat(&Token::Comma);
                self.expect(&Token::RParen)?;
                Ok(Expr::new(ExprKind::CondCall(cond, then, otherwise), span))
            }
            Some(Token::For) => Err(Error::parse(
                "`for` comprehensions are not supported",
                span,
            )),
            Some(t) => Err(Error::parse(
                format!("expected an expression, found {}", t.describe()),
                span,
            )),
            None => Err(Error::parse(
                "expected an expression, found end of input",
                span,
            )),
        }
    }

    /// Entries of a mapping literal; the opening `{` is already consumed.
    /// Keys are bare identifiers (taken literally) or quoted strings
    /// (interpolated later); every key requires a value.
    fn map_entries(&mut self) -> Result<Vec<MapEntry>> {
        let mut entries = Vec::new();
        loop {
            if self.eat(&Token::RBrace) {
                return Ok(entries);
            }
            let key_span = self.here();
            let key = match self.advance().map(|t| t.token) {
                Some(Token::Ident(name)) => MapKey::Literal(Rc::from(name.as_str())),
                Some(Token::Str(text)) => {
                    MapKey::Interpolated(fmt::parse_format(&text, &key_span)?)
                }
                Some(t) => {
                    return Err(Error::parse(
                        format!(
                            "mapping keys must be identifiers or strings, found {}",
                            t.describe()
                        ),
                        key_span,
                    ))
                }
                None => {
                    return Err(Error::parse("unterminated mapping literal", key_span));
                }
            };
            if !self.eat(&Token::Colon) {
                return Err(Error::parse(
                    "expected `:` after mapping key; every key must have a value",
                    self.here(),
                ));
            }
            let value = self.expr()?;
            entries.push(MapEntry {
                key,
                key_span,
                value,
            });
            if !self.eat(&Token::Comma) {
                self.expect(&Token::RBrace)?;
                return Ok(entries);
            }
        }
    }
}
