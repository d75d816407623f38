//! Recursive-descent parser for the flat rule-expression grammar.
//!
//! ```text
//! expression := or_expr
//! or_expr     := and_expr (OR and_expr)*
//! and_expr    := unary (AND unary)*
//! unary       := NOT unary | comparison
//! comparison  := operand (comp_op operand | IN list_literal)?
//! operand     := function_call | identifier | literal
//! function_call := ident "(" [literal ("," literal)*] ")"
//! literal     := string | number | bool | null | list_literal
//! list_literal := "[" [literal ("," literal)*] "]"
//! identifier  := ident ("." ident)*
//! ```
//!
//! A `(` that is not immediately preceded by a function name is rejected:
//! this grammar has no parenthesised sub-expressions.

use crate::ast::{CompOp, Expr, Literal, Operand, Predicate};
use crate::error::{DslError, MAX_EXPRESSION_BYTES};
use crate::lexer::{self, SpannedToken, TokenKind};

/// Parses a rule expression into an [`Expr`] tree.
///
/// # Errors
/// Returns [`DslError`] for any lexical, grammatical, or built-in-function
/// shape violation. A successful parse is guaranteed to evaluate without a
/// further validation failure.
pub fn parse(input: &str) -> Result<Expr, DslError> {
    if input.len() > MAX_EXPRESSION_BYTES {
        return Err(DslError::InputTooLarge {
            max_bytes: MAX_EXPRESSION_BYTES,
            actual_bytes: input.len(),
        });
    }
    let tokens = lexer::lex(input)?;
    let mut parser = Parser { tokens, index: 0 };
    let expr = parser.parse_or()?;
    parser.expect_eof()?;
    Ok(expr)
}

struct Parser {
    tokens: Vec<SpannedToken>,
    index: usize,
}

impl Parser {
    fn current(&self) -> &SpannedToken {
        debug_assert!(self.index < self.tokens.len(), "parser index out of bounds");
        &self.tokens[self.index]
    }

    fn advance(&mut self) {
        if self.index < self.tokens.len() - 1 {
            self.index += 1;
        }
    }

    fn matches_keyword(&mut self, kind: &TokenKind) -> bool {
        if &self.current().kind == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_eof(&self) -> Result<(), DslError> {
        if matches!(self.current().kind, TokenKind::Eof) {
            Ok(())
        } else {
            Err(DslError::TrailingInput { position: self.current().position })
        }
    }

    fn describe_current(&self) -> String {
        match &self.current().kind {
            TokenKind::Ident(s) | TokenKind::FunctionName(s) => s.clone(),
            TokenKind::String(s) => format!("\"{s}\""),
            TokenKind::Number(n) => n.to_string(),
            TokenKind::Bool(b) => b.to_string(),
            TokenKind::Null => "null".to_string(),
            TokenKind::And => "AND".to_string(),
            TokenKind::Or => "OR".to_string(),
            TokenKind::Not => "NOT".to_string(),
            TokenKind::In => "IN".to_string(),
            TokenKind::Gt => ">".to_string(),
            TokenKind::Lt => "<".to_string(),
            TokenKind::Ge => ">=".to_string(),
            TokenKind::Le => "<=".to_string(),
            TokenKind::Eq => "==".to_string(),
            TokenKind::Ne => "!=".to_string(),
            TokenKind::Comma => ",".to_string(),
            TokenKind::LParen => "(".to_string(),
            TokenKind::RParen => ")".to_string(),
            TokenKind::LBracket => "[".to_string(),
            TokenKind::RBracket => "]".to_string(),
            TokenKind::Eof => "end of input".to_string(),
        }
    }

    fn parse_or(&mut self) -> Result<Expr, DslError> {
        let mut parts = vec![self.parse_and()?];
        while self.matches_keyword(&TokenKind::Or) {
            parts.push(self.parse_and()?);
        }
        if parts.len() == 1 { Ok(parts.remove(0)) } else { Ok(Expr::Or(parts)) }
    }

    fn parse_and(&mut self) -> Result<Expr, DslError> {
        let mut parts = vec![self.parse_unary()?];
        while self.matches_keyword(&TokenKind::And) {
            parts.push(self.parse_unary()?);
        }
        if parts.len() == 1 { Ok(parts.remove(0)) } else { Ok(Expr::And(parts)) }
    }

    fn parse_unary(&mut self) -> Result<Expr, DslError> {
        if self.matches_keyword(&TokenKind::Not) {
            return Ok(Expr::Not(Box::new(self.parse_unary()?)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, DslError> {
        let left = self.parse_operand()?;

        let op = match self.current().kind {
            TokenKind::Gt => Some(CompOp::Gt),
            TokenKind::Lt => Some(CompOp::Lt),
            TokenKind::Ge => Some(CompOp::Ge),
            TokenKind::Le => Some(CompOp::Le),
            TokenKind::Eq => Some(CompOp::Eq),
            TokenKind::Ne => Some(CompOp::Ne),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let right = self.parse_operand()?;
            return Ok(Expr::Pred(Predicate::Compare { left, op, right }));
        }

        if self.matches_keyword(&TokenKind::In) {
            let items = self.parse_list_literal()?;
            return Ok(Expr::Pred(Predicate::In { left, items }));
        }

        Ok(Expr::Pred(Predicate::Truthy(left)))
    }

    fn parse_operand(&mut self) -> Result<Operand, DslError> {
        let position = self.current().position;
        match self.current().kind.clone() {
            TokenKind::FunctionName(name) => {
                self.advance();
                self.parse_call(name, position)
            }
            TokenKind::Ident(name) => {
                self.advance();
                Ok(Operand::Field(name.split('.').map(str::to_string).collect()))
            }
            TokenKind::String(_)
            | TokenKind::Number(_)
            | TokenKind::Bool(_)
            | TokenKind::Null
            | TokenKind::LBracket => Ok(Operand::Literal(self.parse_literal()?)),
            TokenKind::LParen => Err(DslError::UnexpectedParenthesis { position }),
            _ => Err(DslError::UnexpectedToken {
                expected: "identifier, literal, or function call",
                found: self.describe_current(),
                position,
            }),
        }
    }

    fn parse_call(&mut self, name: String, position: usize) -> Result<Operand, DslError> {
        if !matches!(self.current().kind, TokenKind::LParen) {
            return Err(DslError::UnexpectedToken {
                expected: "`(` after function name",
                found: self.describe_current(),
                position: self.current().position,
            });
        }
        self.advance();

        let mut args = Vec::new();
        if !matches!(self.current().kind, TokenKind::RParen) {
            loop {
                args.push(self.parse_literal()?);
                if matches!(self.current().kind, TokenKind::Comma) {
                    self.advance();
                    continue;
                }
                break;
            }
        }
        if !matches!(self.current().kind, TokenKind::RParen) {
            return Err(DslError::UnexpectedToken {
                expected: "`)` after function arguments",
                found: self.describe_current(),
                position: self.current().position,
            });
        }
        self.advance();

        validate_builtin(&name, &args, position)?;
        Ok(Operand::Call { name, args })
    }

    fn parse_literal(&mut self) -> Result<Literal, DslError> {
        let position = self.current().position;
        match self.current().kind.clone() {
            TokenKind::String(s) => {
                self.advance();
                Ok(Literal::String(s))
            }
            TokenKind::Number(n) => {
                self.advance();
                serde_json::Number::from_f64(n).map(Literal::Number).ok_or_else(|| {
                    DslError::InvalidNumber { raw: n.to_string(), position }
                })
            }
            TokenKind::Bool(b) => {
                self.advance();
                Ok(Literal::Bool(b))
            }
            TokenKind::Null => {
                self.advance();
                Ok(Literal::Null)
            }
            TokenKind::LBracket => Ok(Literal::Array(self.parse_list_literal()?)),
            _ => Err(DslError::UnexpectedToken {
                expected: "a literal value",
                found: self.describe_current(),
                position,
            }),
        }
    }

    fn parse_list_literal(&mut self) -> Result<Vec<Literal>, DslError> {
        if !matches!(self.current().kind, TokenKind::LBracket) {
            return Err(DslError::UnexpectedToken {
                expected: "`[` to start a list literal",
                found: self.describe_current(),
                position: self.current().position,
            });
        }
        self.advance();

        let mut items = Vec::new();
        if !matches!(self.current().kind, TokenKind::RBracket) {
            loop {
                items.push(self.parse_literal()?);
                if matches!(self.current().kind, TokenKind::Comma) {
                    self.advance();
                    continue;
                }
                break;
            }
        }
        if !matches!(self.current().kind, TokenKind::RBracket) {
            return Err(DslError::UnexpectedToken {
                expected: "`]` to close a list literal",
                found: self.describe_current(),
                position: self.current().position,
            });
        }
        self.advance();
        Ok(items)
    }
}

/// Validates that a function call matches one of the recognised built-ins.
/// `velocity_24h('amount' | 'count')` and `velocity_1h('count')` are the
/// only supported forms; everything else is a load-time error.
fn validate_builtin(name: &str, args: &[Literal], position: usize) -> Result<(), DslError> {
    let arg = args.first().and_then(|a| a.as_str());
    let recognised = match (name, args.len(), arg) {
        ("velocity_24h", 1, Some("amount" | "count")) => true,
        ("velocity_1h", 1, Some("count")) => true,
        _ => false,
    };
    if recognised {
        Ok(())
    } else {
        Err(DslError::UnknownFunction { name: name.to_string(), position })
    }
}
