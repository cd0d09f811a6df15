//! Expression grammar, lowest precedence first:
//!
//! ```text
//! range          := or ( ".." or )?
//! or             := and ( "or" and )*
//! and            := equality ( "and" equality )*
//! equality       := comparison ( ( "==" | "!=" ) comparison )*
//! comparison     := additive ( ( "<" | ">" | "<=" | ">=" ) additive )*
//! additive       := multiplicative ( ( "+" | "-" | "@" ) multiplicative )*
//! multiplicative := unary ( ( "*" | "/" ) unary )*
//! unary          := ( "not" | "-" ) unary | postfix
//! postfix        := primary ( "." name | "(" arguments ")" )*
//! ```

use crate::analyzer::core::{ParseResult, Parser};
use crate::ast::{BinaryOperator, Expression, ExpressionKind, UnaryOperator};
use crate::tokenizer::{Keyword, Symbol, TokenKind};

impl Parser {
    pub fn parse_expression(&mut self) -> ParseResult<Expression> {
        let start = self.parse_or()?;
        if self.at_symbol(Symbol::DotDot) {
            self.advance();
            let end = self.parse_or()?;
            let location = start.location;
            return Ok(Expression::new(
                ExpressionKind::Range {
                    start: Box::new(start),
                    end: Box::new(end),
                },
                location,
            ));
        }
        Ok(start)
    }

    fn parse_or(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_and()?;
        while self.eat_keyword(Keyword::Or) {
            let right = self.parse_and()?;
            left = binary(BinaryOperator::Or, left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_equality()?;
        while self.eat_keyword(Keyword::And) {
            let right = self.parse_equality()?;
            left = binary(BinaryOperator::And, left, right);
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_comparison()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Symbol(Symbol::EqualEqual) => BinaryOperator::Equal,
                TokenKind::Symbol(Symbol::NotEqual) => BinaryOperator::NotEqual,
                _ => break,
            };
            self.advance();
            let right = self.parse_comparison()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Symbol(Symbol::Less) => BinaryOperator::Less,
                TokenKind::Symbol(Symbol::Greater) => BinaryOperator::Greater,
                TokenKind::Symbol(Symbol::LessEqual) => BinaryOperator::LessEqual,
                TokenKind::Symbol(Symbol::GreaterEqual) => BinaryOperator::GreaterEqual,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Symbol(Symbol::Plus) => BinaryOperator::Add,
                TokenKind::Symbol(Symbol::Minus) => BinaryOperator::Subtract,
                TokenKind::Symbol(Symbol::At) => BinaryOperator::At,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Symbol(Symbol::Star) => BinaryOperator::Multiply,
                TokenKind::Symbol(Symbol::Slash) => BinaryOperator::Divide,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> ParseResult<Expression> {
        let location = self.location();
        let op = match self.peek_kind() {
            TokenKind::Keyword(Keyword::Not) => UnaryOperator::Not,
            TokenKind::Symbol(Symbol::Minus) => UnaryOperator::Negate,
            _ => return self.parse_postfix(),
        };
        self.advance();
        let operand = self.parse_unary()?;
        Ok(Expression::new(
            ExpressionKind::Unary {
                op,
                operand: Box::new(operand),
            },
            location,
        ))
    }

    fn parse_postfix(&mut self) -> ParseResult<Expression> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.at_symbol(Symbol::Dot) {
                self.advance();
                let property = self.expect_name()?;
                let location = expr.location;
                expr = Expression::new(
                    ExpressionKind::Member {
                        object: Box::new(expr),
                        property,
                    },
                    location,
                );
            } else if self.at_symbol(Symbol::LeftParen) {
                self.advance();
                let arguments = self.parse_comma_list(Symbol::RightParen, true)?;
                let location = expr.location;
                expr = Expression::new(
                    ExpressionKind::Call {
                        callee: Box::new(expr),
                        arguments,
                    },
                    location,
                );
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> ParseResult<Expression> {
        let location = self.location();
        let kind = match self.peek_kind().clone() {
            TokenKind::Number(n) => ExpressionKind::Number(n),
            TokenKind::Duration(ms) => ExpressionKind::Duration(ms),
            TokenKind::String(s) => ExpressionKind::String(s),
            TokenKind::Boolean(b) => ExpressionKind::Boolean(b),
            TokenKind::Color(hex) => ExpressionKind::Color(hex),
            TokenKind::Identifier(name) => ExpressionKind::Identifier(name),
            TokenKind::Symbol(Symbol::Dollar) => {
                self.advance();
                return Ok(Expression::new(
                    ExpressionKind::Reactive(self.parse_reactive_path()?),
                    location,
                ));
            }
            TokenKind::Symbol(Symbol::LeftParen) => return self.parse_parenthesized(),
            TokenKind::Symbol(Symbol::LeftBracket) => {
                self.advance();
                let items = self.parse_comma_list(Symbol::RightBracket, true)?;
                return Ok(Expression::new(ExpressionKind::List(items), location));
            }
            _ => return Err(self.unexpected("expression")),
        };
        self.advance();
        Ok(Expression::new(kind, location))
    }

    /// Segments after `$`: `name(.name)*`.
    pub fn parse_reactive_path(&mut self) -> ParseResult<Vec<String>> {
        let mut path = vec![self.expect_name()?];
        while self.at_symbol(Symbol::Dot) && self.is_name_at(1) {
            self.advance();
            path.push(self.expect_name()?);
        }
        Ok(path)
    }

    /// `( e )` groups, `( a, b )` and `( a, b, c )` build vectors.
    fn parse_parenthesized(&mut self) -> ParseResult<Expression> {
        let open = self.expect_symbol(Symbol::LeftParen)?;
        let location = open.location();
        let mut items = self.parse_comma_list(Symbol::RightParen, false)?;
        let kind = match items.len() {
            1 => return Ok(items.remove(0)),
            2 => {
                let y = items.remove(1);
                let x = items.remove(0);
                ExpressionKind::Vector2(Box::new(x), Box::new(y))
            }
            3 => {
                let z = items.remove(2);
                let y = items.remove(1);
                let x = items.remove(0);
                ExpressionKind::Vector3(Box::new(x), Box::new(y), Box::new(z))
            }
            0 => {
                return Err(crate::analyzer::ParseError::at("empty parentheses", location)
                    .with_hint("use (x, y) or (x, y, z) for vectors"))
            }
            n => {
                return Err(crate::analyzer::ParseError::at(
                    format!("vectors take 2 or 3 components, found {}", n),
                    location,
                ))
            }
        };
        Ok(Expression::new(kind, location))
    }

    /// Comma separated expressions up to and including `close`. Groups and
    /// vectors reject a trailing comma since the comma count decides their
    /// shape.
    fn parse_comma_list(
        &mut self,
        close: Symbol,
        allow_trailing: bool,
    ) -> ParseResult<Vec<Expression>> {
        let mut items = Vec::new();
        while !self.at_symbol(close) {
            items.push(self.parse_expression()?);
            if !self.eat_symbol(Symbol::Comma) {
                break;
            }
            if !allow_trailing && self.at_symbol(close) {
                return Err(self
                    .error("trailing comma in parentheses")
                    .with_hint("write (x) for a group, (x, y) or (x, y, z) for a vector"));
            }
        }
        self.expect_symbol(close)?;
        Ok(items)
    }
}

fn binary(op: BinaryOperator, left: Expression, right: Expression) -> Expression {
    let location = left.location;
    Expression::new(
        ExpressionKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        location,
    )
}
