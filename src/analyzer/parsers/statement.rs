use crate::analyzer::core::{ParseError, ParseResult, Parser};
use crate::ast::{
    ConditionalBranch, Easing, EmitData, EventHandler, Expression, ExpressionKind, MatchCase,
    Pattern, SetTarget, Statement, StatementKind,
};
use crate::tokenizer::{Keyword, Symbol, TokenKind};

impl Parser {
    /// One statement, including its line end (or nested block).
    pub fn parse_statement(&mut self) -> ParseResult<Statement> {
        let location = self.location();
        let keyword = match self.peek_kind() {
            TokenKind::Keyword(kw) => *kw,
            _ => {
                return Err(self
                    .unexpected("statement")
                    .with_hint("statements start with a keyword such as set, emit, if or animate"))
            }
        };

        let kind = match keyword {
            Keyword::Animate => self.parse_animate()?,
            Keyword::SetState => self.parse_set_state()?,
            Keyword::Play => self.parse_play()?,
            Keyword::Stop => self.parse_stop()?,
            Keyword::Emit => self.parse_emit()?,
            Keyword::Set => self.parse_set()?,
            Keyword::When => self.parse_when()?,
            Keyword::Match => self.parse_match()?,
            Keyword::On => StatementKind::On(self.parse_event_handler()?),
            Keyword::If => self.parse_if()?,
            Keyword::For => self.parse_for()?,
            Keyword::While => self.parse_while()?,
            Keyword::Break => {
                self.advance();
                self.expect_line_end()?;
                StatementKind::Break
            }
            Keyword::Continue => {
                self.advance();
                self.expect_line_end()?;
                StatementKind::Continue
            }
            Keyword::Return => {
                self.advance();
                let value = if self.at_line_end() {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                self.expect_line_end()?;
                StatementKind::Return(value)
            }
            _ => return Err(self.unexpected("statement")),
        };
        Ok(Statement::new(kind, location))
    }

    /// `:` followed by either an indented block or one inline statement.
    pub fn parse_body(&mut self) -> ParseResult<Vec<Statement>> {
        self.expect_symbol(Symbol::Colon)?;
        self.parse_body_after_colon()
    }

    pub fn parse_body_after_colon(&mut self) -> ParseResult<Vec<Statement>> {
        if *self.peek_kind() == TokenKind::Newline {
            self.parse_block(Parser::parse_statement)
        } else {
            Ok(vec![self.parse_statement()?])
        }
    }

    /// `on <event> [if|when <guard>]: <body>`
    pub fn parse_event_handler(&mut self) -> ParseResult<EventHandler> {
        let location = self.expect_keyword(Keyword::On)?.location();
        let event = self.expect_event_name()?;
        let guard = self.parse_optional_guard()?;
        let body = self.parse_body()?;
        Ok(EventHandler {
            event,
            guard,
            body,
            location,
        })
    }

    pub fn parse_optional_guard(&mut self) -> ParseResult<Option<Expression>> {
        if self.eat_keyword(Keyword::If) || self.eat_keyword(Keyword::When) {
            Ok(Some(self.parse_expression()?))
        } else {
            Ok(None)
        }
    }

    /// A dotted object name, or `self`.
    fn parse_target(&mut self) -> ParseResult<String> {
        self.expect_dotted_name()
            .map_err(|e| e.with_hint("targets are object names like door or door.panel"))
    }

    fn parse_animate(&mut self) -> ParseResult<StatementKind> {
        self.expect_keyword(Keyword::Animate)?;
        let target = self.parse_target()?;
        self.expect_word("to")?;
        let to = self.parse_expression()?;
        let duration = if self.eat_word("over") {
            Some(self.parse_expression()?)
        } else {
            None
        };
        let easing = if self.eat_word("ease") {
            Some(self.parse_easing()?)
        } else {
            None
        };
        self.expect_line_end()?;
        Ok(StatementKind::Animate {
            target,
            to,
            duration,
            easing,
        })
    }

    pub fn parse_easing(&mut self) -> ParseResult<Easing> {
        let location = self.location();
        let name = self.expect_name()?;
        Easing::parse(&name).ok_or_else(|| {
            ParseError::at(format!("unknown easing '{}'", name), location).with_hint(
                "expected linear, quad-in, quad-out, quad-in-out, cubic-in, cubic-out or cubic-in-out",
            )
        })
    }

    fn parse_set_state(&mut self) -> ParseResult<StatementKind> {
        self.expect_keyword(Keyword::SetState)?;
        let target = self.parse_target()?;
        // A bare name is the state itself; anything else is evaluated.
        let state = if self.is_name_at(0)
            && matches!(
                self.peek_at(1).kind,
                TokenKind::Newline | TokenKind::Dedent | TokenKind::Eof
            ) {
            let token = self.advance();
            Expression::new(ExpressionKind::String(token.text.clone()), token.location())
        } else {
            self.parse_expression()?
        };
        self.expect_line_end()?;
        Ok(StatementKind::SetState { target, state })
    }

    fn parse_play(&mut self) -> ParseResult<StatementKind> {
        self.expect_keyword(Keyword::Play)?;
        let target = self.parse_target()?;
        let animation = self.expect_name()?;
        let looped = self.eat_word("loop");
        self.expect_line_end()?;
        Ok(StatementKind::Play {
            target,
            animation,
            looped,
        })
    }

    fn parse_stop(&mut self) -> ParseResult<StatementKind> {
        self.expect_keyword(Keyword::Stop)?;
        let target = self.parse_target()?;
        let animation = if self.at_line_end() {
            None
        } else {
            Some(self.expect_name()?)
        };
        self.expect_line_end()?;
        Ok(StatementKind::StopAnimation { target, animation })
    }

    fn parse_emit(&mut self) -> ParseResult<StatementKind> {
        self.expect_keyword(Keyword::Emit)?;
        let event = self.expect_event_name()?;
        let data = if self.at_line_end() {
            None
        } else if self.is_name_at(0) && self.peek_at(1).is_symbol(Symbol::Colon) {
            let mut fields = Vec::new();
            loop {
                let key = self.expect_name()?;
                self.expect_symbol(Symbol::Colon)?;
                fields.push((key, self.parse_expression()?));
                if !self.eat_symbol(Symbol::Comma) {
                    break;
                }
            }
            Some(EmitData::Fields(fields))
        } else {
            Some(EmitData::Expression(self.parse_expression()?))
        };
        self.expect_line_end()?;
        Ok(StatementKind::Emit { event, data })
    }

    fn parse_set(&mut self) -> ParseResult<StatementKind> {
        self.expect_keyword(Keyword::Set)?;
        let reactive = self.eat_symbol(Symbol::Dollar);
        let path = if reactive {
            self.parse_reactive_path()?
        } else {
            self.expect_dotted_name()?
                .split('.')
                .map(str::to_string)
                .collect()
        };
        self.expect_symbol(Symbol::Assign)
            .map_err(|e| e.with_hint("assignments look like: set $door.open = true"))?;
        let value = self.parse_expression()?;
        self.expect_line_end()?;
        Ok(StatementKind::Set {
            target: SetTarget { path, reactive },
            value,
        })
    }

    fn parse_when(&mut self) -> ParseResult<StatementKind> {
        self.expect_keyword(Keyword::When)?;
        let condition = self.parse_expression()?;
        let then_body = self.parse_body()?;
        let else_body = if self.eat_keyword(Keyword::Else) {
            self.parse_body()?
        } else {
            Vec::new()
        };
        Ok(StatementKind::When {
            condition,
            then_body,
            else_body,
        })
    }

    fn parse_match(&mut self) -> ParseResult<StatementKind> {
        self.expect_keyword(Keyword::Match)?;
        let subject = self.parse_expression()?;
        self.expect_symbol(Symbol::Colon)?;
        let cases = self.parse_block(Parser::parse_match_case)?;
        Ok(StatementKind::Match { subject, cases })
    }

    fn parse_match_case(&mut self) -> ParseResult<MatchCase> {
        let pattern = if self.at_word("_") {
            self.advance();
            Pattern::Wildcard
        } else {
            Pattern::Expression(self.parse_expression()?)
        };
        let body = if self.eat_symbol(Symbol::Arrow) {
            vec![self.parse_statement()?]
        } else if self.at_symbol(Symbol::Colon) {
            self.parse_body()?
        } else {
            return Err(self
                .unexpected("'->' or ':'")
                .with_hint("match cases look like: \"open\" -> emit opened"));
        };
        Ok(MatchCase { pattern, body })
    }

    fn parse_if(&mut self) -> ParseResult<StatementKind> {
        self.expect_keyword(Keyword::If)?;
        let mut branches = Vec::new();
        let condition = self.parse_expression()?;
        let body = self.parse_body()?;
        branches.push(ConditionalBranch { condition, body });

        while self.eat_keyword(Keyword::Elif) {
            let condition = self.parse_expression()?;
            let body = self.parse_body()?;
            branches.push(ConditionalBranch { condition, body });
        }

        let else_body = if self.eat_keyword(Keyword::Else) {
            Some(self.parse_body()?)
        } else {
            None
        };
        Ok(StatementKind::If {
            branches,
            else_body,
        })
    }

    fn parse_for(&mut self) -> ParseResult<StatementKind> {
        self.expect_keyword(Keyword::For)?;
        let variable = self.expect_identifier()?;
        self.expect_keyword(Keyword::In)?;
        let iterable = self.parse_expression()?;
        let body = self.parse_body()?;
        Ok(StatementKind::For {
            variable,
            iterable,
            body,
        })
    }

    fn parse_while(&mut self) -> ParseResult<StatementKind> {
        self.expect_keyword(Keyword::While)?;
        let condition = self.parse_expression()?;
        let body = self.parse_body()?;
        Ok(StatementKind::While { condition, body })
    }
}
