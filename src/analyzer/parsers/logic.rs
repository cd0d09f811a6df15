//! Definitions the VM executes: functions, rules, scenarios, behaviors,
//! conditions and interactions, plus `config` blocks.

use std::str::FromStr;

use crate::analyzer::core::{ParseError, ParseResult, Parser};
use crate::ast::{
    BehaviorDef, ConditionDef, ConditionKind, ConfigDef, FunctionDef, FunctionParam,
    InteractionDef, RuleDef, ScenarioDef, StateAssignment,
};
use crate::tokenizer::{Keyword, Symbol};

impl Parser {
    pub fn parse_config(&mut self) -> ParseResult<ConfigDef> {
        let location = self.expect_keyword(Keyword::Config)?.location();
        let name = self.expect_name()?;
        let properties = self.parse_property_block()?;
        Ok(ConfigDef {
            name,
            properties,
            location,
        })
    }

    /// `function <name>(<param> [= <default>], ...): <body>`
    pub fn parse_function(&mut self) -> ParseResult<FunctionDef> {
        let location = self.expect_keyword(Keyword::Function)?.location();
        let name = self.expect_name()?;
        let mut params = Vec::new();
        if self.eat_symbol(Symbol::LeftParen) {
            while !self.at_symbol(Symbol::RightParen) {
                let param = self.expect_identifier()?;
                let default = if self.eat_symbol(Symbol::Assign) {
                    Some(self.parse_expression()?)
                } else {
                    None
                };
                params.push(FunctionParam {
                    name: param,
                    default,
                });
                if !self.eat_symbol(Symbol::Comma) {
                    break;
                }
            }
            self.expect_symbol(Symbol::RightParen)?;
        }
        let body = self.parse_body()?;
        Ok(FunctionDef {
            name,
            params,
            body,
            location,
        })
    }

    /// `rule <name> on <event> [if|when <guard>]: <body>`
    pub fn parse_rule(&mut self) -> ParseResult<RuleDef> {
        let location = self.expect_keyword(Keyword::Rule)?.location();
        let name = self.expect_name()?;
        self.expect_keyword(Keyword::On)
            .map_err(|e| e.with_hint("rules look like: rule cool_down on tick: ..."))?;
        let trigger = self.expect_event_name()?;
        let guard = self.parse_optional_guard()?;
        let body = self.parse_body()?;
        Ok(RuleDef {
            name,
            trigger,
            guard,
            body,
            location,
        })
    }

    pub fn parse_scenario(&mut self) -> ParseResult<ScenarioDef> {
        let location = self.expect_keyword(Keyword::Scenario)?.location();
        let name = self.expect_name()?;
        self.expect_symbol(Symbol::Colon)?;

        let mut scenario = ScenarioDef {
            name,
            initial: Vec::new(),
            handlers: Vec::new(),
            properties: Vec::new(),
            location,
        };
        self.parse_block(|p| {
            if p.at_keyword(Keyword::On) {
                scenario.handlers.push(p.parse_event_handler()?);
            } else if p.at_word("initial") && p.at_block_colon_at(1) {
                p.advance();
                p.advance();
                scenario
                    .initial
                    .extend(p.parse_block(Parser::parse_state_assignment)?);
            } else {
                scenario.properties.push(p.parse_property()?);
            }
            Ok(())
        })?;
        Ok(scenario)
    }

    /// `[$]path = <expr>`
    fn parse_state_assignment(&mut self) -> ParseResult<StateAssignment> {
        let path = if self.eat_symbol(Symbol::Dollar) {
            self.parse_reactive_path()?.join(".")
        } else {
            self.expect_dotted_name()?
        };
        self.expect_symbol(Symbol::Assign)?;
        let value = self.parse_expression()?;
        self.expect_line_end()?;
        Ok(StateAssignment { path, value })
    }

    /// `behavior <name> [for <entity>]:` with `on` handlers and properties.
    pub fn parse_behavior(&mut self) -> ParseResult<BehaviorDef> {
        let location = self.expect_keyword(Keyword::Behavior)?.location();
        let name = self.expect_name()?;
        let entity = if self.eat_keyword(Keyword::For) {
            Some(self.expect_name()?)
        } else {
            None
        };
        self.expect_symbol(Symbol::Colon)?;

        let mut handlers = Vec::new();
        let mut properties = Vec::new();
        self.parse_block(|p| {
            if p.at_keyword(Keyword::On) {
                handlers.push(p.parse_event_handler()?);
            } else {
                properties.push(p.parse_property()?);
            }
            Ok(())
        })?;
        Ok(BehaviorDef {
            name,
            entity,
            handlers,
            properties,
            location,
        })
    }

    /// ```text
    /// condition reactor_saved:
    ///   type: victory
    ///   when: $reactor.temp < 100
    ///   message: "Reactor stabilized"
    ///   effect:
    ///     emit fanfare
    /// ```
    pub fn parse_condition(&mut self) -> ParseResult<ConditionDef> {
        let location = self.expect_keyword(Keyword::Condition)?.location();
        let name = self.expect_name()?;
        self.expect_symbol(Symbol::Colon)?;

        let mut kind = ConditionKind::Checkpoint;
        let mut trigger = None;
        let mut message = None;
        let mut effects = Vec::new();
        self.parse_block(|p| {
            let key_location = p.location();
            let key = p.expect_name()?;
            p.expect_symbol(Symbol::Colon)?;
            match key.as_str() {
                "type" => {
                    let kind_location = p.location();
                    let value = p.expect_name()?;
                    kind = ConditionKind::from_str(&value).map_err(|_| {
                        ParseError::at(format!("unknown condition type '{}'", value), kind_location)
                            .with_hint("condition types are victory, defeat and checkpoint")
                    })?;
                    p.expect_line_end()
                }
                "when" | "trigger" => {
                    trigger = Some(p.parse_expression()?);
                    p.expect_line_end()
                }
                "message" => {
                    message = Some(p.parse_expression()?);
                    p.expect_line_end()
                }
                "effect" | "effects" | "then" => {
                    effects.extend(p.parse_body_after_colon()?);
                    Ok(())
                }
                other => Err(ParseError::at(
                    format!("unknown condition field '{}'", other),
                    key_location,
                )
                .with_hint("conditions take type, when, message and effect")),
            }
        })?;

        let trigger = trigger.ok_or_else(|| {
            ParseError::at(format!("condition '{}' has no 'when' trigger", name), location)
        })?;
        Ok(ConditionDef {
            name,
            kind,
            trigger,
            message,
            effects,
            location,
        })
    }

    pub fn parse_interaction(&mut self) -> ParseResult<InteractionDef> {
        let location = self.expect_keyword(Keyword::Interaction)?.location();
        let name = self.expect_name()?;
        self.expect_symbol(Symbol::Colon)?;

        let mut interaction = InteractionDef {
            name,
            target: None,
            prompt: None,
            guard: None,
            effects: Vec::new(),
            properties: Vec::new(),
            location,
        };
        self.parse_block(|p| {
            let is_field = p.is_name_at(0) && p.peek_at(1).is_symbol(Symbol::Colon);
            let key = if is_field { p.peek().text.clone() } else { String::new() };
            match key.as_str() {
                "target" => {
                    p.advance();
                    p.advance();
                    interaction.target = Some(p.expect_dotted_name()?);
                    p.expect_line_end()
                }
                "prompt" => {
                    p.advance();
                    p.advance();
                    interaction.prompt = Some(p.parse_expression()?);
                    p.expect_line_end()
                }
                "when" | "guard" => {
                    p.advance();
                    p.advance();
                    interaction.guard = Some(p.parse_expression()?);
                    p.expect_line_end()
                }
                "effect" | "effects" | "then" => {
                    p.advance();
                    p.advance();
                    interaction.effects.extend(p.parse_body_after_colon()?);
                    Ok(())
                }
                _ => {
                    interaction.properties.push(p.parse_property()?);
                    Ok(())
                }
            }
        })?;
        Ok(interaction)
    }
}
