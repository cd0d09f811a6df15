//! Grammar rules, one file per area. Each file adds `parse_*` methods to
//! [`Parser`]; this module holds the top-level dispatch.

pub mod asset;
pub mod expression;
pub mod game;
pub mod layout;
pub mod logic;
pub mod machine;
pub mod property;
pub mod statement;

use crate::analyzer::core::{ParseResult, Parser};
use crate::ast::{Definition, Module};
use crate::tokenizer::{Keyword, TokenKind};

impl Parser {
    pub fn parse_module(&mut self) -> ParseResult<Module> {
        let mut definitions = Vec::new();
        self.skip_newlines();
        while !self.at_eof() {
            definitions.push(self.parse_definition()?);
            self.skip_newlines();
        }
        Ok(Module { definitions })
    }

    pub fn parse_definition(&mut self) -> ParseResult<Definition> {
        let keyword = match self.peek_kind() {
            TokenKind::Keyword(kw) if kw.is_definition() => *kw,
            _ => {
                let expected: Vec<String> = Keyword::definitions().map(|k| k.to_string()).collect();
                return Err(self
                    .unexpected("a definition")
                    .with_hint(format!("top-level blocks start with {}", expected.join(", "))));
            }
        };
        let definition = match keyword {
            Keyword::Asset => Definition::Asset(self.parse_asset()?),
            Keyword::Layout => Definition::Layout(self.parse_layout()?),
            Keyword::Entity => Definition::Entity(self.parse_entity()?),
            Keyword::Machine => Definition::Machine(self.parse_machine()?),
            Keyword::Config => Definition::Config(self.parse_config()?),
            Keyword::Function => Definition::Function(self.parse_function()?),
            Keyword::Rule => Definition::Rule(self.parse_rule()?),
            Keyword::Scenario => Definition::Scenario(self.parse_scenario()?),
            Keyword::Behavior => Definition::Behavior(self.parse_behavior()?),
            Keyword::Condition => Definition::Condition(self.parse_condition()?),
            Keyword::Game => Definition::Game(self.parse_game()?),
            Keyword::Interaction => Definition::Interaction(self.parse_interaction()?),
            _ => return Err(self.unexpected("a definition")),
        };
        tracing::trace!("parsed {} '{}'", definition.kind_name(), definition.name());
        Ok(definition)
    }
}
