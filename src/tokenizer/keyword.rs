//! Reserved words of the stage language.
//!
//! Keywords are recognized after an identifier has been scanned: the word is
//! looked up with [`Keyword::try_from`] and only becomes a keyword token on
//! an exact match. Definition parsers still accept keywords in name position
//! (`on:` and `off:` are common state names), see
//! [`crate::analyzer::Parser::expect_name`].

use strum::IntoEnumIterator;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::EnumString,
    strum::Display,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum Keyword {
    // Definitions
    Asset,
    Layout,
    Entity,
    Machine,
    Config,
    Function,
    Rule,
    Scenario,
    Behavior,
    Condition,
    Game,
    Interaction,
    // Control flow
    If,
    Elif,
    Else,
    For,
    In,
    While,
    Break,
    Continue,
    Return,
    When,
    Match,
    On,
    // Effects
    Emit,
    Set,
    #[strum(serialize = "set-state")]
    SetState,
    Play,
    Stop,
    Animate,
    // Logical operators
    And,
    Or,
    Not,
}

impl Keyword {
    /// True for the keywords that introduce a top-level definition.
    pub fn is_definition(&self) -> bool {
        matches!(
            self,
            Keyword::Asset
                | Keyword::Layout
                | Keyword::Entity
                | Keyword::Machine
                | Keyword::Config
                | Keyword::Function
                | Keyword::Rule
                | Keyword::Scenario
                | Keyword::Behavior
                | Keyword::Condition
                | Keyword::Game
                | Keyword::Interaction
        )
    }

    pub fn definitions() -> impl Iterator<Item = Keyword> {
        Keyword::iter().filter(Keyword::is_definition)
    }
}
