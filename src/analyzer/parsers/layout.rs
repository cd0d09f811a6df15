use std::str::FromStr;

use crate::analyzer::core::{ParseResult, Parser};
use crate::ast::{EntityDef, LayoutDef, LayoutItem, LayoutItemKind};
use crate::tokenizer::{Keyword, Symbol, TokenKind};

impl Parser {
    /// ```text
    /// layout deck:
    ///   grid: 1
    ///   room bridge size: (10, 3, 8)
    ///   door hatch from: bridge, to: hall
    ///   terminal console:
    ///     room: bridge
    /// ```
    pub fn parse_layout(&mut self) -> ParseResult<LayoutDef> {
        let location = self.expect_keyword(Keyword::Layout)?.location();
        let name = self.expect_name()?;
        self.expect_symbol(Symbol::Colon)?;

        let mut items = Vec::new();
        let mut properties = Vec::new();
        self.parse_block(|p| {
            match p.layout_item_kind() {
                Some(kind) => items.push(p.parse_layout_item(kind)?),
                None => properties.push(p.parse_property()?),
            }
            Ok(())
        })?;

        Ok(LayoutDef {
            name,
            items,
            properties,
            location,
        })
    }

    /// `room bridge ...` is an item; `room: bridge` is a plain property.
    fn layout_item_kind(&self) -> Option<LayoutItemKind> {
        let TokenKind::Identifier(word) = self.peek_kind() else {
            return None;
        };
        let kind = LayoutItemKind::from_str(word).ok()?;
        (self.is_name_at(1)).then_some(kind)
    }

    fn parse_layout_item(&mut self, kind: LayoutItemKind) -> ParseResult<LayoutItem> {
        let location = self.location();
        self.advance();
        let name = self.expect_name()?;
        let properties = self.parse_item_properties()?;
        Ok(LayoutItem {
            kind,
            name,
            properties,
            location,
        })
    }

    pub fn parse_entity(&mut self) -> ParseResult<EntityDef> {
        let location = self.expect_keyword(Keyword::Entity)?.location();
        let name = self.expect_name()?;
        let properties = self.parse_property_block()?;
        Ok(EntityDef {
            name,
            properties,
            location,
        })
    }
}
