use crate::analyzer::core::{ParseResult, Parser};
use crate::ast::{Property, PropertyValue};
use crate::tokenizer::{Symbol, TokenKind};

impl Parser {
    /// `key: expr` or `key:` with a nested property block. Keys may be
    /// dotted (`panel.rotation: (0, 90, 0)`).
    pub fn parse_property(&mut self) -> ParseResult<Property> {
        let location = self.location();
        let key = self.expect_dotted_name()?;
        self.expect_symbol(Symbol::Colon)?;
        let value = self.parse_property_value()?;
        Ok(Property {
            key,
            value,
            location,
        })
    }

    /// Everything after a property's `:`.
    pub fn parse_property_value(&mut self) -> ParseResult<PropertyValue> {
        if self.at_line_end() {
            Ok(PropertyValue::Block(self.parse_block(Parser::parse_property)?))
        } else {
            let value = self.parse_expression()?;
            self.expect_line_end()?;
            Ok(PropertyValue::Expression(value))
        }
    }

    /// `: NEWLINE INDENT property* DEDENT`
    pub fn parse_property_block(&mut self) -> ParseResult<Vec<Property>> {
        self.expect_symbol(Symbol::Colon)?;
        self.parse_block(Parser::parse_property)
    }

    /// True at `name:` followed by something other than a line end.
    pub fn at_inline_property(&self) -> bool {
        self.is_name_at(0)
            && self.peek_at(1).is_symbol(Symbol::Colon)
            && !self.at_block_colon_at(1)
    }

    /// True when the token at `offset` is a `:` that opens a block.
    pub fn at_block_colon_at(&self, offset: usize) -> bool {
        self.peek_at(offset).is_symbol(Symbol::Colon)
            && self.peek_at(offset + 1).kind == TokenKind::Newline
    }

    /// The tail of an item line such as `box panel size: (1, 2), color: #888`:
    /// comma separated inline properties, then an optional nested block.
    /// Consumes the line end.
    pub fn parse_item_properties(&mut self) -> ParseResult<Vec<Property>> {
        let mut properties = Vec::new();
        while self.at_inline_property() {
            let location = self.location();
            let key = self.expect_name()?;
            self.expect_symbol(Symbol::Colon)?;
            let value = self.parse_expression()?;
            properties.push(Property {
                key,
                value: PropertyValue::Expression(value),
                location,
            });
            if !self.eat_symbol(Symbol::Comma) {
                break;
            }
        }
        if self.at_block_colon() {
            self.advance();
            properties.extend(self.parse_block(Parser::parse_property)?);
        } else {
            self.expect_line_end()?;
        }
        Ok(properties)
    }
}

#[cfg(test)]
mod tests {
    use crate::analyzer::Parser;
    use crate::ast::{ExpressionKind, PropertyValue};
    use crate::tokenizer::tokenize;

    #[test]
    fn test_nested_properties() {
        let mut parser = Parser::new(tokenize("o2:\n  threshold: 19\n  alarm: true\n").unwrap());
        let property = parser.parse_property().unwrap();
        assert_eq!(property.key, "o2");
        let PropertyValue::Block(children) = property.value else {
            panic!("expected block");
        };
        assert_eq!(children.len(), 2);
        let PropertyValue::Expression(value) = &children[0].value else {
            panic!("expected expression");
        };
        assert_eq!(value.kind, ExpressionKind::Number(19.0));
    }

    #[test]
    fn test_item_properties_inline_and_block() {
        let source = "size: (1, 2, 1), color: #888:\n  metal: 0.5\n";
        let mut parser = Parser::new(tokenize(source).unwrap());
        let properties = parser.parse_item_properties().unwrap();
        let keys: Vec<_> = properties.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, vec!["size", "color", "metal"]);
        assert!(parser.at_eof());
    }

    #[test]
    fn test_dotted_key() {
        let mut parser = Parser::new(tokenize("panel.rotation: (0, 90, 0)\n").unwrap());
        assert_eq!(parser.parse_property().unwrap().key, "panel.rotation");
    }
}
