use crate::analyzer::core::{ParseResult, Parser};
use crate::ast::{DisplayTemplate, GameDef, Property, PropertyValue};
use crate::tokenizer::{Keyword, Symbol};

impl Parser {
    /// ```text
    /// game station:
    ///   title: "Station 9"
    ///   start: breach
    ///   screen:
    ///     width: 1280
    ///   display oxygen_meter:
    ///     bind: $o2.level
    /// ```
    pub fn parse_game(&mut self) -> ParseResult<GameDef> {
        let location = self.expect_keyword(Keyword::Game)?.location();
        let name = self.expect_name()?;
        self.expect_symbol(Symbol::Colon)?;

        let mut game = GameDef {
            name,
            properties: Vec::new(),
            screen: Vec::new(),
            render: Vec::new(),
            styles: Vec::new(),
            displays: Vec::new(),
            location,
        };
        self.parse_block(|p| {
            if p.at_word("display") && p.is_name_at(1) {
                p.advance();
                let name = p.expect_name()?;
                let properties = p.parse_property_block()?;
                game.displays.push(DisplayTemplate { name, properties });
                return Ok(());
            }

            let Property {
                key,
                value,
                location,
            } = p.parse_property()?;
            match (key.as_str(), value) {
                ("screen", PropertyValue::Block(block)) => game.screen.extend(block),
                ("render", PropertyValue::Block(block)) => game.render.extend(block),
                ("styles", PropertyValue::Block(block)) => game.styles.extend(block),
                (_, value) => game.properties.push(Property {
                    key: key.clone(),
                    value,
                    location,
                }),
            }
            Ok(())
        })?;
        Ok(game)
    }
}

#[cfg(test)]
mod tests {
    use crate::analyzer::parse;
    use crate::ast::Definition;

    #[test]
    fn test_game_sections() {
        let source = "game station:\n  title: \"Station 9\"\n  start: breach\n  screen:\n    width: 1280\n    height: 720\n  render:\n    shadows: true\n  styles:\n    hud:\n      font: \"mono\"\n  display oxygen_meter:\n    bind: $o2.level\n";
        let module = parse(source).unwrap();
        let Some(Definition::Game(game)) = module.definitions.first() else {
            panic!("expected game");
        };
        assert_eq!(game.properties.len(), 2);
        assert_eq!(game.screen.len(), 2);
        assert_eq!(game.render.len(), 1);
        assert_eq!(game.styles[0].key, "hud");
        assert_eq!(game.displays[0].name, "oxygen_meter");
    }
}
