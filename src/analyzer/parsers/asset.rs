use crate::analyzer::core::{ParseError, ParseResult, Parser};
use crate::ast::{
    find_property, AnimationDef, AssetDef, AssetState, ExpressionKind, Keyframe, ParamDef,
    Primitive, Property, PropertyValue,
};
use crate::tokenizer::{Keyword, Symbol, TokenKind};

impl Parser {
    /// ```text
    /// asset door:
    ///   params:
    ///     width: number 1..4 = 2
    ///   geometry:
    ///     box panel size: (1, 2, 0.1), color: #888
    ///   states:
    ///     open:
    ///       panel.rotation: (0, 90, 0)
    ///   animations:
    ///     swing:
    ///       duration: 1s
    ///       keyframes:
    ///         0: closed
    ///         1: open ease-out
    /// ```
    pub fn parse_asset(&mut self) -> ParseResult<AssetDef> {
        let location = self.expect_keyword(Keyword::Asset)?.location();
        let name = self.expect_name()?;
        self.expect_symbol(Symbol::Colon)?;

        let mut asset = AssetDef {
            name,
            params: Vec::new(),
            geometry: Vec::new(),
            states: Vec::new(),
            animations: Vec::new(),
            location,
        };

        self.parse_block(|p| {
            let section_location = p.location();
            let section = p.expect_name()?;
            p.expect_symbol(Symbol::Colon)?;
            match section.as_str() {
                "params" => asset.params.extend(p.parse_block(Parser::parse_param)?),
                "geometry" => asset
                    .geometry
                    .extend(p.parse_block(Parser::parse_primitive)?),
                "states" => asset.states.extend(p.parse_block(Parser::parse_asset_state)?),
                "animations" => asset
                    .animations
                    .extend(p.parse_block(Parser::parse_animation)?),
                other => {
                    return Err(ParseError::at(
                        format!("unknown asset section '{}'", other),
                        section_location,
                    )
                    .with_hint("asset sections are params, geometry, states and animations"))
                }
            }
            Ok(())
        })?;

        Ok(asset)
    }

    /// `<name>: <type> [<min>..<max>] [= <default>]`
    fn parse_param(&mut self) -> ParseResult<ParamDef> {
        let name = self.expect_name()?;
        self.expect_symbol(Symbol::Colon)?;
        let type_name = self.expect_name()?;
        let range = if !self.at_symbol(Symbol::Assign) && !self.at_line_end() {
            Some(self.parse_expression()?)
        } else {
            None
        };
        let default = if self.eat_symbol(Symbol::Assign) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.expect_line_end()?;
        Ok(ParamDef {
            name,
            type_name,
            range,
            default,
        })
    }

    /// `<shape> [<name>] [<key>: <value>, ...] [: block]`
    fn parse_primitive(&mut self) -> ParseResult<Primitive> {
        let location = self.location();
        let shape = self.expect_name()?;
        let name = if self.is_name_at(0) && !self.at_inline_property() {
            Some(self.expect_name()?)
        } else {
            None
        };
        let properties = self.parse_item_properties()?;
        Ok(Primitive {
            shape,
            name,
            properties,
            location,
        })
    }

    fn parse_asset_state(&mut self) -> ParseResult<AssetState> {
        let name = self.expect_name()?;
        let properties = self.parse_property_block()?;
        Ok(AssetState { name, properties })
    }

    fn parse_animation(&mut self) -> ParseResult<AnimationDef> {
        let name = self.expect_name()?;
        self.expect_symbol(Symbol::Colon)?;
        let mut properties: Vec<Property> = Vec::new();
        let mut keyframes = Vec::new();
        self.parse_block(|p| {
            if p.at_word("keyframes") && p.peek_at(1).is_symbol(Symbol::Colon) {
                p.advance();
                p.advance();
                keyframes.extend(p.parse_block(Parser::parse_keyframe)?);
            } else {
                properties.push(p.parse_property()?);
            }
            Ok(())
        })?;
        Ok(AnimationDef {
            name,
            properties,
            keyframes,
        })
    }

    /// `<time>: <state> [<easing>]` with time in 0..=1.
    fn parse_keyframe(&mut self) -> ParseResult<Keyframe> {
        let location = self.location();
        let time = match self.peek_kind() {
            TokenKind::Number(n) => *n,
            _ => {
                return Err(self
                    .unexpected("keyframe time")
                    .with_hint("keyframe times are numbers between 0 and 1"))
            }
        };
        if !(0.0..=1.0).contains(&time) {
            return Err(ParseError::at(
                format!("keyframe time {} is outside 0..1", time),
                location,
            ));
        }
        self.advance();
        self.expect_symbol(Symbol::Colon)?;
        let state = self.expect_name()?;
        let easing = if self.at_line_end() {
            None
        } else {
            Some(self.parse_easing()?)
        };
        self.expect_line_end()?;
        Ok(Keyframe {
            time,
            state,
            easing,
        })
    }
}

/// Reads a numeric property, e.g. an animation's `duration`.
pub fn number_property(properties: &[Property], key: &str) -> Option<f64> {
    find_property(properties, key).and_then(|p| match &p.value {
        PropertyValue::Expression(e) => match e.kind {
            ExpressionKind::Number(n) | ExpressionKind::Duration(n) => Some(n),
            _ => None,
        },
        PropertyValue::Block(_) => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::parse;
    use crate::ast::{Definition, Easing};

    const DOOR: &str = r#"
asset door:
  params:
    width: number 1..4 = 2
    tint: color = #888888
  geometry:
    box panel size: (1, 2, 0.1), color: #888
    cylinder hinge:
      radius: 0.05
  states:
    closed:
      panel.rotation: (0, 0, 0)
    open:
      panel.rotation: (0, 90, 0)
  animations:
    swing:
      duration: 1s
      loop: false
      keyframes:
        0: closed
        0.5: open ease-in
        1: closed
"#;

    fn door() -> AssetDef {
        let module = parse(DOOR).unwrap();
        match module.definitions.into_iter().next() {
            Some(Definition::Asset(asset)) => asset,
            other => panic!("expected asset, got {:?}", other),
        }
    }

    #[test]
    fn test_params() {
        let asset = door();
        assert_eq!(asset.params.len(), 2);
        assert!(matches!(
            asset.params[0].range.as_ref().map(|r| &r.kind),
            Some(ExpressionKind::Range { .. })
        ));
        assert!(asset.params[1].range.is_none());
        assert_eq!(
            asset.params[1].default.as_ref().map(|d| &d.kind),
            Some(&ExpressionKind::Color("888888".into()))
        );
    }

    #[test]
    fn test_geometry() {
        let asset = door();
        assert_eq!(asset.geometry.len(), 2);
        assert_eq!(asset.geometry[0].shape, "box");
        assert_eq!(asset.geometry[0].name.as_deref(), Some("panel"));
        assert_eq!(asset.geometry[0].properties.len(), 2);
        assert_eq!(asset.geometry[1].name.as_deref(), Some("hinge"));
        assert_eq!(asset.geometry[1].properties[0].key, "radius");
    }

    #[test]
    fn test_states_and_animations() {
        let asset = door();
        assert_eq!(asset.states.len(), 2);
        assert_eq!(asset.states[1].properties[0].key, "panel.rotation");
        let swing = &asset.animations[0];
        assert_eq!(number_property(&swing.properties, "duration"), Some(1000.0));
        assert_eq!(swing.keyframes.len(), 3);
        assert_eq!(swing.keyframes[1].easing, Some(Easing::QuadIn));
        assert_eq!(swing.keyframes[2].state, "closed");
    }

    #[test]
    fn test_keyframe_out_of_range() {
        let source = "asset a:\n  animations:\n    x:\n      keyframes:\n        2: open\n";
        let err = parse(source).unwrap_err();
        assert!(err.to_string().contains("keyframe time 2 is outside 0..1"));
    }

    #[test]
    fn test_unknown_section() {
        let err = parse("asset a:\n  colors:\n    x: 1\n").unwrap_err();
        assert!(err.to_string().contains("unknown asset section 'colors'"));
    }
}
