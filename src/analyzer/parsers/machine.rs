use crate::analyzer::core::{ParseResult, Parser};
use crate::ast::{MachineDef, MachineState, Transition};
use crate::tokenizer::{Keyword, Symbol};

impl Parser {
    /// ```text
    /// machine hatch_fsm:
    ///   initial: closed
    ///   state closed:
    ///     on open -> opening if $power.on
    ///   state opening:
    ///     enter: play hatch swing
    ///     on done -> open
    /// ```
    pub fn parse_machine(&mut self) -> ParseResult<MachineDef> {
        let location = self.expect_keyword(Keyword::Machine)?.location();
        let name = self.expect_name()?;
        self.expect_symbol(Symbol::Colon)?;

        let mut initial = None;
        let mut states = Vec::new();
        self.parse_block(|p| {
            if p.eat_word("initial") {
                p.expect_symbol(Symbol::Colon)?;
                initial = Some(p.expect_name()?);
                p.expect_line_end()
            } else if p.eat_word("state") {
                states.push(p.parse_machine_state()?);
                Ok(())
            } else {
                Err(p.unexpected("'initial' or 'state'"))
            }
        })?;

        Ok(MachineDef {
            name,
            // The first declared state is the default entry point.
            initial: initial.or_else(|| states.first().map(|s: &MachineState| s.name.clone())),
            states,
            location,
        })
    }

    fn parse_machine_state(&mut self) -> ParseResult<MachineState> {
        let name = self.expect_name()?;
        self.expect_symbol(Symbol::Colon)?;

        let mut state = MachineState {
            name,
            transitions: Vec::new(),
            on_enter: Vec::new(),
            on_exit: Vec::new(),
        };
        self.parse_block(|p| {
            if p.eat_keyword(Keyword::On) {
                let event = p.expect_event_name()?;
                p.expect_symbol(Symbol::Arrow)?;
                let target = p.expect_name()?;
                let guard = p.parse_optional_guard()?;
                p.expect_line_end()?;
                state.transitions.push(Transition {
                    event,
                    target,
                    guard,
                });
            } else if p.eat_word("enter") {
                state.on_enter.extend(p.parse_body()?);
            } else if p.eat_word("exit") {
                state.on_exit.extend(p.parse_body()?);
            } else {
                return Err(p.unexpected("'on', 'enter' or 'exit'"));
            }
            Ok(())
        })?;
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use crate::analyzer::parse;
    use crate::ast::Definition;

    #[test]
    fn test_machine() {
        let source = "machine hatch_fsm:\n  state closed:\n    on open -> opening if $power.on\n  state opening:\n    enter: play hatch swing\n    exit:\n      emit hatch_moved\n    on done -> open\n  state open:\n    on close -> closed\n";
        let module = parse(source).unwrap();
        let Some(Definition::Machine(machine)) = module.definitions.first() else {
            panic!("expected machine");
        };
        assert_eq!(machine.initial.as_deref(), Some("closed"));
        assert_eq!(machine.states.len(), 3);
        assert!(machine.states[0].transitions[0].guard.is_some());
        assert_eq!(machine.states[1].on_enter.len(), 1);
        assert_eq!(machine.states[1].on_exit.len(), 1);
        assert_eq!(machine.states[1].transitions[0].target, "open");
    }

    #[test]
    fn test_machine_explicit_initial() {
        let source = "machine m:\n  initial: b\n  state a:\n    on x -> b\n  state b:\n    on y -> a\n";
        let module = parse(source).unwrap();
        let Some(Definition::Machine(machine)) = module.definitions.first() else {
            panic!("expected machine");
        };
        assert_eq!(machine.initial.as_deref(), Some("b"));
    }

    #[test]
    fn test_machine_rejects_unknown_entry() {
        let err = parse("machine m:\n  colour: red\n").unwrap_err();
        assert!(err
            .to_string()
            .contains("expected 'initial' or 'state' but found 'colour'"));
    }
}
