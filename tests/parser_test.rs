use pretty_assertions::assert_eq;
use stagecraft::{
    ast::{ConditionKind, Definition, StatementKind},
    formatter::ErrorReport,
    parse,
    tokenizer::{tokenize, TokenKind},
};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[ctor::ctor]
fn init_tests() {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

const STATION: &str = include_str!("../data/station.stage");

#[test]
fn it_parses_every_definition_kind() {
    let module = parse(STATION).unwrap();
    let summary: Vec<(&str, usize)> = module.summary().into_iter().collect();
    assert_eq!(
        summary,
        vec![
            ("asset", 1),
            ("behavior", 1),
            ("condition", 2),
            ("config", 2),
            ("entity", 1),
            ("function", 2),
            ("game", 1),
            ("interaction", 1),
            ("layout", 1),
            ("machine", 1),
            ("rule", 2),
            ("scenario", 1),
        ]
    );
}

#[test]
fn it_keeps_source_order_and_locations() {
    let module = parse(STATION).unwrap();
    let names: Vec<&str> = module.definitions.iter().map(|d| d.name()).collect();
    assert_eq!(names[0], "hatch_door");
    assert_eq!(names[names.len() - 1], "station");

    let Some(Definition::Asset(asset)) = module.definitions.first() else {
        panic!("expected the asset first");
    };
    assert_eq!(asset.location.line, 3);
    assert_eq!(asset.location.column, 1);
}

#[test]
fn it_parses_conditions_and_behaviors() {
    let module = parse(STATION).unwrap();
    let kinds: Vec<ConditionKind> = module
        .definitions
        .iter()
        .filter_map(|d| match d {
            Definition::Condition(c) => Some(c.kind),
            _ => None,
        })
        .collect();
    assert_eq!(kinds, vec![ConditionKind::Victory, ConditionKind::Defeat]);

    let behavior = module
        .definitions
        .iter()
        .find_map(|d| match d {
            Definition::Behavior(b) => Some(b),
            _ => None,
        })
        .unwrap();
    assert_eq!(behavior.entity.as_deref(), Some("guard"));
    let handler = &behavior.handlers[0];
    assert_eq!(handler.event, "hit");
    assert!(matches!(handler.body[1].kind, StatementKind::When { .. }));
}

#[test]
fn it_tokenizes_balanced_blocks() {
    let tokens = tokenize(STATION).unwrap();
    let indents = tokens.iter().filter(|t| t.kind == TokenKind::Indent).count();
    let dedents = tokens.iter().filter(|t| t.kind == TokenKind::Dedent).count();
    assert_eq!(indents, dedents);
    assert_eq!(tokens.last().map(|t| &t.kind), Some(&TokenKind::Eof));
}

#[test]
fn it_reports_parse_errors_with_context() {
    let source = "rule vent on tick:\n  set $o2 = 1\nrule leak tick:\n  emit x\n";
    let err = parse(source).unwrap_err();
    let rendered = ErrorReport::new("station.stage", source).render(&err);

    assert!(rendered.starts_with("error: "));
    assert!(rendered.contains("  --> station.stage:3:"));
    assert!(rendered.contains("  2 |   set $o2 = 1\n"));
    assert!(rendered.contains("> 3 | rule leak tick:\n"));
    assert!(rendered.contains("  4 |   emit x\n"));
    assert!(rendered.contains("\nhint: rules look like: rule cool_down on tick: ...\n"));
}

#[test]
fn it_rejects_bad_indentation() {
    let err = parse("rule a on tick:\n    emit x\n  emit y\n").unwrap_err();
    assert!(err.to_string().contains("line 3"));
}

#[test]
fn it_reports_lexer_errors() {
    let err = parse("rule a on tick:\n  emit \"open\n").unwrap_err();
    assert!(matches!(err, stagecraft::Error::Lexer(_)));
}
