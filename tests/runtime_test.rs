use pretty_assertions::assert_eq;
use serde_json::json;
use stagecraft::{
    analyzer::parse,
    ast::Definition,
    eval::{execute_statements, Callbacks, Environment, EvalContext},
    Event, Value, Vm,
};
use std::{cell::RefCell, rc::Rc};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[ctor::ctor]
fn init_tests() {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

const STATION: &str = include_str!("../data/station.stage");

fn station() -> Vm {
    let mut vm = Vm::default();
    vm.load_source(STATION).unwrap();
    vm
}

fn collect(vm: &Vm, event: &str) -> Rc<RefCell<Vec<Event>>> {
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = events.clone();
    vm.on(event, move |e| sink.borrow_mut().push(e.clone()));
    events
}

fn number(vm: &Vm, path: &str) -> f64 {
    vm.get_state_value(path)
        .and_then(|v| v.as_number())
        .unwrap_or(f64::NAN)
}

#[test]
fn it_runs_the_station_to_victory() {
    let mut vm = station();
    let victories = collect(&vm, "game:victory");
    let defeats = collect(&vm, "game:over");
    let alarms = collect(&vm, "alarm_raised");

    assert!(vm.start_game("station").unwrap());
    assert_eq!(vm.active_scenario(), Some("meltdown"));
    assert_eq!(number(&vm, "relief.arrival"), 100.0);

    for _ in 0..120 {
        vm.tick(16.0).unwrap();
    }

    assert_eq!(alarms.borrow().len(), 1);
    assert_eq!(alarms.borrow()[0].field("temp"), Some(&Value::Number(102.0)));
    assert_eq!(victories.borrow().len(), 1);
    assert_eq!(
        victories.borrow()[0].field("message"),
        Some(&Value::from("Relief ship docked at 290 degrees"))
    );
    assert!(defeats.borrow().is_empty());
    assert_eq!(vm.condition_fired("relief_docked"), Some(true));
    assert_eq!(
        vm.get_state_value("reactor.status"),
        Some(Value::from("hot"))
    );
}

#[test]
fn it_fires_defeat_once_until_reset() {
    let mut vm = station();
    let defeats = collect(&vm, "game:over");
    vm.start_scenario("meltdown").unwrap();
    vm.set_state_value("reactor.temp", 500.0);
    vm.tick(16.0).unwrap();
    vm.tick(16.0).unwrap();
    assert_eq!(defeats.borrow().len(), 1);
    assert_eq!(
        defeats.borrow()[0].field("message"),
        Some(&Value::from("The core breached"))
    );

    vm.reset_conditions();
    vm.tick(16.0).unwrap();
    assert_eq!(defeats.borrow().len(), 2);
}

#[test]
fn it_vents_through_an_interaction() {
    let mut vm = station();
    let animations = Rc::new(RefCell::new(Vec::new()));
    let sink = animations.clone();
    vm.set_callbacks(Callbacks::new().on_animate(move |target, to, duration, easing| {
        sink.borrow_mut().push(format!(
            "{} {} {:?} {:?}",
            target,
            to,
            duration,
            easing.map(|e| e.to_string())
        ))
    }));
    vm.start_scenario("meltdown").unwrap();
    vm.set_state_value("reactor.temp", 120.0);

    assert!(vm.interact("vent_reactor").unwrap());
    assert_eq!(number(&vm, "reactor.temp"), 70.0);
    assert_eq!(
        *animations.borrow(),
        vec!["reactor_room.vents (0, 1, 0) Some(500.0) Some(\"quad-out\")"]
    );

    vm.set_state_value("power.on", false);
    assert!(!vm.interact("vent_reactor").unwrap());
}

#[test]
fn it_scopes_behaviors_to_their_entity() {
    let mut vm = station();
    let states = Rc::new(RefCell::new(Vec::new()));
    let sink = states.clone();
    vm.set_callbacks(
        Callbacks::new().on_set_state(move |target, state| {
            sink.borrow_mut().push(format!("{}={}", target, state))
        }),
    );
    vm.set_state_value("guard.hp", 10.0);

    let hit = |entity: &str, amount: f64| {
        Value::from(json!({ "entity": entity, "amount": amount }))
    };
    vm.emit("hit", hit("guard", 4.0)).unwrap();
    vm.emit("hit", hit("drone", 4.0)).unwrap();
    vm.emit("hit", hit("guard", 8.0)).unwrap();

    assert_eq!(number(&vm, "guard.hp"), -2.0);
    assert_eq!(*states.borrow(), vec!["guard=hurt", "guard=down"]);
    assert_eq!(vm.get_state_value("guard.state"), Some(Value::from("down")));
    assert_eq!(vm.entity_context(), None);
}

#[test]
fn it_runs_rules_before_behaviors() {
    let mut vm = Vm::default();
    vm.load_source(
        "rule r on damage:\n  set $order = $order + \"r\"\nbehavior b:\n  on damage:\n    set $order = $order + \"b\"\n",
    )
    .unwrap();
    vm.set_state_value("order", "");
    vm.emit("damage", Value::Null).unwrap();
    assert_eq!(vm.get_state_value("order"), Some(Value::from("rb")));
}

#[test]
fn it_round_trips_literal_configs() {
    let mut vm = Vm::default();
    vm.load_source(
        "config atmosphere:\n  o2:\n    threshold: 19\n    label: \"oxygen\"\n  pressure: 1.5\n  sealed: true\n",
    )
    .unwrap();
    assert_eq!(
        vm.get_config_value("atmosphere.o2.threshold"),
        Some(Value::Number(19.0))
    );
    assert_eq!(
        vm.get_config_value("atmosphere.o2.label"),
        Some(Value::from("oxygen"))
    );
    assert_eq!(
        vm.get_config_value("atmosphere.pressure"),
        Some(Value::Number(1.5))
    );
    assert_eq!(
        vm.get_config_value("atmosphere.sealed"),
        Some(Value::Boolean(true))
    );
}

#[test]
fn it_reads_derived_configs() {
    let vm = station();
    assert_eq!(vm.get_config_value("relief.eta"), Some(Value::Number(100.0)));
    assert_eq!(vm.evaluate("status(150)").unwrap(), Value::from("hot"));
    assert_eq!(vm.evaluate("heat_step(10)").unwrap(), Value::Number(12.0));
}

fn main_body(source: &str) -> Vec<stagecraft::ast::Statement> {
    let module = parse(source).unwrap();
    match module.definitions.into_iter().next() {
        Some(Definition::Function(f)) => f.body,
        other => panic!("expected a function, got {:?}", other),
    }
}

#[test]
fn it_stops_at_return() {
    let body = main_body("function main():\n  emit a\n  return 10\n  emit b\n");
    let emitted = Rc::new(RefCell::new(Vec::new()));
    let sink = emitted.clone();
    let mut callbacks = Callbacks::new().on_emit(move |event, _| sink.borrow_mut().push(event.to_string()));

    let ctx = EvalContext::new(Environment::default());
    let result = execute_statements(&body, &ctx, &mut callbacks).unwrap();
    assert_eq!(result.return_value(), Some(&Value::Number(10.0)));
    assert_eq!(*emitted.borrow(), vec!["a"]);
}

#[test]
fn it_breaks_out_of_for() {
    let body = main_body(
        "function main():\n  for item in [1, 2, 3, 4, 5]:\n    emit step\n    if item == 3: break\n",
    );
    let count = Rc::new(RefCell::new(0));
    let sink = count.clone();
    let mut callbacks = Callbacks::new().on_emit(move |_, _| *sink.borrow_mut() += 1);

    let ctx = EvalContext::new(Environment::default());
    execute_statements(&body, &ctx, &mut callbacks).unwrap();
    assert_eq!(*count.borrow(), 3);
}

#[test]
fn it_reports_state_as_json() {
    let mut vm = Vm::default();
    vm.merge_state(Value::from(json!({ "reactor": { "temp": 90 }, "crew": ["ana", "bo"] })));
    vm.set_state_value("reactor.online", true);
    assert_eq!(
        vm.state_json(),
        json!({ "crew": ["ana", "bo"], "reactor": { "online": true, "temp": 90 } })
    );
}
