//! # Runtime
//!
//! [`Vm`] owns the live state of a stage: the state tree, the config and
//! function registries, and every rule, scenario, behavior, condition, game
//! and interaction loaded from source. Hosts drive it with [`Vm::tick`] and
//! [`Vm::emit`]; both run to completion before returning.
//!
//! ## Ticks
//!
//! A tick (skipped while paused) bumps the tick counter, publishes `delta`
//! and `tickCount` into state, runs `tick` rules, then the active
//! scenario's `tick` handlers, then checks conditions. A condition fires at
//! most once until [`Vm::reset_conditions`] or [`Vm::reset_state`].
//!
//! ## Entity Context
//!
//! When an emitted payload carries an `entity` field, that entity becomes
//! the current entity while rules and behaviors run, then the previous one
//! is restored. Bodies see it as `self` and targets named `self` resolve to
//! it.

mod registry;

pub use registry::{ConditionEntry, ConstructRegistry};

use std::rc::Rc;

use tracing::{debug, info, instrument};

use crate::analyzer::{parse, parse_expression};
use crate::ast::{
    find_property, ConditionKind, DisplayTemplate, Easing, EventHandler, Expression, GameDef,
    InteractionDef, Module, PropertyValue, Statement,
};
use crate::config::VmConfig;
use crate::eval::{
    evaluate, execute_statements, invoke, load_configs_from_module, load_functions_from_module,
    Callbacks, Environment, EvalContext, ExecResult, ExecutionCallbacks, ExecutionError, Limits,
    Value,
};
use crate::event::{Event, ListenerId, ListenerRegistry, Subscription};
use crate::Result;

pub struct Vm {
    config: VmConfig,
    env: Environment,
    constructs: ConstructRegistry,
    listeners: ListenerRegistry,
    callbacks: Callbacks,
    active_scenario: Option<String>,
    tick_count: u64,
    paused: bool,
    emit_depth: usize,
}

impl Default for Vm {
    fn default() -> Self {
        Self::new(VmConfig::default())
    }
}

impl std::fmt::Debug for Vm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vm")
            .field("config", &self.config)
            .field("active_scenario", &self.active_scenario)
            .field("tick_count", &self.tick_count)
            .field("paused", &self.paused)
            .field("listeners", &self.listeners)
            .finish()
    }
}

impl Vm {
    pub fn new(config: VmConfig) -> Self {
        Self {
            env: Environment::new(Limits::from(&config)),
            config,
            constructs: ConstructRegistry::default(),
            listeners: ListenerRegistry::new(),
            callbacks: Callbacks::default(),
            active_scenario: None,
            tick_count: 0,
            paused: false,
            emit_depth: 0,
        }
    }

    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    /// Handles to the state tree and registries, shared with the VM.
    pub fn environment(&self) -> &Environment {
        &self.env
    }

    // --- loading -----------------------------------------------------------

    /// Parses `source` and loads it. Nothing is loaded if parsing fails.
    #[instrument(level = "debug", skip(self, source))]
    pub fn load_source(&mut self, source: &str) -> Result<Module> {
        let module = parse(source)?;
        self.load_module(&module)?;
        Ok(module)
    }

    /// Loads functions, then configs, then registers runtime constructs.
    pub fn load_module(&mut self, module: &Module) -> Result<()> {
        load_functions_from_module(&self.env, module);
        load_configs_from_module(&self.env, module)?;
        self.constructs.register_module(module);
        info!("loaded module with {} definitions", module.definitions.len());
        Ok(())
    }

    /// Drops every registration, config and function, and resets state.
    /// Host listeners and callbacks are kept.
    pub fn clear(&mut self) {
        self.constructs.clear();
        self.env.config.borrow_mut().clear();
        self.env.functions.borrow_mut().clear();
        self.reset_state();
    }

    // --- state -------------------------------------------------------------

    pub fn get_state_value(&self, path: &str) -> Option<Value> {
        self.env.state.borrow().get(path)
    }

    pub fn set_state_value(&mut self, path: &str, value: impl Into<Value>) {
        self.env.state.borrow_mut().set(path, value.into());
    }

    pub fn merge_state(&mut self, value: Value) {
        self.env.state.borrow_mut().merge(value);
    }

    pub fn state_json(&self) -> serde_json::Value {
        self.env.state.borrow().to_json()
    }

    /// Clears state, condition flags, the active scenario and the tick
    /// counter. Registrations are kept.
    pub fn reset_state(&mut self) {
        self.env.state.borrow_mut().clear();
        self.constructs.reset_conditions();
        self.active_scenario = None;
        self.tick_count = 0;
    }

    pub fn reset_conditions(&mut self) {
        self.constructs.reset_conditions();
    }

    pub fn get_config_value(&self, path: &str) -> Option<Value> {
        self.env.config.borrow().get_config_value(path)
    }

    // --- lookups -----------------------------------------------------------

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn active_scenario(&self) -> Option<&str> {
        self.active_scenario.as_deref()
    }

    pub fn display_template(&self, name: &str) -> Option<Rc<DisplayTemplate>> {
        self.constructs.display_template(name)
    }

    pub fn game(&self, name: &str) -> Option<Rc<GameDef>> {
        self.constructs.game(name)
    }

    pub fn interaction(&self, name: &str) -> Option<Rc<InteractionDef>> {
        self.constructs.interaction(name)
    }

    pub fn condition_fired(&self, name: &str) -> Option<bool> {
        self.constructs.condition_fired(name)
    }

    /// The current entity, if an entity-scoped dispatch is running.
    pub fn entity_context(&self) -> Option<String> {
        match self.get_state_value(&self.config.entity_context_key) {
            Some(Value::String(entity)) => Some(entity),
            _ => None,
        }
    }

    // --- run control -------------------------------------------------------

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Host hooks for effects. They run after the VM has applied its own
    /// side of the effect.
    pub fn set_callbacks(&mut self, callbacks: Callbacks) {
        self.callbacks = callbacks;
    }

    // --- listeners ---------------------------------------------------------

    /// Listens for `name`, or every event with `"*"`.
    pub fn on(&self, name: &str, handler: impl FnMut(&Event) + 'static) -> Subscription {
        self.listeners.subscribe(name, handler)
    }

    pub fn off(&self, name: &str, id: ListenerId) -> bool {
        self.listeners.unsubscribe(name, id)
    }

    // --- execution ---------------------------------------------------------

    /// Evaluates a standalone expression against the current state.
    pub fn evaluate(&self, source: &str) -> Result<Value> {
        let expression = parse_expression(source)?;
        let ctx = EvalContext::new(self.env.clone());
        Ok(evaluate(&expression, &ctx)?)
    }

    /// Calls a user function with the VM as host.
    pub fn call_function(&mut self, name: &str, args: Vec<Value>) -> Result<Value> {
        let def = self.env.functions.borrow().get(name).ok_or_else(|| {
            ExecutionError::UnknownFunction {
                name: name.to_string(),
                location: None,
            }
        })?;
        let ctx = self.scope(&Value::Null);
        let mut effects = VmEffects { vm: self };
        Ok(invoke(&def, args, None, &ctx, &mut effects)?)
    }

    #[instrument(level = "debug", skip(self))]
    pub fn tick(&mut self, delta: f64) -> Result<()> {
        if self.paused {
            return Ok(());
        }
        self.tick_count += 1;
        if self.config.publish_tick_state {
            let mut state = self.env.state.borrow_mut();
            state.set("delta", Value::Number(delta));
            state.set("tickCount", Value::Number(self.tick_count as f64));
        }
        let data = Value::map([
            ("delta".to_string(), Value::Number(delta)),
            ("tickCount".to_string(), Value::Number(self.tick_count as f64)),
        ]);

        self.run_rules("tick", &data)?;
        self.run_scenario_handlers("tick", &data)?;
        self.check_conditions()?;
        Ok(())
    }

    /// Dispatches `name` to rules, behaviors, the active scenario and then
    /// listeners, in that order.
    #[instrument(level = "debug", skip(self, data))]
    pub fn emit(&mut self, name: &str, data: Value) -> Result<()> {
        Ok(self.dispatch(name, data)?)
    }

    /// Starts `name`: applies its initial assignments and emits
    /// `scenario:start`. Returns false for an unknown scenario.
    #[instrument(level = "debug", skip(self))]
    pub fn start_scenario(&mut self, name: &str) -> Result<bool> {
        let Some(scenario) = self.constructs.scenario(name) else {
            debug!("unknown scenario {}", name);
            return Ok(false);
        };
        self.active_scenario = Some(scenario.name.clone());
        for assignment in &scenario.initial {
            let value = {
                let ctx = EvalContext::new(self.env.clone());
                evaluate(&assignment.value, &ctx)?
            };
            self.env.state.borrow_mut().set(&assignment.path, value);
        }
        info!("scenario {} started", name);
        self.dispatch(
            "scenario:start",
            Value::map([("scenario".to_string(), Value::from(name))]),
        )?;
        Ok(true)
    }

    /// Starts the scenario named by the game's `start` property, if any,
    /// and emits `game:start`. Returns false for an unknown game.
    pub fn start_game(&mut self, name: &str) -> Result<bool> {
        let Some(game) = self.constructs.game(name) else {
            return Ok(false);
        };
        let start = match find_property(&game.properties, "start").map(|p| &p.value) {
            Some(PropertyValue::Expression(expr)) => scenario_name(expr, &self.env)?,
            _ => None,
        };
        self.dispatch(
            "game:start",
            Value::map([("game".to_string(), Value::from(name))]),
        )?;
        if let Some(scenario) = start {
            return self.start_scenario(&scenario);
        }
        Ok(true)
    }

    /// Runs an interaction's effects with its target as the current entity.
    /// Returns false if it is unknown or its guard does not hold.
    pub fn interact(&mut self, name: &str) -> Result<bool> {
        let Some(interaction) = self.constructs.interaction(name) else {
            return Ok(false);
        };
        let data = Value::map([
            ("interaction".to_string(), Value::from(name)),
            (
                "target".to_string(),
                interaction
                    .target
                    .clone()
                    .map(Value::String)
                    .unwrap_or_default(),
            ),
        ]);

        let previous = self.enter_entity(interaction.target.as_deref());
        let result = self.run_interaction(&interaction, &data);
        self.restore_entity(previous);
        if !result? {
            return Ok(false);
        }

        self.dispatch(&format!("interaction:{}", name), data)?;
        Ok(true)
    }

    fn run_interaction(&mut self, interaction: &InteractionDef, data: &Value) -> ExecResult<bool> {
        if !self.guard_holds(interaction.guard.as_ref(), data)? {
            return Ok(false);
        }
        self.run_body(&interaction.effects, data)?;
        Ok(true)
    }

    /// Runs one dispatch, counting how deeply effects have re-emitted.
    fn dispatch(&mut self, name: &str, data: Value) -> ExecResult<()> {
        let limit = self.config.max_emit_depth;
        if self.emit_depth >= limit {
            return Err(ExecutionError::EmitDepthExceeded {
                event: name.to_string(),
                limit,
            });
        }
        self.emit_depth += 1;
        let result = self.dispatch_event(name, data);
        self.emit_depth -= 1;
        result
    }

    fn dispatch_event(&mut self, name: &str, data: Value) -> ExecResult<()> {
        debug!("dispatching {} at depth {}", name, self.emit_depth);
        let entity = match &data {
            Value::Map(map) => match map.get("entity") {
                Some(Value::String(entity)) => Some(entity.clone()),
                _ => None,
            },
            _ => None,
        };

        let previous = self.enter_entity(entity.as_deref());
        let result = self
            .run_rules(name, &data)
            .and_then(|_| self.run_behaviors(name, &data));
        self.restore_entity(previous);
        result?;

        self.run_scenario_handlers(name, &data)?;
        self.listeners.dispatch(&Event::new(name, data));
        Ok(())
    }

    fn run_rules(&mut self, event: &str, data: &Value) -> ExecResult<()> {
        for rule in self.constructs.rules_for(event) {
            if self.guard_holds(rule.guard.as_ref(), data)? {
                debug!("rule {} fired by {}", rule.name, event);
                self.run_body(&rule.body, data)?;
            }
        }
        Ok(())
    }

    fn run_behaviors(&mut self, event: &str, data: &Value) -> ExecResult<()> {
        for behavior in self.constructs.behaviors() {
            if let Some(entity) = &behavior.entity {
                if self.entity_context().as_ref() != Some(entity) {
                    continue;
                }
            }
            self.run_handlers(&behavior.handlers, event, data)?;
        }
        Ok(())
    }

    fn run_scenario_handlers(&mut self, event: &str, data: &Value) -> ExecResult<()> {
        let Some(scenario) = self
            .active_scenario
            .as_deref()
            .and_then(|name| self.constructs.scenario(name))
        else {
            return Ok(());
        };
        self.run_handlers(&scenario.handlers, event, data)
    }

    fn run_handlers(&mut self, handlers: &[EventHandler], event: &str, data: &Value) -> ExecResult<()> {
        for handler in handlers.iter().filter(|h| h.event == event) {
            if self.guard_holds(handler.guard.as_ref(), data)? {
                self.run_body(&handler.body, data)?;
            }
        }
        Ok(())
    }

    fn check_conditions(&mut self) -> ExecResult<()> {
        for (index, condition) in self.constructs.pending_conditions() {
            let triggered = {
                let ctx = self.scope(&Value::Null);
                evaluate(&condition.trigger, &ctx)?.is_truthy()
            };
            // Marking before running effects keeps a nested tick from firing
            // the same condition again.
            if !triggered || !self.constructs.mark_fired(index) {
                continue;
            }
            info!("condition {} fired ({})", condition.name, condition.kind);

            let message = match &condition.message {
                Some(expr) => evaluate(expr, &self.scope(&Value::Null))?,
                None => Value::Null,
            };
            let data = Value::map([
                ("condition".to_string(), Value::from(condition.name.as_str())),
                ("type".to_string(), Value::from(condition.kind.to_string())),
                ("message".to_string(), message),
            ]);

            self.dispatch(&format!("condition:{}", condition.kind), data.clone())?;
            match condition.kind {
                ConditionKind::Victory => self.dispatch("game:victory", data.clone())?,
                ConditionKind::Defeat => self.dispatch("game:over", data.clone())?,
                ConditionKind::Checkpoint => {}
            }
            self.run_body(&condition.effects, &data)?;
        }
        Ok(())
    }

    fn guard_holds(&self, guard: Option<&Expression>, data: &Value) -> ExecResult<bool> {
        match guard {
            Some(guard) => Ok(evaluate(guard, &self.scope(data))?.is_truthy()),
            None => Ok(true),
        }
    }

    fn run_body(&mut self, body: &[Statement], data: &Value) -> ExecResult<()> {
        let ctx = self.scope(data);
        let mut effects = VmEffects { vm: self };
        execute_statements(body, &ctx, &mut effects)?;
        Ok(())
    }

    /// Root scope for handler bodies: `event` is the payload and `self` the
    /// current entity.
    fn scope(&self, data: &Value) -> EvalContext<'static> {
        let mut ctx = EvalContext::new(self.env.clone()).with_var("event", data.clone());
        if let Some(entity) = self.entity_context() {
            ctx.set_var("self", Value::String(entity));
        }
        ctx
    }

    /// Installs `entity` as the current entity and returns the previous
    /// value, for [`Vm::restore_entity`]. `None` leaves the context alone.
    fn enter_entity(&mut self, entity: Option<&str>) -> Option<Option<Value>> {
        let entity = entity?;
        let key = self.config.entity_context_key.clone();
        let mut state = self.env.state.borrow_mut();
        let previous = state.get(&key);
        state.set(&key, Value::from(entity));
        Some(previous)
    }

    fn restore_entity(&mut self, previous: Option<Option<Value>>) {
        let Some(previous) = previous else {
            return;
        };
        let key = &self.config.entity_context_key;
        let mut state = self.env.state.borrow_mut();
        match previous {
            Some(value) => state.set(key, value),
            None => {
                state.remove(key);
            }
        }
    }

    /// `self` and `self.part` resolve against the current entity.
    fn resolve_target(&self, target: &str) -> String {
        let rest = match target.strip_prefix("self") {
            Some(rest) if rest.is_empty() || rest.starts_with('.') => rest,
            _ => return target.to_string(),
        };
        match self.entity_context() {
            Some(entity) => format!("{}{}", entity, rest),
            None => target.to_string(),
        }
    }
}

/// `start: breach` names the scenario directly; any other expression must
/// evaluate to a string.
fn scenario_name(expr: &Expression, env: &Environment) -> ExecResult<Option<String>> {
    if let Some(path) = expr.as_path() {
        return Ok(Some(path));
    }
    match evaluate(expr, &EvalContext::new(env.clone()))? {
        Value::String(name) => Ok(Some(name)),
        _ => Ok(None),
    }
}

/// Applies effects to the VM, then forwards them to the host callbacks.
struct VmEffects<'a> {
    vm: &'a mut Vm,
}

impl ExecutionCallbacks for VmEffects<'_> {
    fn on_animate(
        &mut self,
        target: &str,
        to: &Value,
        duration: Option<f64>,
        easing: Option<Easing>,
    ) -> ExecResult<()> {
        let target = self.vm.resolve_target(target);
        ExecutionCallbacks::on_animate(&mut self.vm.callbacks, &target, to, duration, easing)
    }

    fn on_set_state(&mut self, target: &str, state: &Value) -> ExecResult<()> {
        let target = self.vm.resolve_target(target);
        let path = format!("{}.state", target);
        self.vm.env.state.borrow_mut().set(&path, state.clone());
        ExecutionCallbacks::on_set_state(&mut self.vm.callbacks, &target, state)
    }

    fn on_play_animation(&mut self, target: &str, animation: &str, looped: bool) -> ExecResult<()> {
        let target = self.vm.resolve_target(target);
        ExecutionCallbacks::on_play_animation(&mut self.vm.callbacks, &target, animation, looped)
    }

    fn on_stop_animation(&mut self, target: &str, animation: Option<&str>) -> ExecResult<()> {
        let target = self.vm.resolve_target(target);
        ExecutionCallbacks::on_stop_animation(&mut self.vm.callbacks, &target, animation)
    }

    fn on_emit(&mut self, event: &str, data: &Value) -> ExecResult<()> {
        ExecutionCallbacks::on_emit(&mut self.vm.callbacks, event, data)?;
        self.vm.dispatch(event, data.clone())
    }

    fn on_set(&mut self, path: &str, value: &Value, reactive: bool) -> ExecResult<()> {
        let path = self.vm.resolve_target(path);
        self.vm.env.state.borrow_mut().set(&path, value.clone());
        ExecutionCallbacks::on_set(&mut self.vm.callbacks, &path, value, reactive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::cell::RefCell;

    fn vm(source: &str) -> Vm {
        let mut vm = Vm::default();
        vm.load_source(source).unwrap();
        vm
    }

    fn record(vm: &Vm, event: &str) -> Rc<RefCell<Vec<Event>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        vm.on(event, move |e| sink.borrow_mut().push(e.clone()));
        log
    }

    #[test]
    fn test_tick_publishes_state_and_runs_rules() {
        let mut vm = vm("rule count on tick:\n  set $ticks = $ticks + 1\n");
        vm.set_state_value("ticks", 0.0);
        vm.tick(16.0).unwrap();
        vm.tick(16.0).unwrap();
        assert_eq!(vm.tick_count(), 2);
        assert_eq!(vm.get_state_value("ticks"), Some(Value::Number(2.0)));
        assert_eq!(vm.get_state_value("delta"), Some(Value::Number(16.0)));
        assert_eq!(vm.get_state_value("tickCount"), Some(Value::Number(2.0)));
    }

    #[test]
    fn test_pause_skips_ticks() {
        let mut vm = vm("rule count on tick: set $n = 1\n");
        vm.pause();
        assert!(vm.is_paused());
        vm.tick(16.0).unwrap();
        assert_eq!(vm.tick_count(), 0);
        assert_eq!(vm.get_state_value("n"), None);
        vm.resume();
        vm.tick(16.0).unwrap();
        assert_eq!(vm.get_state_value("n"), Some(Value::Number(1.0)));
    }

    #[test]
    fn test_rule_guard() {
        let mut vm = vm("rule alarm on tick if $o2 < 20:\n  set $alarm = true\n");
        vm.set_state_value("o2", 50.0);
        vm.tick(1.0).unwrap();
        assert_eq!(vm.get_state_value("alarm"), None);
        vm.set_state_value("o2", 10.0);
        vm.tick(1.0).unwrap();
        assert_eq!(vm.get_state_value("alarm"), Some(Value::Boolean(true)));
    }

    #[test]
    fn test_condition_fires_once() {
        let mut vm = vm(
            "condition saved:\n  type: victory\n  when: $temp < 100\n  message: \"Stable at \" + $temp\n  effect:\n    set $won = $won + 1\n",
        );
        let victories = record(&vm, "game:victory");
        let conditions = record(&vm, "condition:victory");
        vm.merge_state(Value::from(json!({ "temp": 50, "won": 0 })));

        for _ in 0..3 {
            vm.tick(1.0).unwrap();
        }
        assert_eq!(victories.borrow().len(), 1);
        assert_eq!(conditions.borrow().len(), 1);
        assert_eq!(vm.get_state_value("won"), Some(Value::Number(1.0)));
        assert_eq!(
            victories.borrow()[0].field("message"),
            Some(&Value::from("Stable at 50"))
        );
        assert_eq!(vm.condition_fired("saved"), Some(true));

        vm.reset_conditions();
        vm.tick(1.0).unwrap();
        assert_eq!(victories.borrow().len(), 2);
    }

    #[test]
    fn test_reset_state_rearms_conditions() {
        let mut vm = vm("condition lost:\n  type: defeat\n  when: true\n");
        let over = record(&vm, "game:over");
        vm.tick(1.0).unwrap();
        vm.tick(1.0).unwrap();
        assert_eq!(over.borrow().len(), 1);
        vm.reset_state();
        assert_eq!(vm.tick_count(), 0);
        vm.tick(1.0).unwrap();
        assert_eq!(over.borrow().len(), 2);
    }

    #[test]
    fn test_emit_order() {
        let mut vm = vm(
            "rule r on damage:\n  emit log who: \"rule\"\nbehavior b:\n  on damage:\n    emit log who: \"behavior\"\n",
        );
        let order = Rc::new(RefCell::new(Vec::new()));
        let sink = order.clone();
        vm.on("log", move |e| {
            sink.borrow_mut().push(e.field("who").cloned().unwrap_or_default().to_string())
        });
        let sink = order.clone();
        vm.on("damage", move |_| sink.borrow_mut().push("listener".to_string()));
        let sink = order.clone();
        vm.on("*", move |e| {
            if e.name == "damage" {
                sink.borrow_mut().push("wildcard".to_string())
            }
        });

        vm.emit("damage", Value::Null).unwrap();
        assert_eq!(
            *order.borrow(),
            vec!["rule", "behavior", "listener", "wildcard"]
        );
    }

    #[test]
    fn test_entity_context_is_restored() {
        let mut vm = vm(
            "behavior guard_ai for guard:\n  on hit:\n    set $hits = $hits + 1\n    set-state self hurt\n    emit inner entity: \"drone\"\nrule seen on inner:\n  set $inner_entity = $_entity\n",
        );
        vm.set_state_value("hits", 0.0);
        vm.set_state_value("_entity", "outer");

        vm.emit("hit", Value::map([("entity".to_string(), Value::from("guard"))]))
            .unwrap();
        assert_eq!(vm.get_state_value("hits"), Some(Value::Number(1.0)));
        assert_eq!(vm.get_state_value("guard.state"), Some(Value::from("hurt")));
        assert_eq!(vm.get_state_value("inner_entity"), Some(Value::from("drone")));
        assert_eq!(vm.get_state_value("_entity"), Some(Value::from("outer")));

        // Wrong entity: the behavior is skipped.
        vm.emit("hit", Value::map([("entity".to_string(), Value::from("crate"))]))
            .unwrap();
        assert_eq!(vm.get_state_value("hits"), Some(Value::Number(1.0)));
    }

    #[test]
    fn test_entity_context_removed_when_absent_before() {
        let mut vm = vm("rule r on hit: set $seen = self\n");
        vm.emit("hit", Value::map([("entity".to_string(), Value::from("guard"))]))
            .unwrap();
        assert_eq!(vm.get_state_value("seen"), Some(Value::from("guard")));
        assert_eq!(vm.entity_context(), None);
    }

    #[test]
    fn test_failed_handler_restores_entity() {
        let mut vm = vm("rule r on hit: return boom()\n");
        let err = vm
            .emit("hit", Value::map([("entity".to_string(), Value::from("guard"))]))
            .unwrap_err();
        assert!(err.to_string().contains("unknown function 'boom'"));
        assert_eq!(vm.entity_context(), None);
    }

    #[test]
    fn test_scenarios() {
        let mut vm = vm(
            "scenario breach:\n  initial:\n    $o2.level = 100\n    alarm = false\n  on tick:\n    set $o2.level = $o2.level - 10\n  on vent:\n    set $alarm = true\n",
        );
        let starts = record(&vm, "scenario:start");
        assert!(!vm.start_scenario("missing").unwrap());
        assert!(vm.start_scenario("breach").unwrap());
        assert_eq!(vm.active_scenario(), Some("breach"));
        assert_eq!(starts.borrow().len(), 1);

        vm.tick(1.0).unwrap();
        assert_eq!(vm.get_state_value("o2.level"), Some(Value::Number(90.0)));
        vm.emit("vent", Value::Null).unwrap();
        assert_eq!(vm.get_state_value("alarm"), Some(Value::Boolean(true)));
    }

    #[test]
    fn test_start_game() {
        let mut vm = vm(
            "scenario intro:\n  initial:\n    $stage = 1\ngame station:\n  title: \"Station\"\n  start: intro\n  display hud:\n    bind: $stage\n",
        );
        assert!(!vm.start_game("other").unwrap());
        assert!(vm.start_game("station").unwrap());
        assert_eq!(vm.active_scenario(), Some("intro"));
        assert_eq!(vm.get_state_value("stage"), Some(Value::Number(1.0)));
        assert!(vm.display_template("hud").is_some());
        assert!(vm.game("station").is_some());
    }

    #[test]
    fn test_interaction() {
        let mut vm = vm(
            "interaction open_hatch:\n  target: hatch\n  when: $power\n  effect:\n    set-state self open\n",
        );
        let opened = record(&vm, "interaction:open_hatch");
        vm.set_state_value("power", false);
        assert!(!vm.interact("open_hatch").unwrap());
        vm.set_state_value("power", true);
        assert!(vm.interact("open_hatch").unwrap());
        assert_eq!(vm.get_state_value("hatch.state"), Some(Value::from("open")));
        assert_eq!(opened.borrow().len(), 1);
        assert!(!vm.interact("missing").unwrap());
        assert!(vm.interaction("open_hatch").is_some());
    }

    #[test]
    fn test_host_callbacks() {
        let mut vm = vm("rule r on go:\n  play fan spin loop\n  set $x = 2\n  emit done\n");
        let log = Rc::new(RefCell::new(Vec::new()));
        let (a, b, c) = (log.clone(), log.clone(), log.clone());
        vm.set_callbacks(
            Callbacks::new()
                .on_play_animation(move |t, anim, looped| {
                    a.borrow_mut().push(format!("play {} {} {}", t, anim, looped))
                })
                .on_set(move |path, value, _| b.borrow_mut().push(format!("set {} {}", path, value)))
                .on_emit(move |event, _| c.borrow_mut().push(format!("emit {}", event))),
        );
        vm.emit("go", Value::Null).unwrap();
        assert_eq!(
            *log.borrow(),
            vec!["play fan spin true", "set x 2", "emit done"]
        );
        assert_eq!(vm.get_state_value("x"), Some(Value::Number(2.0)));
    }

    #[test]
    fn test_unsubscribe_and_off() {
        let mut vm = Vm::default();
        let log = Rc::new(RefCell::new(0));
        let sink = log.clone();
        let sub = vm.on("ping", move |_| *sink.borrow_mut() += 1);
        vm.emit("ping", Value::Null).unwrap();
        assert!(sub.unsubscribe());
        vm.emit("ping", Value::Null).unwrap();
        assert_eq!(*log.borrow(), 1);

        let sink = log.clone();
        let sub = vm.on("ping", move |_| *sink.borrow_mut() += 10);
        assert!(vm.off("ping", sub.id()));
        vm.emit("ping", Value::Null).unwrap();
        assert_eq!(*log.borrow(), 1);
    }

    #[test]
    fn test_configs_and_functions() {
        let mut vm = vm(
            "config atmosphere:\n  o2:\n    threshold: 19\nfunction low(level): return level < $config.atmosphere.o2.threshold\n",
        );
        assert_eq!(
            vm.get_config_value("atmosphere.o2.threshold"),
            Some(Value::Number(19.0))
        );
        assert_eq!(
            vm.call_function("low", vec![Value::Number(5.0)]).unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(vm.evaluate("low(30)").unwrap(), Value::Boolean(false));
        assert!(vm.call_function("high", vec![]).is_err());
    }

    #[test]
    fn test_clear() {
        let mut vm = vm("config c:\n  a: 1\nrule r on tick: set $n = 1\nfunction f(): return 1\n");
        vm.tick(1.0).unwrap();
        vm.clear();
        assert_eq!(vm.get_config_value("c.a"), None);
        assert_eq!(vm.state_json(), json!({}));
        vm.tick(1.0).unwrap();
        assert_eq!(vm.get_state_value("n"), None);
        assert!(vm.call_function("f", vec![]).is_err());
    }

    #[test]
    fn test_while_guard_aborts_tick() {
        let mut vm = Vm::new(VmConfig {
            max_loop_iterations: 3,
            ..VmConfig::default()
        });
        vm.load_source("rule spin on tick:\n  while true:\n    set $n = 1\n").unwrap();
        let err = vm.tick(1.0).unwrap_err();
        assert!(err.to_string().contains("while loop exceeded 3 iterations"));
    }

    #[test]
    fn test_self_emitting_rule_fails_the_emit() {
        let mut vm = vm("rule echo on ping:\n  emit ping\n");
        let err = vm.emit("ping", Value::Null).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Execution(ExecutionError::EmitDepthExceeded { ref event, limit: 16 })
                if event == "ping"
        ));
        assert_eq!(vm.emit_depth, 0);
    }

    #[test]
    fn test_mutual_emission_fails_the_tick() {
        let mut vm = vm(
            "rule kickoff on tick:\n  emit ping\nrule a on ping:\n  emit pong\nrule b on pong:\n  emit ping\n",
        );
        let err = vm.tick(1.0).unwrap_err();
        assert!(err.to_string().contains("exceeded the maximum emit depth of 16"));

        // The VM stays usable once the runaway dispatch has unwound.
        vm.load_source("rule ok on fine:\n  set $done = true\n").unwrap();
        vm.emit("fine", Value::Null).unwrap();
        assert_eq!(vm.get_state_value("done"), Some(Value::Boolean(true)));
    }

    #[test]
    fn test_nested_emission_within_limit() {
        let mut vm = Vm::new(VmConfig {
            max_emit_depth: 3,
            ..VmConfig::default()
        });
        vm.load_source("rule a on one:\n  emit two\nrule b on two:\n  emit three\n")
            .unwrap();
        let log = record(&vm, "three");
        vm.emit("one", Value::Null).unwrap();
        assert_eq!(log.borrow().len(), 1);

        vm.load_source("rule c on three:\n  emit four\n").unwrap();
        let err = vm.emit("one", Value::Null).unwrap_err();
        assert!(err.to_string().contains("event 'four' exceeded the maximum emit depth of 3"));
    }

    #[test]
    fn test_for_over_range_runs_every_step() {
        let mut vm = vm("rule count on go:\n  for i in 0..150000:\n    set $n = i + 1\n");
        vm.emit("go", Value::Null).unwrap();
        assert_eq!(vm.get_state_value("n"), Some(Value::Number(150000.0)));
    }

    #[test]
    fn test_runaway_recursion_fails_with_default_limits() {
        let mut vm = vm("function down(n):\n  if n > 1000:\n    return n\n  return down(n + 1)\n");
        let err = vm.call_function("down", vec![Value::Number(0.0)]).unwrap_err();
        assert!(err.to_string().contains("exceeded the maximum call depth of 32"));
        assert_eq!(vm.environment().calls.get(), 0);
    }
}
