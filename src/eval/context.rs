use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::config::VmConfig;
use crate::state::StateTree;

use super::registry::{ConfigRegistry, FunctionRegistry};
use super::value::Value;

/// Guards applied while executing statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_loop_iterations: usize,
    pub max_call_depth: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self::from(&VmConfig::default())
    }
}

impl From<&VmConfig> for Limits {
    fn from(config: &VmConfig) -> Self {
        Self {
            max_loop_iterations: config.max_loop_iterations,
            max_call_depth: config.max_call_depth,
        }
    }
}

/// Shared handles to the state tree and the registries an expression can
/// reach. Cloning is cheap and every clone sees the same data.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    pub state: Rc<RefCell<StateTree>>,
    pub config: Rc<RefCell<ConfigRegistry>>,
    pub functions: Rc<RefCell<FunctionRegistry>>,
    pub limits: Limits,
    /// User function frames currently running, across every context and
    /// nested dispatch sharing this environment.
    pub calls: Rc<Cell<usize>>,
}

impl Environment {
    pub fn new(limits: Limits) -> Self {
        Self {
            limits,
            ..Default::default()
        }
    }

    pub fn with_state(state: StateTree) -> Self {
        Self {
            state: Rc::new(RefCell::new(state)),
            ..Default::default()
        }
    }
}

/// Lexical scope for evaluation. Lookups walk `vars` and then the parent
/// chain; reactive `$paths` go to the environment instead.
#[derive(Debug)]
pub struct EvalContext<'a> {
    vars: HashMap<String, Value>,
    env: Environment,
    parent: Option<&'a EvalContext<'a>>,
}

impl EvalContext<'static> {
    pub fn new(env: Environment) -> Self {
        Self {
            vars: HashMap::new(),
            env,
            parent: None,
        }
    }
}

impl<'a> EvalContext<'a> {
    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn limits(&self) -> Limits {
        self.env.limits
    }

    pub fn lookup(&self, name: &str) -> Option<Value> {
        match self.vars.get(name) {
            Some(value) => Some(value.clone()),
            None => self.parent.and_then(|parent| parent.lookup(name)),
        }
    }

    /// Binds `name` in this scope only; parents are never written.
    pub fn set_var(&mut self, name: impl Into<String>, value: Value) {
        self.vars.insert(name.into(), value);
    }

    pub fn with_var(mut self, name: impl Into<String>, value: Value) -> Self {
        self.set_var(name, value);
        self
    }

    /// A nested block scope, e.g. one loop iteration.
    pub fn child(&self) -> EvalContext<'_> {
        EvalContext {
            vars: HashMap::new(),
            env: self.env.clone(),
            parent: Some(self),
        }
    }

    /// Resolves `$a.b.c`. A leading `config` segment reads the config
    /// registry, anything else reads state. Missing paths are `Null`.
    pub fn resolve_reactive(&self, path: &[String]) -> Value {
        match path.split_first() {
            Some((first, rest)) if first == "config" && !rest.is_empty() => self
                .env
                .config
                .borrow()
                .get_config_value(&rest.join("."))
                .unwrap_or_default(),
            Some(_) => self
                .env
                .state
                .borrow()
                .get(&path.join("."))
                .unwrap_or_default(),
            None => Value::Null,
        }
    }
}
