//! Name-keyed registries owned by an [`Environment`]: evaluated `config`
//! blocks and user functions.

use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use tracing::debug;

use crate::ast::{FunctionDef, Module, Property, PropertyValue};

use super::context::{EvalContext, Environment};
use super::evaluator::EvalResult;
use super::expression::evaluate;
use super::value::Value;

/// Evaluated `config` blocks, keyed by config name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigRegistry {
    configs: BTreeMap<String, Value>,
}

impl ConfigRegistry {
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.configs.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.configs.get(name)
    }

    /// `atmosphere.o2.threshold` reads config `atmosphere`, then walks
    /// `o2.threshold` inside it.
    pub fn get_config_value(&self, path: &str) -> Option<Value> {
        let mut segments = path.split('.');
        let mut current = self.configs.get(segments.next()?)?.clone();
        for segment in segments {
            current = current.member(segment)?;
        }
        Some(current)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.configs.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    pub fn clear(&mut self) {
        self.configs.clear();
    }
}

#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, Rc<FunctionDef>>,
}

impl FunctionRegistry {
    pub fn register(&mut self, def: FunctionDef) {
        debug!("registering function {}", def.name);
        self.functions.insert(def.name.clone(), Rc::new(def));
    }

    pub fn get(&self, name: &str) -> Option<Rc<FunctionDef>> {
        self.functions.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn clear(&mut self) {
        self.functions.clear();
    }
}

/// Evaluates every `config` block in `module` and stores it in the
/// environment's config registry. Blocks are loaded in source order, so a
/// later block may read an earlier one through `$config.<name>`.
pub fn load_configs_from_module(env: &Environment, module: &Module) -> EvalResult<()> {
    for config in module.configs() {
        let value = {
            let ctx = EvalContext::new(env.clone());
            properties_to_value(&config.properties, &ctx)?
        };
        debug!("loaded config {}", config.name);
        env.config.borrow_mut().insert(config.name.clone(), value);
    }
    Ok(())
}

/// Registers every `function` definition in `module`.
pub fn load_functions_from_module(env: &Environment, module: &Module) {
    let mut functions = env.functions.borrow_mut();
    for def in module.functions() {
        functions.register(def.clone());
    }
}

/// Turns a property list into a map value. Nested blocks become nested
/// maps and dotted keys (`o2.threshold: 19`) expand into nested maps too.
pub fn properties_to_value(properties: &[Property], ctx: &EvalContext) -> EvalResult<Value> {
    let mut map = BTreeMap::new();
    for property in properties {
        let value = match &property.value {
            PropertyValue::Expression(expr) => evaluate(expr, ctx)?,
            PropertyValue::Block(block) => properties_to_value(block, ctx)?,
        };
        insert_path(&mut map, &property.key, value);
    }
    Ok(Value::Map(map))
}

fn insert_path(map: &mut BTreeMap<String, Value>, key: &str, value: Value) {
    match key.split_once('.') {
        None => match (map.get_mut(key), value) {
            // Repeated block keys merge instead of replacing.
            (Some(Value::Map(existing)), Value::Map(incoming)) => existing.extend(incoming),
            (_, value) => {
                map.insert(key.to_string(), value);
            }
        },
        Some((head, rest)) => {
            let slot = map
                .entry(head.to_string())
                .or_insert_with(|| Value::Map(BTreeMap::new()));
            if !matches!(slot, Value::Map(_)) {
                *slot = Value::Map(BTreeMap::new());
            }
            if let Value::Map(inner) = slot {
                insert_path(inner, rest, value);
            }
        }
    }
}
