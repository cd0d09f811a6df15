use std::collections::HashMap;
use std::rc::Rc;

use tracing::debug;

use crate::ast::{
    BehaviorDef, ConditionDef, Definition, DisplayTemplate, GameDef, InteractionDef, Module,
    RuleDef, ScenarioDef,
};

/// A condition and whether it has fired since the last reset.
#[derive(Debug, Clone)]
pub struct ConditionEntry {
    pub def: Rc<ConditionDef>,
    pub fired: bool,
}

/// Constructs registered from loaded modules. Dispatch works on `Rc`
/// snapshots so handlers may load or clear while they run.
#[derive(Debug, Default)]
pub struct ConstructRegistry {
    rules: Vec<Rc<RuleDef>>,
    scenarios: HashMap<String, Rc<ScenarioDef>>,
    behaviors: Vec<Rc<BehaviorDef>>,
    conditions: Vec<ConditionEntry>,
    games: HashMap<String, Rc<GameDef>>,
    interactions: HashMap<String, Rc<InteractionDef>>,
    displays: HashMap<String, Rc<DisplayTemplate>>,
}

impl ConstructRegistry {
    /// Registers every runtime construct in `module`. Rules and behaviors
    /// accumulate; other constructs replace any earlier one of the same name.
    pub fn register_module(&mut self, module: &Module) {
        for definition in &module.definitions {
            match definition {
                Definition::Rule(def) => self.rules.push(Rc::new(def.clone())),
                Definition::Scenario(def) => {
                    self.scenarios.insert(def.name.clone(), Rc::new(def.clone()));
                }
                Definition::Behavior(def) => self.behaviors.push(Rc::new(def.clone())),
                Definition::Condition(def) => {
                    self.conditions.retain(|entry| entry.def.name != def.name);
                    self.conditions.push(ConditionEntry {
                        def: Rc::new(def.clone()),
                        fired: false,
                    });
                }
                Definition::Game(def) => {
                    for display in &def.displays {
                        self.displays
                            .insert(display.name.clone(), Rc::new(display.clone()));
                    }
                    self.games.insert(def.name.clone(), Rc::new(def.clone()));
                }
                Definition::Interaction(def) => {
                    self.interactions
                        .insert(def.name.clone(), Rc::new(def.clone()));
                }
                // Static content and registry-backed definitions are handled
                // elsewhere.
                Definition::Asset(_)
                | Definition::Layout(_)
                | Definition::Entity(_)
                | Definition::Machine(_)
                | Definition::Config(_)
                | Definition::Function(_) => {}
            }
        }
        debug!(
            "registered {} rules, {} scenarios, {} behaviors, {} conditions",
            self.rules.len(),
            self.scenarios.len(),
            self.behaviors.len(),
            self.conditions.len()
        );
    }

    pub fn rules_for(&self, event: &str) -> Vec<Rc<RuleDef>> {
        self.rules
            .iter()
            .filter(|rule| rule.trigger == event)
            .cloned()
            .collect()
    }

    pub fn behaviors(&self) -> Vec<Rc<BehaviorDef>> {
        self.behaviors.clone()
    }

    pub fn scenario(&self, name: &str) -> Option<Rc<ScenarioDef>> {
        self.scenarios.get(name).cloned()
    }

    pub fn game(&self, name: &str) -> Option<Rc<GameDef>> {
        self.games.get(name).cloned()
    }

    pub fn interaction(&self, name: &str) -> Option<Rc<InteractionDef>> {
        self.interactions.get(name).cloned()
    }

    pub fn display_template(&self, name: &str) -> Option<Rc<DisplayTemplate>> {
        self.displays.get(name).cloned()
    }

    /// Conditions that have not fired yet, with their index.
    pub fn pending_conditions(&self) -> Vec<(usize, Rc<ConditionDef>)> {
        self.conditions
            .iter()
            .enumerate()
            .filter(|(_, entry)| !entry.fired)
            .map(|(index, entry)| (index, entry.def.clone()))
            .collect()
    }

    /// Marks a condition fired. Returns false if it already had.
    pub fn mark_fired(&mut self, index: usize) -> bool {
        match self.conditions.get_mut(index) {
            Some(entry) if !entry.fired => {
                entry.fired = true;
                true
            }
            _ => false,
        }
    }

    pub fn condition_fired(&self, name: &str) -> Option<bool> {
        self.conditions
            .iter()
            .find(|entry| entry.def.name == name)
            .map(|entry| entry.fired)
    }

    pub fn reset_conditions(&mut self) {
        for entry in &mut self.conditions {
            entry.fired = false;
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
