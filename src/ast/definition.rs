use std::collections::BTreeMap;

use strum_macros::{AsRefStr, Display, EnumString};

use super::{Easing, EventHandler, Expression, Location, Statement};

/// A parsed source file: its definitions in source order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Module {
    pub definitions: Vec<Definition>,
}

impl Module {
    pub fn rules(&self) -> impl Iterator<Item = &RuleDef> {
        self.definitions.iter().filter_map(|d| match d {
            Definition::Rule(def) => Some(def),
            _ => None,
        })
    }

    pub fn configs(&self) -> impl Iterator<Item = &ConfigDef> {
        self.definitions.iter().filter_map(|d| match d {
            Definition::Config(def) => Some(def),
            _ => None,
        })
    }

    pub fn functions(&self) -> impl Iterator<Item = &FunctionDef> {
        self.definitions.iter().filter_map(|d| match d {
            Definition::Function(def) => Some(def),
            _ => None,
        })
    }

    /// Definition counts keyed by kind, for summaries.
    pub fn summary(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for definition in &self.definitions {
            *counts.entry(definition.kind_name()).or_insert(0) += 1;
        }
        counts
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Definition {
    Asset(AssetDef),
    Layout(LayoutDef),
    Entity(EntityDef),
    Machine(MachineDef),
    Config(ConfigDef),
    Function(FunctionDef),
    Rule(RuleDef),
    Scenario(ScenarioDef),
    Behavior(BehaviorDef),
    Condition(ConditionDef),
    Game(GameDef),
    Interaction(InteractionDef),
}

impl Definition {
    pub fn name(&self) -> &str {
        match self {
            Definition::Asset(d) => &d.name,
            Definition::Layout(d) => &d.name,
            Definition::Entity(d) => &d.name,
            Definition::Machine(d) => &d.name,
            Definition::Config(d) => &d.name,
            Definition::Function(d) => &d.name,
            Definition::Rule(d) => &d.name,
            Definition::Scenario(d) => &d.name,
            Definition::Behavior(d) => &d.name,
            Definition::Condition(d) => &d.name,
            Definition::Game(d) => &d.name,
            Definition::Interaction(d) => &d.name,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Definition::Asset(_) => "asset",
            Definition::Layout(_) => "layout",
            Definition::Entity(_) => "entity",
            Definition::Machine(_) => "machine",
            Definition::Config(_) => "config",
            Definition::Function(_) => "function",
            Definition::Rule(_) => "rule",
            Definition::Scenario(_) => "scenario",
            Definition::Behavior(_) => "behavior",
            Definition::Condition(_) => "condition",
            Definition::Game(_) => "game",
            Definition::Interaction(_) => "interaction",
        }
    }
}

/// `key: value` or `key:` followed by a nested block of properties.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub key: String,
    pub value: PropertyValue,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Expression(Expression),
    Block(Vec<Property>),
}

pub fn find_property<'a>(properties: &'a [Property], key: &str) -> Option<&'a Property> {
    properties.iter().find(|p| p.key == key)
}

// Assets

#[derive(Debug, Clone, PartialEq)]
pub struct AssetDef {
    pub name: String,
    pub params: Vec<ParamDef>,
    pub geometry: Vec<Primitive>,
    pub states: Vec<AssetState>,
    pub animations: Vec<AnimationDef>,
    pub location: Location,
}

/// `width: number 1..10 = 4`
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDef {
    pub name: String,
    pub type_name: String,
    pub range: Option<Expression>,
    pub default: Option<Expression>,
}

/// `box body size: (1, 2, 1)` plus an optional nested property block.
#[derive(Debug, Clone, PartialEq)]
pub struct Primitive {
    pub shape: String,
    pub name: Option<String>,
    pub properties: Vec<Property>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssetState {
    pub name: String,
    pub properties: Vec<Property>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationDef {
    pub name: String,
    pub properties: Vec<Property>,
    pub keyframes: Vec<Keyframe>,
}

/// A normalized `time` (0..1) pointing at a named state.
#[derive(Debug, Clone, PartialEq)]
pub struct Keyframe {
    pub time: f64,
    pub state: String,
    pub easing: Option<Easing>,
}

// Layouts

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutDef {
    pub name: String,
    pub items: Vec<LayoutItem>,
    pub properties: Vec<Property>,
    pub location: Location,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum LayoutItemKind {
    Room,
    Door,
    Terminal,
    Switch,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutItem {
    pub kind: LayoutItemKind,
    pub name: String,
    pub properties: Vec<Property>,
    pub location: Location,
}

// Entities and machines

#[derive(Debug, Clone, PartialEq)]
pub struct EntityDef {
    pub name: String,
    pub properties: Vec<Property>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MachineDef {
    pub name: String,
    pub initial: Option<String>,
    pub states: Vec<MachineState>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MachineState {
    pub name: String,
    pub transitions: Vec<Transition>,
    pub on_enter: Vec<Statement>,
    pub on_exit: Vec<Statement>,
}

/// `on <event> -> <target> [if <guard>]`
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub event: String,
    pub target: String,
    pub guard: Option<Expression>,
}

// Config and functions

#[derive(Debug, Clone, PartialEq)]
pub struct ConfigDef {
    pub name: String,
    pub properties: Vec<Property>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<FunctionParam>,
    pub body: Vec<Statement>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionParam {
    pub name: String,
    pub default: Option<Expression>,
}

// Runtime constructs

#[derive(Debug, Clone, PartialEq)]
pub struct RuleDef {
    pub name: String,
    pub trigger: String,
    pub guard: Option<Expression>,
    pub body: Vec<Statement>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioDef {
    pub name: String,
    pub initial: Vec<StateAssignment>,
    pub handlers: Vec<EventHandler>,
    pub properties: Vec<Property>,
    pub location: Location,
}

/// `$oxygen.level = 100` inside a scenario's `initial:` block.
#[derive(Debug, Clone, PartialEq)]
pub struct StateAssignment {
    pub path: String,
    pub value: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BehaviorDef {
    pub name: String,
    pub entity: Option<String>,
    pub handlers: Vec<EventHandler>,
    pub properties: Vec<Property>,
    pub location: Location,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum ConditionKind {
    Victory,
    Defeat,
    Checkpoint,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConditionDef {
    pub name: String,
    pub kind: ConditionKind,
    pub trigger: Expression,
    pub message: Option<Expression>,
    pub effects: Vec<Statement>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameDef {
    pub name: String,
    pub properties: Vec<Property>,
    pub screen: Vec<Property>,
    pub render: Vec<Property>,
    pub styles: Vec<Property>,
    pub displays: Vec<DisplayTemplate>,
    pub location: Location,
}

/// `display <name>:` inside a game block.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayTemplate {
    pub name: String,
    pub properties: Vec<Property>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InteractionDef {
    pub name: String,
    pub target: Option<String>,
    pub prompt: Option<Expression>,
    pub guard: Option<Expression>,
    pub effects: Vec<Statement>,
    pub properties: Vec<Property>,
    pub location: Location,
}
