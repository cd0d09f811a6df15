//! The VM's mutable state tree, addressed by dotted paths.

use std::collections::BTreeMap;

use crate::eval::Value;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateTree {
    root: BTreeMap<String, Value>,
}

impl StateTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `a.b.c`. Segments after the first may also address vector
    /// components and other [`Value::member`] fields.
    pub fn get(&self, path: &str) -> Option<Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.root.get(first)?.clone();
        for segment in segments {
            current = current.member(segment)?;
        }
        Some(current)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Writes `a.b.c`, creating intermediate maps and replacing any
    /// non-map value that sits on the path.
    pub fn set(&mut self, path: &str, value: Value) {
        let segments: Vec<&str> = path.split('.').collect();
        let Some((last, parents)) = segments.split_last() else {
            return;
        };
        let mut map = &mut self.root;
        for segment in parents {
            let slot = map
                .entry(segment.to_string())
                .or_insert_with(|| Value::Map(BTreeMap::new()));
            if !matches!(slot, Value::Map(_)) {
                *slot = Value::Map(BTreeMap::new());
            }
            let Value::Map(next) = slot else {
                return;
            };
            map = next;
        }
        map.insert(last.to_string(), value);
    }

    pub fn remove(&mut self, path: &str) -> Option<Value> {
        let segments: Vec<&str> = path.split('.').collect();
        let (last, parents) = segments.split_last()?;
        let mut map = &mut self.root;
        for segment in parents {
            match map.get_mut(*segment) {
                Some(Value::Map(next)) => map = next,
                _ => return None,
            }
        }
        map.remove(*last)
    }

    /// Deep-merges a map value into the tree. Nested maps merge key by key;
    /// anything else replaces what was there.
    pub fn merge(&mut self, value: Value) {
        if let Value::Map(entries) = value {
            merge_into(&mut self.root, entries);
        }
    }

    pub fn clear(&mut self) {
        self.root.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    pub fn to_value(&self) -> Value {
        Value::Map(self.root.clone())
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::from(&self.to_value())
    }
}

fn merge_into(target: &mut BTreeMap<String, Value>, source: BTreeMap<String, Value>) {
    for (key, value) in source {
        match (target.get_mut(&key), value) {
            (Some(Value::Map(existing)), Value::Map(incoming)) => merge_into(existing, incoming),
            (_, value) => {
                target.insert(key, value);
            }
        }
    }
}
