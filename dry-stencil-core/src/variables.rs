// MIT License
//
// Copyright (c) 2024 Jerome Johnson
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! Layered variable collections
//!
//! A [`VariableCollection`] is an ordered key/value map with an optional parent.
//! Lookups that miss locally walk up the parent chain, so scopes can be layered:
//! user values over environment values over computed defaults.

use std::{collections::HashSet, sync::Arc};

use crate::value::Value;

/// Ordered, parent-chained variable scope
#[derive(Debug, Clone, Default)]
pub struct VariableCollection {
    parent: Option<Arc<VariableCollection>>,
    entries: Vec<(String, Value)>,
}

impl VariableCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty scope layered over `parent`
    pub fn with_parent(parent: Arc<VariableCollection>) -> Self {
        Self {
            parent: Some(parent),
            entries: Vec::new(),
        }
    }

    /// Sets a value in this scope, keeping the position of an existing key
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Looks a key up in this scope, then in its ancestors
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
            .or_else(|| self.parent.as_ref().and_then(|p| p.get(key)))
    }

    /// Keys defined in this scope only, in insertion order
    pub fn local_keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Every visible key, nearest scope first, without duplicates
    pub fn keys(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut keys = Vec::new();
        let mut scope = Some(self);
        while let Some(current) = scope {
            for (key, _) in &current.entries {
                if seen.insert(key.as_str()) {
                    keys.push(key.clone());
                }
            }
            scope = current.parent.as_deref();
        }
        keys
    }

    pub fn len(&self) -> usize {
        self.keys().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.parent.as_ref().is_none_or(|p| p.is_empty())
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for VariableCollection {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut collection = Self::new();
        for (key, value) in iter {
            collection.set(key, value);
        }
        collection
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layered() -> VariableCollection {
        let defaults: VariableCollection = [("name", "default"), ("framework", "net8.0")].into_iter().collect();
        let mut user = VariableCollection::with_parent(Arc::new(defaults));
        user.set("name", "MyApp");
        user.set("auth", true);
        user
    }

    #[test]
    fn child_values_shadow_parent_values() {
        let vars = layered();
        assert_eq!(vars.get("name"), Some(&Value::from("MyApp")));
        assert_eq!(vars.get("framework"), Some(&Value::from("net8.0")));
        assert_eq!(vars.get("missing"), None);
    }

    #[test]
    fn keys_are_visible_once_nearest_first() {
        assert_eq!(layered().keys(), vec!["name", "auth", "framework"]);
        assert_eq!(layered().len(), 3);
    }

    #[test]
    fn set_replaces_in_place() {
        let mut vars: VariableCollection = [("a", 1), ("b", 2)].into_iter().collect();
        assert_eq!(vars.set("a", 3), Some(Value::from(1)));
        assert_eq!(vars.local_keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(vars.get("a"), Some(&Value::from(3)));
    }

    #[test]
    fn empty_chain_is_empty() {
        let parent = Arc::new(VariableCollection::new());
        assert!(VariableCollection::with_parent(parent).is_empty());
        assert!(!layered().is_empty());
    }
}
