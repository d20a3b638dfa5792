//! Leaf paths, diffs and pruning over language pack trees.
//!
//! A leaf is addressed by its dotted/indexed path from the root, e.g.
//! `menu.items[2].string`. Pruning recurses depth-first and never keeps a
//! map or sequence that ends up empty.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Key holding the translatable text in `{ "string": ..., ...metadata }` leaves
pub const STRING_KEY: &str = "string";

/// Which leaves count as translatable strings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LeafMode {
    /// Only values under a `string` key that are themselves strings
    #[default]
    StringField,
    /// Every string value
    PlainString,
}

/// Paths present on one side only. Both sets are sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KeyDiff {
    pub only_in_a: BTreeSet<String>,
    pub only_in_b: BTreeSet<String>,
}

impl KeyDiff {
    pub fn is_empty(&self) -> bool {
        self.only_in_a.is_empty() && self.only_in_b.is_empty()
    }

    /// Number of paths in the symmetric difference
    pub fn len(&self) -> usize {
        self.only_in_a.len() + self.only_in_b.len()
    }

    pub fn swapped(self) -> Self {
        Self {
            only_in_a: self.only_in_b,
            only_in_b: self.only_in_a,
        }
    }
}

fn child_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

fn index_path(prefix: &str, index: usize) -> String {
    format!("{}[{}]", prefix, index)
}

/// Collect the paths of every translatable leaf.
pub fn leaf_paths(tree: &Value, mode: LeafMode) -> BTreeSet<String> {
    let mut paths = BTreeSet::new();
    collect(tree, "", mode, &mut paths);
    paths
}

fn collect(node: &Value, path: &str, mode: LeafMode, paths: &mut BTreeSet<String>) {
    match node {
        Value::Object(map) => {
            for (key, value) in map {
                let full = child_path(path, key);
                match (mode, value) {
                    (LeafMode::StringField, Value::String(_)) if key == STRING_KEY => {
                        paths.insert(full);
                    }
                    _ => collect(value, &full, mode, paths),
                }
            }
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                collect(item, &index_path(path, index), mode, paths);
            }
        }
        Value::String(_) if mode == LeafMode::PlainString => {
            paths.insert(path.to_string());
        }
        _ => {}
    }
}

/// Symmetric difference of the leaf paths of `a` and `b`.
pub fn diff(a: &Value, b: &Value, mode: LeafMode) -> KeyDiff {
    let paths_a = leaf_paths(a, mode);
    let paths_b = leaf_paths(b, mode);

    KeyDiff {
        only_in_a: paths_a.difference(&paths_b).cloned().collect(),
        only_in_b: paths_b.difference(&paths_a).cloned().collect(),
    }
}

/// Keep only the scalar leaves whose path is in `keep`.
pub fn prune_to_paths(tree: &Value, keep: &BTreeSet<String>) -> Value {
    prune(tree, "", &|path| keep.contains(path)).unwrap_or_else(empty_object)
}

/// Drop the scalar leaves whose path is in `remove`, keep everything else.
pub fn prune_removing_paths(tree: &Value, remove: &BTreeSet<String>) -> Value {
    prune(tree, "", &|path| !remove.contains(path)).unwrap_or_else(empty_object)
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

fn prune(node: &Value, path: &str, keep: &dyn Fn(&str) -> bool) -> Option<Value> {
    match node {
        Value::Object(map) => {
            let pruned: Map<String, Value> = map
                .iter()
                .filter_map(|(key, value)| {
                    prune(value, &child_path(path, key), keep).map(|v| (key.clone(), v))
                })
                .collect();
            (!pruned.is_empty()).then_some(Value::Object(pruned))
        }
        Value::Array(items) => {
            let pruned: Vec<Value> = items
                .iter()
                .enumerate()
                .filter_map(|(index, item)| prune(item, &index_path(path, index), keep))
                .collect();
            (!pruned.is_empty()).then_some(Value::Array(pruned))
        }
        leaf => keep(path).then(|| leaf.clone()),
    }
}

/// Top-level keys present in only one of two flat maps, with their values.
///
/// Each side keeps the key order of its source map.
pub fn top_level_diff(
    a: &Map<String, Value>,
    b: &Map<String, Value>,
) -> (Map<String, Value>, Map<String, Value>) {
    let only = |from: &Map<String, Value>, other: &Map<String, Value>| {
        from.iter()
            .filter(|(key, _)| !other.contains_key(*key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect::<Map<String, Value>>()
    };
    (only(a, b), only(b, a))
}
