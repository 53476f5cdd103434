use std::collections::HashMap;

use crate::asset::Asset;

/// Assets keyed by decoded path, in the order they were first inserted.
///
/// Inserting a path that is already present replaces the asset in place, so
/// the archive writes entries back in the same order it read them.
#[derive(Debug, Clone, Default)]
pub struct AssetTable {
    entries: Vec<(String, Asset)>,
    by_path: HashMap<String, usize>,
}

impl AssetTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            by_path: HashMap::with_capacity(capacity),
        }
    }

    /// Insert or replace.  Returns the asset previously stored under `path`.
    pub fn insert(&mut self, path: String, asset: Asset) -> Option<Asset> {
        if let Some(&i) = self.by_path.get(&path) {
            return Some(std::mem::replace(&mut self.entries[i].1, asset));
        }
        self.by_path.insert(path.clone(), self.entries.len());
        self.entries.push((path, asset));
        None
    }

    pub fn get(&self, path: &str) -> Option<&Asset> {
        self.by_path.get(path).map(|&i| &self.entries[i].1)
    }

    pub fn get_mut(&mut self, path: &str) -> Option<&mut Asset> {
        self.by_path.get(path).map(|&i| &mut self.entries[i].1)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.by_path.contains_key(path)
    }

    /// Positional access, in table order.
    pub fn get_index(&self, index: usize) -> Option<(&str, &Asset)> {
        self.entries.get(index).map(|(p, a)| (p.as_str(), a))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Asset)> {
        self.entries.iter().map(|(p, a)| (p.as_str(), a))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut Asset)> {
        self.entries.iter_mut().map(|(p, a)| (p.as_str(), a))
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(p, _)| p.as_str())
    }
}
