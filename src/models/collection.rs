// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use serde::{Serialize, Serializer};
use std::collections::{BTreeSet, HashSet};

use super::item::Item;

/// Ordered set of items, deduplicated by name.
///
/// Iteration follows insertion order; equality only looks at the set of names.
/// When two items share a name the one inserted first is kept.
#[derive(Debug, Clone, Default)]
pub struct ItemCollection {
    items: Vec<Item>,
    names: HashSet<String>,
}

impl ItemCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append unless an item with the same name is already present.
    /// Returns whether the item was added.
    pub fn push(&mut self, item: Item) -> bool {
        if self.names.contains(&item.name) {
            return false;
        }
        self.names.insert(item.name.clone());
        self.items.push(item);
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn get(&self, name: &str) -> Option<&Item> {
        if !self.contains(name) {
            return None;
        }
        self.items.iter().find(|i| i.name == name)
    }

    pub fn union(&self, other: &ItemCollection) -> ItemCollection {
        let mut merged = self.clone();
        for item in &other.items {
            merged.push(item.clone());
        }
        merged
    }

    pub fn retain<F: FnMut(&Item) -> bool>(&mut self, mut keep: F) {
        let names = &mut self.names;
        self.items.retain(|item| {
            let kept = keep(item);
            if !kept {
                names.remove(&item.name);
            }
            kept
        });
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Item> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn names(&self) -> BTreeSet<&str> {
        self.names.iter().map(String::as_str).collect()
    }

    /// Items sorted by name, for display
    pub fn sorted(&self) -> Vec<&Item> {
        let mut items: Vec<&Item> = self.items.iter().collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        items
    }

    pub fn into_vec(self) -> Vec<Item> {
        self.items
    }
}

impl PartialEq for ItemCollection {
    fn eq(&self, other: &Self) -> bool {
        self.names == other.names
    }
}

impl Eq for ItemCollection {}

impl From<Vec<Item>> for ItemCollection {
    fn from(items: Vec<Item>) -> Self {
        items.into_iter().collect()
    }
}

impl FromIterator<Item> for ItemCollection {
    fn from_iter<T: IntoIterator<Item = Item>>(iter: T) -> Self {
        let mut collection = ItemCollection::new();
        for item in iter {
            collection.push(item);
        }
        collection
    }
}

impl Extend<Item> for ItemCollection {
    fn extend<T: IntoIterator<Item = Item>>(&mut self, iter: T) {
        for item in iter {
            self.push(item);
        }
    }
}

impl IntoIterator for ItemCollection {
    type Item = Item;
    type IntoIter = std::vec::IntoIter<Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a ItemCollection {
    type Item = &'a Item;
    type IntoIter = std::slice::Iter<'a, Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl Serialize for ItemCollection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.items.serialize(serializer)
    }
}
