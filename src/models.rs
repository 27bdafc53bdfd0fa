//! Data models for crafting trees and shopping lists

use serde::Serialize;

/// Display name used when an item record carries no name at all
pub const UNKNOWN_ITEM_NAME: &str = "Unknown Item";

/// One entry in a crafting tree
#[derive(Debug, Clone, PartialEq)]
pub struct CraftItem {
    /// Key under which the item is stored in its parent (path segment)
    pub key: String,
    pub name: String,
    /// Units needed to produce one unit of the parent
    pub base_quantity: f64,
    /// Base quantity multiplied down from the root
    pub quantity: f64,
    pub rarity: Option<String>, // lowercased
    pub source: Option<String>,
    pub wiki: Option<String>,
    /// Cost of crafting one unit
    pub crafting_cost: Option<f64>,
    pub sell_to_vendor: Option<f64>,
    pub buy_from_vendor: Option<f64>,
    pub specialisations: Vec<String>,
    pub children: Vec<CraftItem>,
}

impl CraftItem {
    /// Leaf items are gathered, everything else is crafted
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn identity(&self) -> ItemIdentity {
        ItemIdentity {
            name: self.name.clone(),
            rarity: self.rarity.clone(),
            source: self.source.clone(),
            wiki: self.wiki.clone(),
        }
    }

    pub fn child(&self, key: &str) -> Option<&CraftItem> {
        self.children.iter().find(|c| c.key == key)
    }

    /// All items below this one, depth-first, excluding the item itself
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants {
            stack: self.children.iter().rev().collect(),
        }
    }
}

pub struct Descendants<'a> {
    stack: Vec<&'a CraftItem>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a CraftItem;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.stack.pop()?;
        self.stack.extend(item.children.iter().rev());
        Some(item)
    }
}

/// The root items of one dataset, in source order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Forest {
    pub roots: Vec<CraftItem>,
}

impl Forest {
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Resolve a `/`-separated key path such as `Sword/Blade`
    pub fn find(&self, path: &str) -> Option<&CraftItem> {
        let mut segments = path.split('/').filter(|s| !s.is_empty());
        let first = segments.next()?;
        let mut item = self.roots.iter().find(|r| r.key == first)?;
        for segment in segments {
            item = item.child(segment)?;
        }
        Some(item)
    }

    /// Visit every item depth-first with its path and depth
    pub fn walk<F>(&self, mut visit: F)
    where
        F: FnMut(&str, &CraftItem, usize),
    {
        fn walk_recursive<F>(item: &CraftItem, path: &str, depth: usize, visit: &mut F)
        where
            F: FnMut(&str, &CraftItem, usize),
        {
            visit(path, item, depth);
            for child in &item.children {
                let child_path = format!("{}/{}", path, child.key);
                walk_recursive(child, &child_path, depth + 1, visit);
            }
        }

        for root in &self.roots {
            walk_recursive(root, &root.key, 0, &mut visit);
        }
    }
}

/// Items with equal identities are the same item and merge during aggregation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ItemIdentity {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rarity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wiki: Option<String>,
}

/// One merged entry of a shopping list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShoppingLine {
    #[serde(flatten)]
    pub item: ItemIdentity,
    pub quantity: f64,
}

/// Result of resolving one item at a requested quantity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShoppingList {
    #[serde(rename = "target")]
    pub target_name: String,
    #[serde(rename = "quantity")]
    pub target_quantity: f64,
    /// Leaf descendants, sorted by display line
    pub gather: Vec<ShoppingLine>,
    /// Intermediate descendants, sorted by display line
    pub craft: Vec<ShoppingLine>,
    /// Crafting cost of the target and every intermediate item
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crafting_cost: Option<f64>,
    /// Price of buying every gathered item from a vendor
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buy_from_vendor: Option<f64>,
    /// What the requested targets fetch from a vendor
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sell_to_vendor: Option<f64>,
}
