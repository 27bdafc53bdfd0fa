//! Builds crafting trees from JSON payloads
//!
//! A payload is either an object (key -> item) or an array of items. Items
//! nest their components under `items` (or `children`), again as an object
//! or an array. A bare number stands for an unnamed record carrying only a
//! quantity, so `"Iron": 3` reads as `{"name": "Iron", "quantity": 3}`.
//!
//! A component without components of its own picks them up from the root
//! item of the same name, so recipes can refer to each other by name. Fields
//! set on the component win over the recipe's.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use indexmap::map::Entry;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{CraftError, CraftResult};
use crate::models::{CraftItem, Forest, UNKNOWN_ITEM_NAME};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Count(f64),
    Record(RawItem),
}

#[derive(Debug, Default, Deserialize)]
struct RawItem {
    #[serde(default)]
    name: Option<String>,
    // numbers, numeric strings or junk; junk falls back per item
    #[serde(default)]
    quantity: Option<Value>,
    #[serde(default)]
    rarity: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    wiki: Option<String>,
    #[serde(default)]
    crafting_cost: Option<Value>,
    #[serde(default)]
    sell_to_vendor: Option<Value>,
    #[serde(default)]
    buy_from_vendor: Option<Value>,
    #[serde(default, alias = "specialization")]
    specialisation: Option<String>,
    #[serde(default, alias = "specializations")]
    specialisations: Vec<String>,
    #[serde(default, alias = "children")]
    items: Option<RawChildren>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawChildren {
    Keyed(IndexMap<String, RawEntry>),
    Listed(Vec<RawEntry>),
}

impl RawChildren {
    fn entries(&self) -> Vec<(Option<&str>, &RawEntry)> {
        match self {
            RawChildren::Keyed(map) => map.iter().map(|(k, v)| (Some(k.as_str()), v)).collect(),
            RawChildren::Listed(list) => list.iter().map(|v| (None, v)).collect(),
        }
    }
}

/// Root recipes by name, plus the names currently being expanded
struct Resolver<'a> {
    recipes: HashMap<String, &'a RawItem>,
    expanding: Vec<String>,
}

impl<'a> Resolver<'a> {
    fn new(roots: &'a RawChildren) -> Self {
        let mut recipes = HashMap::new();
        for (key, entry) in roots.entries() {
            let RawEntry::Record(item) = entry else {
                continue;
            };
            if item.items.is_none() {
                continue;
            }
            if let Some(key) = key.filter(|k| !k.trim().is_empty()) {
                recipes.insert(key.trim().to_string(), item);
            }
            if let Some(name) = non_empty(item.name.as_deref()) {
                recipes.insert(name, item);
            }
        }
        Self {
            recipes,
            expanding: Vec::new(),
        }
    }

    /// The recipe for `name`, unless it is already being expanded
    fn recipe(&self, name: &str) -> Option<&'a RawItem> {
        let recipe = self.recipes.get(name).copied()?;
        if self.expanding.iter().any(|n| n == name) {
            warn!("Recipe for '{}' refers back to itself, treating it as gathered", name);
            return None;
        }
        Some(recipe)
    }
}

/// Parse a JSON payload into a forest
pub fn load_tree(payload: &str) -> CraftResult<Forest> {
    load_named(payload, "payload")
}

/// Read and parse a JSON file into a forest
pub fn load_tree_file(path: &Path) -> CraftResult<Forest> {
    let payload = fs::read_to_string(path)
        .map_err(|e| CraftError::unavailable(path.display().to_string(), e))?;
    load_named(&payload, &path.display().to_string())
}

fn load_named(payload: &str, source_name: &str) -> CraftResult<Forest> {
    let raw: RawChildren =
        serde_json::from_str(payload).map_err(|e| CraftError::unavailable(source_name, e))?;

    let mut resolver = Resolver::new(&raw);
    let roots = build_children(&raw, 1.0, &mut resolver);

    debug!("Loaded {} root items from {}", roots.len(), source_name);
    Ok(Forest { roots })
}

/// Build a child collection; entries sharing a key collapse, the last one wins
fn build_children(
    raw: &RawChildren,
    parent_quantity: f64,
    resolver: &mut Resolver<'_>,
) -> Vec<CraftItem> {
    let mut children: IndexMap<String, CraftItem> = IndexMap::new();
    for (key, entry) in raw.entries() {
        let item = build_item(key, entry, parent_quantity, resolver);
        match children.entry(item.key.clone()) {
            Entry::Occupied(mut slot) => {
                warn!("Duplicate item '{}', keeping the last one", item.key);
                slot.insert(item);
            }
            Entry::Vacant(slot) => {
                slot.insert(item);
            }
        }
    }
    children.into_values().collect()
}

fn build_item(
    key: Option<&str>,
    entry: &RawEntry,
    parent_quantity: f64,
    resolver: &mut Resolver<'_>,
) -> CraftItem {
    let count;
    let raw = match entry {
        RawEntry::Count(quantity) => {
            count = RawItem {
                quantity: Some(Value::from(*quantity)),
                ..RawItem::default()
            };
            &count
        }
        RawEntry::Record(item) => item,
    };

    let key = key.and_then(|k| non_empty(Some(k)));
    let name = match (non_empty(raw.name.as_deref()), key.as_deref()) {
        (Some(name), _) => name,
        (None, Some(key)) => key.to_string(),
        _ => {
            warn!("Item without a name, showing it as '{}'", UNKNOWN_ITEM_NAME);
            UNKNOWN_ITEM_NAME.to_string()
        }
    };
    let key = key.unwrap_or_else(|| name.clone());

    let recipe = match raw.items {
        Some(_) => None,
        None => resolver.recipe(&name),
    };
    // fields on the item win over the recipe's
    let field = |pick: fn(&RawItem) -> Option<&str>| {
        non_empty(pick(raw)).or_else(|| recipe.and_then(|r| non_empty(pick(r))))
    };
    let number = |pick: fn(&RawItem) -> Option<&Value>, label: &str| {
        pick(raw)
            .and_then(|v| number_field(v, &name, label))
            .or_else(|| recipe.and_then(|r| pick(r)).and_then(|v| number_field(v, &name, label)))
    };

    let base_quantity = number(|r| r.quantity.as_ref(), "quantity").unwrap_or(1.0);
    let quantity = parent_quantity * base_quantity;

    let mut specialisations = raw.specialisations.clone();
    if let Some(tag) = non_empty(raw.specialisation.as_deref()) {
        specialisations.insert(0, tag);
    }

    let components = raw.items.as_ref().or_else(|| recipe.and_then(|r| r.items.as_ref()));
    let children = match components {
        Some(items) => {
            resolver.expanding.push(name.clone());
            let children = build_children(items, quantity, resolver);
            resolver.expanding.pop();
            children
        }
        None => Vec::new(),
    };

    CraftItem {
        key,
        base_quantity,
        quantity,
        rarity: field(|r| r.rarity.as_deref()).map(|r| r.to_lowercase()),
        source: field(|r| r.source.as_deref()),
        wiki: field(|r| r.wiki.as_deref()),
        crafting_cost: number(|r| r.crafting_cost.as_ref(), "crafting_cost"),
        sell_to_vendor: number(|r| r.sell_to_vendor.as_ref(), "sell_to_vendor"),
        buy_from_vendor: number(|r| r.buy_from_vendor.as_ref(), "buy_from_vendor"),
        specialisations,
        children,
        name,
    }
}

/// Read a numeric field leniently: numbers and numeric strings count,
/// anything else is ignored with a warning
fn number_field(value: &Value, item: &str, label: &str) -> Option<f64> {
    let parsed = match value {
        Value::Null => return None,
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed.filter(|v| v.is_finite()) {
        Some(v) => Some(v),
        None => {
            warn!("Ignoring {} {} of '{}'", label, value, item);
            None
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
