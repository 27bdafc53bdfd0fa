//! Interactive state of a rendered crafting tree
//!
//! Each item row is collapsed or expanded and carries the quantity the user
//! asked for. Craftable rows own an output slot holding the shopping list
//! for that quantity, recomputed on every change.

use std::collections::HashMap;
use std::fmt::Write;

use tracing::debug;

use crate::calculator::{aggregate, parse_quantity};
use crate::error::{CraftError, CraftResult};
use crate::models::{CraftItem, Forest, ShoppingList};

#[derive(Debug, Clone, PartialEq)]
pub enum OutputSlot {
    Empty,
    Ready(ShoppingList),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowState {
    pub expanded: bool,
    pub quantity: f64,
    pub output: OutputSlot,
}

pub struct TreeView {
    forest: Forest,
    rows: HashMap<String, RowState>,
}

impl TreeView {
    pub fn new(forest: Forest) -> Self {
        let mut rows = HashMap::new();
        forest.walk(|path, item, _| {
            rows.insert(
                path.to_string(),
                RowState {
                    expanded: false,
                    quantity: item.quantity,
                    output: OutputSlot::Empty,
                },
            );
        });
        Self { forest, rows }
    }

    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    pub fn row(&self, path: &str) -> Option<&RowState> {
        self.rows.get(path)
    }

    fn item(&self, path: &str) -> CraftResult<&CraftItem> {
        self.forest
            .find(path)
            .ok_or_else(|| CraftError::UnknownNode(path.to_string()))
    }

    /// Flip a craftable row between collapsed and expanded
    ///
    /// Returns the new expanded state; leaves never expand.
    pub fn toggle(&mut self, path: &str) -> CraftResult<bool> {
        let expandable = !self.item(path)?.is_leaf();
        let row = self
            .rows
            .get_mut(path)
            .ok_or_else(|| CraftError::UnknownNode(path.to_string()))?;
        if expandable {
            row.expanded = !row.expanded;
        }
        Ok(row.expanded)
    }

    pub fn expand_all(&mut self) {
        let forest = &self.forest;
        let rows = &mut self.rows;
        forest.walk(|path, item, _| {
            if let Some(row) = rows.get_mut(path) {
                row.expanded = !item.is_leaf();
            }
        });
    }

    /// Apply user input to a row's quantity
    ///
    /// Invalid input keeps the previous quantity and reports the problem in
    /// the row's own output slot.
    pub fn set_quantity(&mut self, path: &str, input: &str) -> CraftResult<()> {
        self.item(path)?;
        match parse_quantity(input) {
            Ok(quantity) => {
                if let Some(row) = self.rows.get_mut(path) {
                    row.quantity = quantity;
                }
                self.refresh(path);
                Ok(())
            }
            Err(e) => {
                if let Some(row) = self.rows.get_mut(path) {
                    row.output = OutputSlot::Failed(e.to_string());
                }
                Err(e)
            }
        }
    }

    /// Plus/minus buttons; quantities never drop below zero
    pub fn step_quantity(&mut self, path: &str, delta: i64) -> CraftResult<()> {
        let current = self
            .rows
            .get(path)
            .ok_or_else(|| CraftError::UnknownNode(path.to_string()))?
            .quantity;
        let next = (current.trunc() + delta as f64).max(0.0);
        self.set_quantity(path, &next.to_string())
    }

    /// Recompute one row's output; ancestors keep theirs until edited
    fn refresh(&mut self, path: &str) {
        let Some(item) = self.forest.find(path) else {
            return;
        };
        let Some(row) = self.rows.get_mut(path) else {
            return;
        };
        if item.is_leaf() {
            return;
        }
        row.output = match aggregate(item, row.quantity) {
            Ok(list) => OutputSlot::Ready(list),
            Err(e) => OutputSlot::Failed(e.to_string()),
        };
        debug!("Refreshed output for {}", path);
    }

    /// Text rendering: visible rows indented by depth, output under expanded rows
    pub fn render(&self) -> String {
        let mut out = String::new();
        for root in &self.forest.roots {
            self.render_row(&mut out, root, &root.key, 0);
        }
        out
    }

    fn render_row(&self, out: &mut String, item: &CraftItem, path: &str, depth: usize) {
        let Some(row) = self.rows.get(path) else {
            return;
        };
        let indent = "    ".repeat(depth);
        let icon = match (item.is_leaf(), row.expanded) {
            (true, _) => ' ',
            (false, true) => '-',
            (false, false) => '+',
        };
        let _ = write!(out, "{}{} {}: {}", indent, icon, item.name, row.quantity);
        if let Some(rarity) = &item.rarity {
            let _ = write!(out, " [{}]", rarity);
        }
        out.push('\n');

        if !row.expanded {
            return;
        }
        match &row.output {
            OutputSlot::Empty => {}
            OutputSlot::Ready(list) => {
                for line in list.to_string().lines() {
                    let _ = writeln!(out, "{}  | {}", indent, line);
                }
            }
            OutputSlot::Failed(message) => {
                let _ = writeln!(out, "{}  ! {}", indent, message);
            }
        }
        for child in &item.children {
            self.render_row(out, child, &format!("{}/{}", path, child.key), depth + 1);
        }
    }
}
