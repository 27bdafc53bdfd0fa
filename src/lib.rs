//! Crafting calculator
//!
//! Loads crafting trees from JSON and turns any item of a tree into a
//! shopping list of items to gather and intermediate items to craft.

pub mod calculator;
pub mod catalog;
pub mod db;
pub mod error;
pub mod loader;
pub mod models;
pub mod view;

pub use calculator::{aggregate, parse_quantity};
pub use error::{CraftError, CraftResult};
pub use loader::{load_tree, load_tree_file};
pub use models::{CraftItem, Forest, ItemIdentity, ShoppingLine, ShoppingList};
