//! Shopping list calculation for crafting trees

use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use crate::error::{CraftError, CraftResult};
use crate::models::{CraftItem, ItemIdentity, ShoppingLine, ShoppingList};

/// Parse a user-entered quantity
///
/// Accepts any finite, non-negative number; fractional amounts are valid
/// partial batches.
pub fn parse_quantity(input: &str) -> CraftResult<f64> {
    let trimmed = input.trim();
    let value: f64 = trimmed
        .parse()
        .map_err(|_| CraftError::InvalidQuantity(format!("'{}' is not a number", trimmed)))?;
    validate_requested(value)?;
    Ok(value)
}

fn validate_requested(value: f64) -> CraftResult<()> {
    if !value.is_finite() {
        return Err(CraftError::InvalidQuantity(format!("{} is not finite", value)));
    }
    if value < 0.0 {
        return Err(CraftError::InvalidQuantity(format!("{} is negative", value)));
    }
    Ok(())
}

/// Resolve an item at a requested quantity into everything needed to make it
///
/// Every descendant is scaled by `requested / item.quantity`, using the
/// quantities annotated on the tree at load time. Descendants with equal
/// identities are summed within their bucket. Costs only appear when some
/// item in the subtree carries one.
pub fn aggregate(item: &CraftItem, requested: f64) -> CraftResult<ShoppingList> {
    validate_requested(requested)?;
    if !(item.quantity > 0.0 && item.quantity.is_finite()) {
        return Err(CraftError::InvalidQuantity(format!(
            "{} has base quantity {}",
            item.name, item.quantity
        )));
    }

    let scale = requested / item.quantity;
    debug!("Aggregating {} x{} (scale {})", item.name, requested, scale);

    let mut gather: HashMap<ItemIdentity, f64> = HashMap::new();
    let mut craft: HashMap<ItemIdentity, f64> = HashMap::new();
    let mut crafting_cost = item.crafting_cost.map(|c| c * requested);
    let mut buy_from_vendor = None;

    for descendant in item.descendants() {
        let effective = descendant.quantity * scale;
        if descendant.is_leaf() {
            *gather.entry(descendant.identity()).or_default() += effective;
            if let Some(price) = descendant.buy_from_vendor {
                add_cost(&mut buy_from_vendor, effective * price);
            }
        } else {
            *craft.entry(descendant.identity()).or_default() += effective;
            if let Some(cost) = descendant.crafting_cost {
                add_cost(&mut crafting_cost, effective * cost);
            }
        }
    }

    Ok(ShoppingList {
        target_name: item.name.clone(),
        target_quantity: requested,
        gather: sorted_lines(gather),
        craft: sorted_lines(craft),
        crafting_cost,
        buy_from_vendor,
        sell_to_vendor: item.sell_to_vendor.map(|p| p * requested),
    })
}

fn add_cost(total: &mut Option<f64>, amount: f64) {
    *total = Some(total.unwrap_or(0.0) + amount);
}

fn sorted_lines(bucket: HashMap<ItemIdentity, f64>) -> Vec<ShoppingLine> {
    let mut lines: Vec<(String, ShoppingLine)> = bucket
        .into_iter()
        .map(|(item, quantity)| {
            let line = ShoppingLine { item, quantity };
            (line.to_string(), line)
        })
        .collect();
    lines.sort_by(|a, b| a.0.cmp(&b.0));
    lines.into_iter().map(|(_, line)| line).collect()
}

impl fmt::Display for ShoppingLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, " - {}: {}", self.item.name, self.quantity)?;
        if let Some(rarity) = &self.item.rarity {
            write!(f, ", rarity: {}", rarity)?;
        }
        if let Some(source) = &self.item.source {
            write!(f, ", source: {}", source)?;
        }
        if let Some(wiki) = &self.item.wiki {
            write!(f, ", wiki: {}", wiki)?;
        }
        Ok(())
    }
}

impl ShoppingList {
    /// Export in display order, as pretty JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for ShoppingList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "To craft:")?;
        writeln!(f, "{}: {}", self.target_name, self.target_quantity)?;
        writeln!(f)?;

        writeln!(f, "Gather these items:")?;
        for (i, line) in self.gather.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", line)?;
        }
        writeln!(f)?;
        writeln!(f)?;

        writeln!(f, "Craft these intermediate items:")?;
        for (i, line) in self.craft.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", line)?;
        }

        if let Some(cost) = self.crafting_cost {
            write!(f, "\n\nIt will cost a total of {} to craft the intermediate items.", cost)?;
        }
        if let Some(price) = self.buy_from_vendor {
            write!(f, "\n\nBuying the gathered items from a vendor costs {}.", price)?;
        }
        if let Some(price) = self.sell_to_vendor {
            write!(f, "\n\n{} sells to a vendor for {}.", self.target_name, price)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_tree;

    #[test]
    fn parse_quantity_accepts_fractions() {
        assert_eq!(parse_quantity(" 2.5 ").unwrap(), 2.5);
        assert_eq!(parse_quantity("0").unwrap(), 0.0);
    }

    #[test]
    fn parse_quantity_rejects_garbage() {
        for input in ["", "abc", "-1", "NaN", "inf"] {
            assert!(
                matches!(parse_quantity(input), Err(CraftError::InvalidQuantity(_))),
                "accepted {:?}",
                input
            );
        }
    }

    #[test]
    fn sword_text_output() {
        let forest = load_tree(
            r#"{"Sword": {"quantity": 1, "items": {"Iron": {"quantity": 3}, "Wood": {"quantity": 2}}}}"#,
        )
        .unwrap();
        let list = aggregate(&forest.roots[0], 2.0).unwrap();
        assert_eq!(
            list.to_string(),
            "To craft:\nSword: 2\n\nGather these items:\n - Iron: 6\n - Wood: 4\n\nCraft these intermediate items:\n"
        );
    }

    #[test]
    fn line_includes_optional_segments_in_order() {
        let line = ShoppingLine {
            item: ItemIdentity {
                name: "Ore".into(),
                rarity: Some("rare".into()),
                source: None,
                wiki: Some("https://wiki/ore".into()),
            },
            quantity: 1.5,
        };
        assert_eq!(line.to_string(), " - Ore: 1.5, rarity: rare, wiki: https://wiki/ore");
    }

    #[test]
    fn negative_request_is_rejected() {
        let forest = load_tree(r#"{"Sword": {"items": {"Iron": 1}}}"#).unwrap();
        assert!(matches!(
            aggregate(&forest.roots[0], -1.0),
            Err(CraftError::InvalidQuantity(_))
        ));
    }

    #[test]
    fn costs_scale_with_request() {
        let forest = load_tree(
            r#"{"Sword": {
                "crafting_cost": 10, "sell_to_vendor": 40,
                "items": {
                    "Ingot": {"quantity": 2, "crafting_cost": 3, "items": {"Ore": {"quantity": 2, "buy_from_vendor": 1.5}}},
                    "Wood": {"quantity": 1}
                }
            }}"#,
        )
        .unwrap();
        let list = aggregate(&forest.roots[0], 2.0).unwrap();

        // Sword 10 x2, Ingot 3 x4
        assert_eq!(list.crafting_cost, Some(32.0));
        // Ore 8 x1.5; Wood has no price
        assert_eq!(list.buy_from_vendor, Some(12.0));
        assert_eq!(list.sell_to_vendor, Some(80.0));
        assert!(list.to_string().ends_with(
            "\n\nIt will cost a total of 32 to craft the intermediate items.\
             \n\nBuying the gathered items from a vendor costs 12.\
             \n\nSword sells to a vendor for 80."
        ));
    }

    #[test]
    fn no_costs_without_priced_items() {
        let forest = load_tree(r#"{"Sword": {"items": {"Iron": 3}}}"#).unwrap();
        let list = aggregate(&forest.roots[0], 1.0).unwrap();
        assert_eq!(list.crafting_cost, None);
        assert_eq!(list.buy_from_vendor, None);
        assert_eq!(list.sell_to_vendor, None);
    }

    #[test]
    fn large_quantities_print_without_exponent() {
        let line = ShoppingLine {
            item: ItemIdentity {
                name: "Sand".into(),
                rarity: None,
                source: None,
                wiki: None,
            },
            quantity: 1e21,
        };
        assert_eq!(line.to_string(), " - Sand: 1000000000000000000000");
    }
}
