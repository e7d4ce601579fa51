//! Shopping list rendering

use crate::models::ShoppingListItem;

/// Render aggregated items as `"{name} - {total} {unit}"` lines joined
/// with `\n`. An empty list renders as an empty string.
pub fn render_shopping_list(items: &[ShoppingListItem]) -> String {
    items
        .iter()
        .map(|item| format!("{} - {} {}", item.name, item.total, item.measurement_unit))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, unit: &str, total: i64) -> ShoppingListItem {
        ShoppingListItem {
            name: name.to_string(),
            measurement_unit: unit.to_string(),
            total,
        }
    }

    #[test]
    fn test_render_lines() {
        let text = render_shopping_list(&[item("Флора", "g", 200), item("мука", "г", 300)]);
        assert_eq!(text, "Флора - 200 g\nмука - 300 г");
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render_shopping_list(&[]), "");
    }
}
