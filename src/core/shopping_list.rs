//! Shopping list business logic - sums the ingredients of every recipe in a cart.
//!
//! Lines are grouped by (ingredient name, measurement unit). The same name in two
//! different units stays two separate entries.

use crate::{
    core::relation::{self, ShoppingCart},
    entities::{Ingredient, MeasurementUnit, RecipeIngredient, recipe_ingredient},
    errors::{Error, Result},
};
use sea_orm::{ConnectionTrait, prelude::*};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// Header line of the rendered list.
pub const SHOPPING_LIST_HEADER: &str = "SHOPPING LIST";

/// Total amount of one ingredient across the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShoppingListItem {
    pub name: String,
    pub measurement_unit: MeasurementUnit,
    pub total: i64,
}

/// Sums `(name, unit, amount)` lines into items ordered by name, then unit.
pub fn aggregate<I>(lines: I) -> Vec<ShoppingListItem>
where
    I: IntoIterator<Item = (String, MeasurementUnit, i32)>,
{
    let mut totals: BTreeMap<(String, MeasurementUnit), i64> = BTreeMap::new();
    for (name, unit, amount) in lines {
        *totals.entry((name, unit)).or_insert(0) += i64::from(amount);
    }
    totals
        .into_iter()
        .map(|((name, measurement_unit), total)| ShoppingListItem {
            name,
            measurement_unit,
            total,
        })
        .collect()
}

/// Computes the shopping list for `user_id`'s cart.
///
/// Every recipe has at least one ingredient line, so a cart without lines is an
/// empty cart. Lines are read with a single query.
///
/// # Errors
/// Returns [`Error::EmptyCart`] if the cart holds no recipes.
#[instrument(skip(db))]
pub async fn compute_shopping_list<C>(db: &C, user_id: i64) -> Result<Vec<ShoppingListItem>>
where
    C: ConnectionTrait,
{
    let rows = RecipeIngredient::find()
        .filter(
            recipe_ingredient::Column::RecipeId
                .in_subquery(relation::target_ids::<ShoppingCart>(user_id)),
        )
        .find_also_related(Ingredient)
        .all(db)
        .await?;
    if rows.is_empty() {
        return Err(Error::EmptyCart);
    }

    let rows_len = rows.len();
    let items = aggregate(rows.into_iter().filter_map(|(line, ingredient)| {
        ingredient.map(|i| (i.name, i.measurement_unit, line.amount))
    }));
    debug!(
        "Shopping list for user {}: {} lines, {} items",
        user_id,
        rows_len,
        items.len()
    );
    Ok(items)
}

/// Renders items as the downloadable plain-text list.
#[must_use]
pub fn render_shopping_list(items: &[ShoppingListItem]) -> String {
    let lines: String = items
        .iter()
        .map(|item| format!("• {} ({}) — {}\n", item.name, item.measurement_unit, item.total))
        .collect();
    format!("{SHOPPING_LIST_HEADER}\n\n{lines}")
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_shopping_list_sums_across_recipes() -> Result<()> {
        let (db, user) = setup_with_user().await?;
        let flour = create_test_ingredient(&db, "Flour", MeasurementUnit::Grams).await?;
        let salt = create_test_ingredient(&db, "Salt", MeasurementUnit::Grams).await?;
        let sugar = create_test_ingredient(&db, "Sugar", MeasurementUnit::Grams).await?;

        let bread =
            create_test_recipe(&db, user.id, "Bread", &[(flour.id, 500), (salt.id, 10)]).await?;
        let cake =
            create_test_recipe(&db, user.id, "Cake", &[(flour.id, 300), (sugar.id, 200)]).await?;
        relation::add::<ShoppingCart, _>(&db, user.id, bread.id).await?;
        relation::add::<ShoppingCart, _>(&db, user.id, cake.id).await?;

        let items = compute_shopping_list(&db, user.id).await?;
        let totals: Vec<(&str, i64)> = items.iter().map(|i| (i.name.as_str(), i.total)).collect();
        assert_eq!(totals, vec![("Flour", 800), ("Salt", 10), ("Sugar", 200)]);

        assert_eq!(
            render_shopping_list(&items),
            "SHOPPING LIST\n\n• Flour (g) — 800\n• Salt (g) — 10\n• Sugar (g) — 200\n"
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_only_cart_recipes_are_counted() -> Result<()> {
        let (db, user) = setup_with_user().await?;
        let other = create_test_user(&db, "other").await?;
        let flour = create_test_ingredient(&db, "Flour", MeasurementUnit::Grams).await?;

        let mine = create_test_recipe(&db, user.id, "Bread", &[(flour.id, 500)]).await?;
        let theirs = create_test_recipe(&db, user.id, "Pie", &[(flour.id, 250)]).await?;
        relation::add::<ShoppingCart, _>(&db, user.id, mine.id).await?;
        relation::add::<ShoppingCart, _>(&db, other.id, theirs.id).await?;

        let items = compute_shopping_list(&db, user.id).await?;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].total, 500);
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_cart_is_an_error() -> Result<()> {
        let (db, user) = setup_with_user().await?;
        let result = compute_shopping_list(&db, user.id).await;
        assert!(matches!(result, Err(Error::EmptyCart)));
        Ok(())
    }

    #[tokio::test]
    async fn test_emptied_cart_is_an_error() -> Result<()> {
        let (db, user, recipe) = setup_with_recipe().await?;
        relation::add::<ShoppingCart, _>(&db, user.id, recipe.id).await?;
        assert_eq!(compute_shopping_list(&db, user.id).await?.len(), 1);

        relation::remove::<ShoppingCart, _>(&db, user.id, recipe.id).await?;
        let result = compute_shopping_list(&db, user.id).await;
        assert!(matches!(result, Err(Error::EmptyCart)));
        Ok(())
    }

    #[test]
    fn test_same_name_different_units_stay_separate() {
        let items = aggregate(vec![
            ("Salt".to_string(), MeasurementUnit::Grams, 5),
            ("Salt".to_string(), MeasurementUnit::Pinch, 1),
            ("Salt".to_string(), MeasurementUnit::Grams, 7),
            ("Apple".to_string(), MeasurementUnit::Piece, 3),
        ]);
        assert_eq!(
            items,
            vec![
                ShoppingListItem {
                    name: "Apple".to_string(),
                    measurement_unit: MeasurementUnit::Piece,
                    total: 3,
                },
                ShoppingListItem {
                    name: "Salt".to_string(),
                    measurement_unit: MeasurementUnit::Grams,
                    total: 12,
                },
                ShoppingListItem {
                    name: "Salt".to_string(),
                    measurement_unit: MeasurementUnit::Pinch,
                    total: 1,
                },
            ]
        );
    }

    #[test]
    fn test_totals_do_not_overflow_amount_type() {
        let items = aggregate(vec![
            ("Water".to_string(), MeasurementUnit::Milliliters, i32::MAX),
            ("Water".to_string(), MeasurementUnit::Milliliters, i32::MAX),
        ]);
        assert_eq!(items[0].total, 2 * i64::from(i32::MAX));
    }

    #[test]
    fn test_render_empty_items() {
        assert_eq!(render_shopping_list(&[]), "SHOPPING LIST\n\n");
    }
}
