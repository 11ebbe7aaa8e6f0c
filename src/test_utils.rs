//! Shared test utilities for the recipe backend.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    config::settings::RecipeLimits,
    core::{
        ingredient,
        recipe::{self, IngredientLine, NewRecipe},
        user::{self, NewUser},
    },
    entities::{self, MeasurementUnit},
    errors::Result,
};
use sea_orm::DatabaseConnection;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Registers a test user.
///
/// # Defaults
/// * `email`: `"{username}@example.com"`
/// * `first_name` / `last_name`: `"Test"` / `"User"`
pub async fn create_test_user(
    db: &DatabaseConnection,
    username: &str,
) -> Result<entities::user::Model> {
    user::register_user(
        db,
        NewUser {
            email: format!("{username}@example.com"),
            username: username.to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
        },
    )
    .await
}

/// Adds a catalog ingredient.
pub async fn create_test_ingredient(
    db: &DatabaseConnection,
    name: &str,
    unit: MeasurementUnit,
) -> Result<entities::ingredient::Model> {
    ingredient::add_ingredient(db, name, unit).await
}

/// Creates a test recipe from `(ingredient_id, amount)` pairs.
///
/// # Defaults
/// * `text`: `"Test instructions"`
/// * `image`: `"recipes/images/test.png"`
/// * `cooking_time`: 30
/// * limits: [`RecipeLimits::default`]
pub async fn create_test_recipe(
    db: &DatabaseConnection,
    author_id: i64,
    name: &str,
    ingredients: &[(i64, i32)],
) -> Result<entities::recipe::Model> {
    recipe::create_recipe(
        db,
        &RecipeLimits::default(),
        author_id,
        NewRecipe {
            name: name.to_string(),
            text: "Test instructions".to_string(),
            image: "recipes/images/test.png".to_string(),
            cooking_time: 30,
            ingredients: ingredients
                .iter()
                .map(|&(id, amount)| IngredientLine { id, amount })
                .collect(),
        },
    )
    .await
}

/// Sets up a test environment with one user named `alice`.
/// Returns (db, user).
pub async fn setup_with_user() -> Result<(DatabaseConnection, entities::user::Model)> {
    let db = setup_test_db().await?;
    let user = create_test_user(&db, "alice").await?;
    Ok((db, user))
}

/// Sets up a test environment with a user and one recipe of theirs.
/// The recipe uses a single `Flour (g)` line of 500.
/// Returns (db, author, recipe).
pub async fn setup_with_recipe() -> Result<(
    DatabaseConnection,
    entities::user::Model,
    entities::recipe::Model,
)> {
    let (db, author) = setup_with_user().await?;
    let flour = create_test_ingredient(&db, "Flour", MeasurementUnit::Grams).await?;
    let recipe = create_test_recipe(&db, author.id, "Bread", &[(flour.id, 500)]).await?;
    Ok((db, author, recipe))
}
