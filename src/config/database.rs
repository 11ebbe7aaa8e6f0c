//! Database configuration module.
//!
//! This module handles the database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the schema always matches the Rust structs. The only hand-written statement is the
//! unique index over an ingredient's (name, measurement unit) pair, which a single-column
//! `unique` attribute cannot express.

use crate::entities::{
    CartItem, Favorite, Follow, Ingredient, Recipe, RecipeIngredient, User, ingredient,
};
use crate::errors::Result;
use sea_orm::sea_query::Index;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use tracing::{debug, info, instrument};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/foodgram.sqlite?mode=rwc";

/// Name of the unique index over `ingredients(name, measurement_unit)`.
pub const INGREDIENT_IDENTITY_INDEX: &str = "idx_ingredients_name_unit";

/// Gets the database URL from environment variable or returns default `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database named by `DATABASE_URL`.
///
/// Falls back to a local `SQLite` file if no environment variable is set.
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    debug!("Connecting to database at {}", database_url);
    Database::connect(&database_url).await.map_err(Into::into)
}

async fn create_table<C, E>(db: &C, schema: &Schema, entity: E) -> Result<()>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

/// Creates all tables and indexes if they do not exist yet.
///
/// Referenced tables are created before the tables that point at them.
#[instrument(skip(db))]
pub async fn create_tables<C>(db: &C) -> Result<()>
where
    C: ConnectionTrait,
{
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    create_table(db, &schema, User).await?;
    create_table(db, &schema, Ingredient).await?;
    create_table(db, &schema, Recipe).await?;
    create_table(db, &schema, RecipeIngredient).await?;
    create_table(db, &schema, Favorite).await?;
    create_table(db, &schema, CartItem).await?;
    create_table(db, &schema, Follow).await?;

    let identity_index = Index::create()
        .name(INGREDIENT_IDENTITY_INDEX)
        .table(Ingredient)
        .col(ingredient::Column::Name)
        .col(ingredient::Column::MeasurementUnit)
        .unique()
        .if_not_exists()
        .to_owned();
    db.execute(builder.build(&identity_index)).await?;

    info!("Database schema is in place");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{
        cart_item, favorite, follow, ingredient::MeasurementUnit, recipe, recipe_ingredient, user,
    };
    use sea_orm::{ActiveModelTrait, QuerySelect};

    #[tokio::test]
    async fn test_create_tables() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        // Test that tables exist by querying them
        let _: Vec<user::Model> = User::find().limit(1).all(&db).await?;
        let _: Vec<ingredient::Model> = Ingredient::find().limit(1).all(&db).await?;
        let _: Vec<recipe::Model> = Recipe::find().limit(1).all(&db).await?;
        let _: Vec<recipe_ingredient::Model> = RecipeIngredient::find().limit(1).all(&db).await?;
        let _: Vec<favorite::Model> = Favorite::find().limit(1).all(&db).await?;
        let _: Vec<cart_item::Model> = CartItem::find().limit(1).all(&db).await?;
        let _: Vec<follow::Model> = Follow::find().limit(1).all(&db).await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_create_tables_is_repeatable() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;
        create_tables(&db).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_ingredient_identity_index_rejects_duplicates() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        let flour = ingredient::ActiveModel::new_entry("Flour", MeasurementUnit::Grams);
        flour.clone().insert(&db).await?;
        assert!(flour.insert(&db).await.is_err());

        // Same name with another unit is a different catalog entry
        ingredient::ActiveModel::new_entry("Flour", MeasurementUnit::Glass)
            .insert(&db)
            .await?;

        Ok(())
    }
}
