//! Ingredient catalog business logic.
//!
//! The catalog is a shared, read-mostly list of (name, unit) pairs. Entries are added
//! by the bootstrap seeding or by [`add_ingredient`]; recipes only reference them.

use crate::{
    config::catalog::CatalogEntry,
    entities::{Ingredient, MeasurementUnit, ingredient},
    errors::{Error, Result},
};
use sea_orm::{
    ConnectionTrait, QueryOrder, SqlErr, TransactionTrait, prelude::*, sea_query::LikeExpr,
};
use tracing::{info, instrument};

/// Retrieves the catalog, optionally restricted to names starting with `prefix`,
/// ordered alphabetically by name.
///
/// Matching ignores case (Unicode lowercase) and treats `%`, `_` and `\` in the prefix
/// literally. A blank prefix returns the whole catalog.
pub async fn search_ingredients<C>(db: &C, prefix: Option<&str>) -> Result<Vec<ingredient::Model>>
where
    C: ConnectionTrait,
{
    let mut query = Ingredient::find();
    if let Some(prefix) = prefix.map(str::trim).filter(|p| !p.is_empty()) {
        let pattern = format!("{}%", escape_like(&ingredient::search_key(prefix)));
        query = query.filter(
            ingredient::Column::SearchName.like(LikeExpr::new(pattern).escape('\\')),
        );
    }
    query
        .order_by_asc(ingredient::Column::Name)
        .order_by_asc(ingredient::Column::MeasurementUnit)
        .all(db)
        .await
        .map_err(Into::into)
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Retrieves a catalog entry by its unique ID.
///
/// # Errors
/// Returns [`Error::NotFound`] if there is no such ingredient.
pub async fn get_ingredient<C>(db: &C, ingredient_id: i64) -> Result<ingredient::Model>
where
    C: ConnectionTrait,
{
    Ingredient::find_by_id(ingredient_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Ingredient", ingredient_id))
}

/// Finds the catalog entry with exactly this (name, unit) pair.
pub async fn find_ingredient<C>(
    db: &C,
    name: &str,
    unit: MeasurementUnit,
) -> Result<Option<ingredient::Model>>
where
    C: ConnectionTrait,
{
    Ingredient::find()
        .filter(ingredient::Column::Name.eq(name))
        .filter(ingredient::Column::MeasurementUnit.eq(unit))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Adds a new ingredient to the catalog.
///
/// # Errors
/// Returns an error if:
/// - The name is empty or whitespace-only
/// - An ingredient with the same name and unit already exists
/// - The database insert fails
pub async fn add_ingredient<C>(
    db: &C,
    name: &str,
    unit: MeasurementUnit,
) -> Result<ingredient::Model>
where
    C: ConnectionTrait,
{
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::validation("name", "must not be empty"));
    }

    if find_ingredient(db, name, unit).await?.is_some() {
        return Err(duplicate_ingredient(name, unit));
    }

    ingredient::ActiveModel::new_entry(name, unit)
        .insert(db).await.map_err(|err| match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => duplicate_ingredient(name, unit),
        _ => err.into(),
    })
}

fn duplicate_ingredient(name: &str, unit: MeasurementUnit) -> Error {
    Error::Conflict {
        entity: format!("Ingredient {name} ({unit})"),
    }
}

/// Inserts every catalog entry that is not present yet, in one transaction.
///
/// Returns the number of inserted entries; seeding twice inserts nothing the second time.
#[instrument(skip(db, entries), fields(entries = entries.len()))]
pub async fn seed_catalog(db: &DatabaseConnection, entries: &[CatalogEntry]) -> Result<usize> {
    let txn = db.begin().await?;
    let mut inserted = 0;
    for entry in entries {
        let name = entry.name.trim();
        if name.is_empty() || find_ingredient(&txn, name, entry.measurement_unit).await?.is_some() {
            continue;
        }
        ingredient::ActiveModel::new_entry(name, entry.measurement_unit)
            .insert(&txn)
            .await?;
        inserted += 1;
    }
    txn.commit().await?;
    info!("Seeded {} new ingredients", inserted);
    Ok(inserted)
}
