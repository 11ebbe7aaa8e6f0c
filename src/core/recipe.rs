//! Recipe business logic - the recipe aggregate.
//!
//! A recipe and its ingredient lines are validated and written as one unit. Validation
//! collects every problem in a single pass and reports them together. Writes happen in
//! one database transaction: a create never leaves a recipe without lines, and an
//! update replaces the whole ingredient set (delete all, insert new) so readers see
//! either the old set or the new one, never a mix or nothing.

use crate::{
    config::settings::RecipeLimits,
    core::{
        relation::{self, Favorites, ShoppingCart},
        user::{self, UserProfile},
    },
    entities::{
        CartItem, Favorite, Ingredient, MeasurementUnit, Recipe, RecipeIngredient, User,
        cart_item, favorite, ingredient, recipe, recipe_ingredient,
    },
    errors::{Error, Result, ValidationErrors},
};
use sea_orm::{
    ConnectionTrait, DatabaseConnection, QueryOrder, Set, TransactionTrait, prelude::*,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{info, instrument};

/// Longest accepted recipe name.
pub const MAX_NAME_LENGTH: usize = 256;

/// One requested (ingredient, amount) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct IngredientLine {
    /// Catalog ingredient id
    pub id: i64,
    pub amount: i32,
}

/// Input for [`create_recipe`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewRecipe {
    pub name: String,
    pub text: String,
    /// Reference handed out by the image storage
    pub image: String,
    pub cooking_time: i32,
    pub ingredients: Vec<IngredientLine>,
}

/// Input for [`update_recipe`]. Absent fields keep their value, except `ingredients`,
/// which is required on every update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipeUpdate {
    pub name: Option<String>,
    pub text: Option<String>,
    pub image: Option<String>,
    pub cooking_time: Option<i32>,
    pub ingredients: Option<Vec<IngredientLine>>,
}

/// One ingredient line joined with its catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeIngredientView {
    pub id: i64,
    pub name: String,
    pub measurement_unit: MeasurementUnit,
    pub amount: i32,
}

/// Full recipe as presented to a viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeDetail {
    pub id: i64,
    pub author: UserProfile,
    pub ingredients: Vec<RecipeIngredientView>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
}

/// Short form used in favorite/cart responses and subscription previews.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeSummary {
    pub id: i64,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

impl From<&recipe::Model> for RecipeSummary {
    fn from(recipe: &recipe::Model) -> Self {
        Self {
            id: recipe.id,
            name: recipe.name.clone(),
            image: recipe.image.clone(),
            cooking_time: recipe.cooking_time,
        }
    }
}

/// Listing filters. `is_favorited`/`is_in_shopping_cart` set to `true` restrict the
/// list to the viewer's favorites/cart; anonymous viewers then get nothing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipeFilter {
    pub author: Option<i64>,
    pub is_favorited: Option<bool>,
    pub is_in_shopping_cart: Option<bool>,
}

fn validate_name(errors: &mut ValidationErrors, name: &str) {
    if name.is_empty() {
        errors.add("name", "must not be empty");
    } else if name.chars().count() > MAX_NAME_LENGTH {
        errors.add("name", format!("must be at most {MAX_NAME_LENGTH} characters"));
    }
}

fn validate_non_empty(errors: &mut ValidationErrors, field: &str, value: &str) {
    if value.is_empty() {
        errors.add(field, "must not be empty");
    }
}

fn validate_cooking_time(errors: &mut ValidationErrors, cooking_time: i32, limits: &RecipeLimits) {
    if !(limits.min_cooking_time..=limits.max_cooking_time).contains(&cooking_time) {
        errors.add(
            "cooking_time",
            format!(
                "must be between {} and {} minutes",
                limits.min_cooking_time, limits.max_cooking_time
            ),
        );
    }
}

/// Checks a full set of ingredient lines, collecting every problem.
///
/// Reports an empty set, amounts outside the configured range, ingredient ids used
/// more than once and ids missing from the catalog. All lines are checked against
/// the catalog with one query.
pub async fn validate_ingredient_lines<C>(
    db: &C,
    lines: &[IngredientLine],
    limits: &RecipeLimits,
) -> Result<ValidationErrors>
where
    C: ConnectionTrait,
{
    let mut errors = ValidationErrors::new();
    if lines.is_empty() {
        errors.add("ingredients", "at least one ingredient is required");
        return Ok(errors);
    }

    let requested: Vec<i64> = lines.iter().map(|line| line.id).collect();
    let known: HashSet<i64> = Ingredient::find()
        .filter(ingredient::Column::Id.is_in(requested))
        .all(db)
        .await?
        .into_iter()
        .map(|i| i.id)
        .collect();

    let mut seen = HashSet::new();
    for (index, line) in lines.iter().enumerate() {
        if !seen.insert(line.id) {
            errors.add(
                format!("ingredients[{index}].id"),
                format!("duplicate ingredient {}", line.id),
            );
        } else if !known.contains(&line.id) {
            errors.add(
                format!("ingredients[{index}].id"),
                format!("unknown ingredient id {}", line.id),
            );
        }
        if !(limits.min_amount..=limits.max_amount).contains(&line.amount) {
            errors.add(
                format!("ingredients[{index}].amount"),
                format!(
                    "must be between {} and {}",
                    limits.min_amount, limits.max_amount
                ),
            );
        }
    }
    Ok(errors)
}

fn line_models(recipe_id: i64, lines: &[IngredientLine]) -> Vec<recipe_ingredient::ActiveModel> {
    lines
        .iter()
        .map(|line| recipe_ingredient::ActiveModel {
            recipe_id: Set(recipe_id),
            ingredient_id: Set(line.id),
            amount: Set(line.amount),
        })
        .collect()
}

async fn insert_lines<C>(db: &C, recipe_id: i64, lines: &[IngredientLine]) -> Result<()>
where
    C: ConnectionTrait,
{
    RecipeIngredient::insert_many(line_models(recipe_id, lines))
        .exec_without_returning(db)
        .await?;
    Ok(())
}

/// Retrieves a recipe row by its unique ID.
///
/// # Errors
/// Returns [`Error::NotFound`] if there is no such recipe.
pub async fn get_recipe_model<C>(db: &C, recipe_id: i64) -> Result<recipe::Model>
where
    C: ConnectionTrait,
{
    Recipe::find_by_id(recipe_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Recipe", recipe_id))
}

fn ensure_author(recipe: &recipe::Model, actor_id: i64) -> Result<()> {
    if recipe.author_id == actor_id {
        Ok(())
    } else {
        Err(Error::Permission {
            message: format!("only the author may modify recipe {}", recipe.id),
        })
    }
}

/// Creates a recipe together with its ingredient lines.
///
/// # Errors
/// Returns an error if:
/// - The author does not exist ([`Error::NotFound`])
/// - Any field or ingredient line is invalid ([`Error::Validation`], every problem listed)
/// - The database transaction fails; nothing is written in that case
#[instrument(skip(db, limits, new_recipe), fields(name = %new_recipe.name))]
pub async fn create_recipe(
    db: &DatabaseConnection,
    limits: &RecipeLimits,
    author_id: i64,
    new_recipe: NewRecipe,
) -> Result<recipe::Model> {
    User::find_by_id(author_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("User", author_id))?;

    let name = new_recipe.name.trim().to_string();
    let text = new_recipe.text.trim().to_string();
    let image = new_recipe.image.trim().to_string();

    let mut errors = ValidationErrors::new();
    validate_name(&mut errors, &name);
    validate_non_empty(&mut errors, "text", &text);
    validate_non_empty(&mut errors, "image", &image);
    validate_cooking_time(&mut errors, new_recipe.cooking_time, limits);
    errors.merge(validate_ingredient_lines(db, &new_recipe.ingredients, limits).await?);
    errors.into_result()?;

    // Use a transaction to ensure atomicity
    let txn = db.begin().await?;

    let created = recipe::ActiveModel {
        author_id: Set(author_id),
        name: Set(name),
        text: Set(text),
        image: Set(image),
        cooking_time: Set(new_recipe.cooking_time),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    insert_lines(&txn, created.id, &new_recipe.ingredients).await?;

    txn.commit().await?;
    info!(
        "Recipe {} created with {} ingredients",
        created.id,
        new_recipe.ingredients.len()
    );
    Ok(created)
}

/// Updates a recipe and replaces its whole ingredient set.
///
/// The author check runs before validation. Supplied fields are validated with the same
/// rules as [`create_recipe`]; the ingredient set is mandatory.
///
/// # Errors
/// Returns an error if:
/// - The recipe does not exist ([`Error::NotFound`])
/// - `actor_id` is not the author ([`Error::Permission`])
/// - Any supplied field or ingredient line is invalid, or lines are missing ([`Error::Validation`])
/// - The database transaction fails; the previous state is kept in that case
#[instrument(skip(db, limits, update))]
pub async fn update_recipe(
    db: &DatabaseConnection,
    limits: &RecipeLimits,
    actor_id: i64,
    recipe_id: i64,
    update: RecipeUpdate,
) -> Result<recipe::Model> {
    // Lookup, author check and writes share one transaction
    let txn = db.begin().await?;

    let existing = get_recipe_model(&txn, recipe_id).await?;
    ensure_author(&existing, actor_id)?;

    let name = update.name.as_deref().map(str::trim);
    let text = update.text.as_deref().map(str::trim);
    let image = update.image.as_deref().map(str::trim);

    let mut errors = ValidationErrors::new();
    if let Some(name) = name {
        validate_name(&mut errors, name);
    }
    if let Some(text) = text {
        validate_non_empty(&mut errors, "text", text);
    }
    if let Some(image) = image {
        validate_non_empty(&mut errors, "image", image);
    }
    if let Some(cooking_time) = update.cooking_time {
        validate_cooking_time(&mut errors, cooking_time, limits);
    }
    match &update.ingredients {
        Some(lines) => errors.merge(validate_ingredient_lines(&txn, lines, limits).await?),
        None => errors.add("ingredients", "this field is required"),
    }
    errors.into_result()?;
    let lines = update.ingredients.unwrap_or_default();

    let mut model: recipe::ActiveModel = existing.clone().into();
    let mut changed = false;
    if let Some(name) = name {
        model.name = Set(name.to_string());
        changed = true;
    }
    if let Some(text) = text {
        model.text = Set(text.to_string());
        changed = true;
    }
    if let Some(image) = image {
        model.image = Set(image.to_string());
        changed = true;
    }
    if let Some(cooking_time) = update.cooking_time {
        model.cooking_time = Set(cooking_time);
        changed = true;
    }
    let updated = if changed {
        model.update(&txn).await?
    } else {
        existing
    };

    RecipeIngredient::delete_many()
        .filter(recipe_ingredient::Column::RecipeId.eq(recipe_id))
        .exec(&txn)
        .await?;
    insert_lines(&txn, recipe_id, &lines).await?;

    txn.commit().await?;
    info!(
        "Recipe {} updated, ingredients replaced with {} lines",
        recipe_id,
        lines.len()
    );
    Ok(updated)
}

/// Deletes a recipe with its ingredient lines and every favorite and cart entry
/// pointing at it.
///
/// # Errors
/// Returns [`Error::NotFound`] if the recipe does not exist and [`Error::Permission`] if
/// `actor_id` is not the author.
#[instrument(skip(db))]
pub async fn delete_recipe(db: &DatabaseConnection, actor_id: i64, recipe_id: i64) -> Result<()> {
    let txn = db.begin().await?;

    let existing = get_recipe_model(&txn, recipe_id).await?;
    ensure_author(&existing, actor_id)?;

    RecipeIngredient::delete_many()
        .filter(recipe_ingredient::Column::RecipeId.eq(recipe_id))
        .exec(&txn)
        .await?;
    Favorite::delete_many()
        .filter(favorite::Column::RecipeId.eq(recipe_id))
        .exec(&txn)
        .await?;
    CartItem::delete_many()
        .filter(cart_item::Column::RecipeId.eq(recipe_id))
        .exec(&txn)
        .await?;
    existing.delete(&txn).await?;

    txn.commit().await?;
    info!("Recipe {} deleted", recipe_id);
    Ok(())
}

/// Retrieves a recipe's ingredient lines with their catalog data, ordered by name.
pub async fn get_recipe_ingredients<C>(db: &C, recipe_id: i64) -> Result<Vec<RecipeIngredientView>>
where
    C: ConnectionTrait,
{
    let rows = RecipeIngredient::find()
        .filter(recipe_ingredient::Column::RecipeId.eq(recipe_id))
        .find_also_related(Ingredient)
        .all(db)
        .await?;

    let mut lines: Vec<RecipeIngredientView> = rows
        .into_iter()
        .filter_map(|(line, ingredient)| {
            ingredient.map(|ingredient| RecipeIngredientView {
                id: ingredient.id,
                name: ingredient.name,
                measurement_unit: ingredient.measurement_unit,
                amount: line.amount,
            })
        })
        .collect();
    lines.sort_by(|a, b| {
        a.name
            .cmp(&b.name)
            .then_with(|| a.measurement_unit.cmp(&b.measurement_unit))
    });
    Ok(lines)
}

async fn recipe_detail<C>(db: &C, recipe: recipe::Model, viewer: Option<i64>) -> Result<RecipeDetail>
where
    C: ConnectionTrait,
{
    let author = user::get_user_model(db, recipe.author_id).await?;
    let (is_favorited, is_in_shopping_cart) = match viewer {
        Some(viewer_id) => (
            relation::contains::<Favorites, C>(db, viewer_id, recipe.id).await?,
            relation::contains::<ShoppingCart, C>(db, viewer_id, recipe.id).await?,
        ),
        None => (false, false),
    };

    Ok(RecipeDetail {
        id: recipe.id,
        author: user::profile_for(db, author, viewer).await?,
        ingredients: get_recipe_ingredients(db, recipe.id).await?,
        is_favorited,
        is_in_shopping_cart,
        name: recipe.name,
        image: recipe.image,
        text: recipe.text,
        cooking_time: recipe.cooking_time,
    })
}

/// Retrieves a recipe as seen by `viewer`.
///
/// # Errors
/// Returns [`Error::NotFound`] if there is no such recipe.
pub async fn get_recipe<C>(db: &C, recipe_id: i64, viewer: Option<i64>) -> Result<RecipeDetail>
where
    C: ConnectionTrait,
{
    let recipe = get_recipe_model(db, recipe_id).await?;
    recipe_detail(db, recipe, viewer).await
}

/// Lists recipes matching `filter`, newest first.
pub async fn list_recipes<C>(
    db: &C,
    filter: &RecipeFilter,
    viewer: Option<i64>,
) -> Result<Vec<RecipeDetail>>
where
    C: ConnectionTrait,
{
    let mut query = Recipe::find().order_by_desc(recipe::Column::Id);

    if let Some(author_id) = filter.author {
        query = query.filter(recipe::Column::AuthorId.eq(author_id));
    }
    if filter.is_favorited == Some(true) {
        let Some(viewer_id) = viewer else {
            return Ok(Vec::new());
        };
        query = query.filter(recipe::Column::Id.in_subquery(relation::target_ids::<Favorites>(viewer_id)));
    }
    if filter.is_in_shopping_cart == Some(true) {
        let Some(viewer_id) = viewer else {
            return Ok(Vec::new());
        };
        query = query.filter(
            recipe::Column::Id.in_subquery(relation::target_ids::<ShoppingCart>(viewer_id)),
        );
    }

    let recipes = query.all(db).await?;
    let mut details = Vec::with_capacity(recipes.len());
    for recipe in recipes {
        details.push(recipe_detail(db, recipe, viewer).await?);
    }
    Ok(details)
}
