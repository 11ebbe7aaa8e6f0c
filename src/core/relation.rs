//! User relation sets - favorites, shopping cart and subscriptions.
//!
//! All three are pairings of an acting user with a target (a recipe or another user),
//! unique per pair. They share one implementation: each relation is a marker type
//! implementing [`RelationSet`], and the operations are generic over it.
//!
//! ```ignore
//! relation::add::<Favorites, _>(&db, user_id, recipe_id).await?;
//! let cart = relation::list::<ShoppingCart, _>(&db, user_id).await?;
//! ```

use crate::{
    entities::{cart_item, favorite, follow, recipe, user},
    errors::{Error, Result},
};
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, QueryOrder, Select, Set, SqlErr, prelude::*,
    sea_query::{Query, SelectStatement},
};
use tracing::{debug, instrument};

/// Describes one user-initiated many-to-many relation.
pub trait RelationSet {
    /// Join table entity storing the pairs
    type Entity: EntityTrait;
    /// Entity the pairs point at
    type Target: EntityTrait;
    /// Active model used to insert a pair
    type ActiveModel: ActiveModelTrait<Entity = Self::Entity> + Send;

    /// Name used in error messages, e.g. `"Favorite"`
    const NAME: &'static str;
    /// Name of the target entity, e.g. `"Recipe"`
    const TARGET_NAME: &'static str;
    /// Input field that names the target
    const TARGET_FIELD: &'static str;
    /// Whether a user may pair with themselves
    const ALLOWS_SELF: bool = true;

    /// Join-table column holding the acting user's id
    fn actor_column() -> <Self::Entity as EntityTrait>::Column;
    /// Join-table column holding the target's id
    fn target_column() -> <Self::Entity as EntityTrait>::Column;
    /// Primary key column of the target entity
    fn target_id_column() -> <Self::Target as EntityTrait>::Column;
    /// Builds the row pairing `actor_id` with `target_id`
    fn entry(actor_id: i64, target_id: i64) -> Self::ActiveModel;
}

/// Recipes a user marked as favorite.
#[derive(Debug, Clone, Copy)]
pub struct Favorites;

impl RelationSet for Favorites {
    type Entity = favorite::Entity;
    type Target = recipe::Entity;
    type ActiveModel = favorite::ActiveModel;

    const NAME: &'static str = "Favorite";
    const TARGET_NAME: &'static str = "Recipe";
    const TARGET_FIELD: &'static str = "recipe";

    fn actor_column() -> favorite::Column {
        favorite::Column::UserId
    }

    fn target_column() -> favorite::Column {
        favorite::Column::RecipeId
    }

    fn target_id_column() -> recipe::Column {
        recipe::Column::Id
    }

    fn entry(actor_id: i64, target_id: i64) -> favorite::ActiveModel {
        favorite::ActiveModel {
            user_id: Set(actor_id),
            recipe_id: Set(target_id),
        }
    }
}

/// Recipes a user put in the shopping cart.
#[derive(Debug, Clone, Copy)]
pub struct ShoppingCart;

impl RelationSet for ShoppingCart {
    type Entity = cart_item::Entity;
    type Target = recipe::Entity;
    type ActiveModel = cart_item::ActiveModel;

    const NAME: &'static str = "Shopping cart entry";
    const TARGET_NAME: &'static str = "Recipe";
    const TARGET_FIELD: &'static str = "recipe";

    fn actor_column() -> cart_item::Column {
        cart_item::Column::UserId
    }

    fn target_column() -> cart_item::Column {
        cart_item::Column::RecipeId
    }

    fn target_id_column() -> recipe::Column {
        recipe::Column::Id
    }

    fn entry(actor_id: i64, target_id: i64) -> cart_item::ActiveModel {
        cart_item::ActiveModel {
            user_id: Set(actor_id),
            recipe_id: Set(target_id),
        }
    }
}

/// Authors a user is subscribed to.
#[derive(Debug, Clone, Copy)]
pub struct Subscriptions;

impl RelationSet for Subscriptions {
    type Entity = follow::Entity;
    type Target = user::Entity;
    type ActiveModel = follow::ActiveModel;

    const NAME: &'static str = "Subscription";
    const TARGET_NAME: &'static str = "User";
    const TARGET_FIELD: &'static str = "author";
    const ALLOWS_SELF: bool = false;

    fn actor_column() -> follow::Column {
        follow::Column::UserId
    }

    fn target_column() -> follow::Column {
        follow::Column::AuthorId
    }

    fn target_id_column() -> user::Column {
        user::Column::Id
    }

    fn entry(actor_id: i64, target_id: i64) -> follow::ActiveModel {
        follow::ActiveModel {
            user_id: Set(actor_id),
            author_id: Set(target_id),
        }
    }
}

fn conflict<R: RelationSet>() -> Error {
    Error::Conflict {
        entity: R::NAME.to_string(),
    }
}

/// Returns true if `actor_id` is paired with `target_id`.
pub async fn contains<R, C>(db: &C, actor_id: i64, target_id: i64) -> Result<bool>
where
    R: RelationSet,
    C: ConnectionTrait,
{
    let entry = <R::Entity as EntityTrait>::find()
        .filter(R::actor_column().eq(actor_id))
        .filter(R::target_column().eq(target_id))
        .one(db)
        .await?;
    Ok(entry.is_some())
}

/// Pairs `actor_id` with `target_id` and returns the target.
///
/// # Errors
/// Returns an error if:
/// - The target does not exist ([`Error::NotFound`])
/// - The relation forbids self-pairing and `actor_id == target_id` ([`Error::Validation`])
/// - The pair already exists, including when a concurrent add won the race ([`Error::Conflict`])
#[instrument(skip(db), fields(relation = R::NAME))]
pub async fn add<R, C>(
    db: &C,
    actor_id: i64,
    target_id: i64,
) -> Result<<R::Target as EntityTrait>::Model>
where
    R: RelationSet,
    C: ConnectionTrait,
{
    let target = <R::Target as EntityTrait>::find()
        .filter(R::target_id_column().eq(target_id))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found(R::TARGET_NAME, target_id))?;

    if !R::ALLOWS_SELF && actor_id == target_id {
        return Err(Error::validation(
            R::TARGET_FIELD,
            format!("{} to yourself is not allowed", R::NAME),
        ));
    }

    if contains::<R, C>(db, actor_id, target_id).await? {
        return Err(conflict::<R>());
    }

    let inserted = <R::Entity as EntityTrait>::insert(R::entry(actor_id, target_id))
        .exec(db)
        .await;
    if let Err(err) = inserted {
        // The store's uniqueness constraint catches a concurrent add of the same pair
        if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
            || contains::<R, C>(db, actor_id, target_id).await?
        {
            return Err(conflict::<R>());
        }
        return Err(err.into());
    }

    debug!("{} {} -> {} added", R::NAME, actor_id, target_id);
    Ok(target)
}

/// Removes the pair of `actor_id` and `target_id`.
///
/// # Errors
/// Returns [`Error::NotFound`] if the pair does not exist, so only the first of two
/// identical removals succeeds.
#[instrument(skip(db), fields(relation = R::NAME))]
pub async fn remove<R, C>(db: &C, actor_id: i64, target_id: i64) -> Result<()>
where
    R: RelationSet,
    C: ConnectionTrait,
{
    let result = <R::Entity as EntityTrait>::delete_many()
        .filter(R::actor_column().eq(actor_id))
        .filter(R::target_column().eq(target_id))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(Error::NotFound {
            entity: R::NAME,
            id: format!("{actor_id} -> {target_id}"),
        });
    }
    debug!("{} {} -> {} removed", R::NAME, actor_id, target_id);
    Ok(())
}

/// Sub-select of the target ids paired with `actor_id`, for use with `in_subquery`.
#[must_use]
pub fn target_ids<R: RelationSet>(actor_id: i64) -> SelectStatement {
    Query::select()
        .column(R::target_column())
        .from(R::Entity::default())
        .and_where(R::actor_column().eq(actor_id))
        .to_owned()
}

/// Query selecting every target paired with `actor_id`, ordered by target id.
///
/// The query is not executed here. Each execution reads the current state, so the
/// same query can be run again to observe later changes, or be filtered and
/// paginated further by the caller.
#[must_use]
pub fn targets_query<R: RelationSet>(actor_id: i64) -> Select<R::Target> {
    <R::Target as EntityTrait>::find()
        .filter(R::target_id_column().in_subquery(target_ids::<R>(actor_id)))
        .order_by_asc(R::target_id_column())
}

/// Executes [`targets_query`].
pub async fn list<R, C>(db: &C, actor_id: i64) -> Result<Vec<<R::Target as EntityTrait>::Model>>
where
    R: RelationSet,
    C: ConnectionTrait,
{
    targets_query::<R>(actor_id)
        .all(db)
        .await
        .map_err(Into::into)
}
