//! User business logic - registration, profiles, avatars and subscriptions.
//!
//! Credentials and sessions belong to the external auth collaborator; the functions
//! here receive already-authenticated user ids. A `viewer` of `None` is an anonymous
//! visitor.

use crate::{
    core::{
        recipe::RecipeSummary,
        relation::{self, Subscriptions},
    },
    entities::{Recipe, User, recipe, user},
    errors::{Error, Result, ValidationErrors},
};
use sea_orm::{
    ConnectionTrait, PaginatorTrait, QueryOrder, QuerySelect, Set, SqlErr, prelude::*,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// Longest accepted email address.
pub const MAX_EMAIL_LENGTH: usize = 254;
/// Longest accepted username, first name or last name.
pub const MAX_NAME_LENGTH: usize = 150;

/// Registration input.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

/// A user as presented to a particular viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    /// Whether the viewer follows this user; always false for anonymous viewers
    pub is_subscribed: bool,
    pub avatar: Option<String>,
}

/// One followed author with a preview of their recipes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Subscription {
    pub author: UserProfile,
    /// Newest recipes first, at most `recipes_limit` of them
    pub recipes: Vec<RecipeSummary>,
    /// Total number of recipes by the author
    pub recipes_count: u64,
}

fn is_username_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '.' | '@' | '+' | '-')
}

fn check_required(errors: &mut ValidationErrors, field: &str, value: &str, max_length: usize) {
    if value.is_empty() {
        errors.add(field, "this field is required");
    } else if value.chars().count() > max_length {
        errors.add(field, format!("must be at most {max_length} characters"));
    }
}

/// Checks every registration field, collecting all problems.
#[must_use]
pub fn validate_new_user(new_user: &NewUser) -> ValidationErrors {
    let mut errors = ValidationErrors::new();

    let email = new_user.email.trim();
    check_required(&mut errors, "email", email, MAX_EMAIL_LENGTH);
    if !email.is_empty() {
        let valid = email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty() && !domain.contains('@'));
        if !valid {
            errors.add("email", "enter a valid email address");
        }
    }

    let username = new_user.username.trim();
    check_required(&mut errors, "username", username, MAX_NAME_LENGTH);
    if !username.chars().all(is_username_char) {
        errors.add(
            "username",
            "may contain only letters, digits and the characters _ . @ + -",
        );
    }

    check_required(&mut errors, "first_name", new_user.first_name.trim(), MAX_NAME_LENGTH);
    check_required(&mut errors, "last_name", new_user.last_name.trim(), MAX_NAME_LENGTH);

    errors
}

/// Registers a new user.
///
/// # Errors
/// Returns an error if:
/// - Any field is missing, too long or malformed ([`Error::Validation`], all fields at once)
/// - The email or username is already taken ([`Error::Conflict`])
/// - The database insert fails
#[instrument(skip(db, new_user), fields(username = %new_user.username))]
pub async fn register_user<C>(db: &C, new_user: NewUser) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    validate_new_user(&new_user).into_result()?;

    let email = new_user.email.trim().to_string();
    let username = new_user.username.trim().to_string();

    let email_taken = User::find()
        .filter(user::Column::Email.eq(email.as_str()))
        .one(db)
        .await?
        .is_some();
    if email_taken {
        return Err(Error::Conflict {
            entity: "User with this email".to_string(),
        });
    }
    let username_taken = User::find()
        .filter(user::Column::Username.eq(username.as_str()))
        .one(db)
        .await?
        .is_some();
    if username_taken {
        return Err(Error::Conflict {
            entity: "User with this username".to_string(),
        });
    }

    let model = user::ActiveModel {
        email: Set(email),
        username: Set(username),
        first_name: Set(new_user.first_name.trim().to_string()),
        last_name: Set(new_user.last_name.trim().to_string()),
        avatar: Set(None),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    let created = model.insert(db).await.map_err(|err| match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => Error::Conflict {
            entity: "User".to_string(),
        },
        _ => err.into(),
    })?;
    info!("Registered user {}", created.id);
    Ok(created)
}

/// Retrieves a user row by its unique ID.
///
/// # Errors
/// Returns [`Error::NotFound`] if there is no such user.
pub async fn get_user_model<C>(db: &C, user_id: i64) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    User::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("User", user_id))
}

/// Presents `user` to `viewer`.
pub async fn profile_for<C>(db: &C, user: user::Model, viewer: Option<i64>) -> Result<UserProfile>
where
    C: ConnectionTrait,
{
    let is_subscribed = match viewer {
        Some(viewer_id) => relation::contains::<Subscriptions, C>(db, viewer_id, user.id).await?,
        None => false,
    };
    Ok(UserProfile {
        id: user.id,
        email: user.email,
        username: user.username,
        first_name: user.first_name,
        last_name: user.last_name,
        is_subscribed,
        avatar: user.avatar,
    })
}

/// Retrieves a user's profile as seen by `viewer`.
pub async fn get_user<C>(db: &C, user_id: i64, viewer: Option<i64>) -> Result<UserProfile>
where
    C: ConnectionTrait,
{
    let user = get_user_model(db, user_id).await?;
    profile_for(db, user, viewer).await
}

/// Lists every user ordered by id.
pub async fn list_users<C>(db: &C, viewer: Option<i64>) -> Result<Vec<UserProfile>>
where
    C: ConnectionTrait,
{
    let users = User::find().order_by_asc(user::Column::Id).all(db).await?;
    let mut profiles = Vec::with_capacity(users.len());
    for user in users {
        profiles.push(profile_for(db, user, viewer).await?);
    }
    Ok(profiles)
}

/// Stores a reference to the user's new avatar image.
///
/// # Errors
/// Returns [`Error::Validation`] if the reference is blank and [`Error::NotFound`] if the
/// user does not exist.
pub async fn set_avatar<C>(db: &C, user_id: i64, image: &str) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    let image = image.trim();
    if image.is_empty() {
        return Err(Error::validation("avatar", "this field is required"));
    }
    let mut user: user::ActiveModel = get_user_model(db, user_id).await?.into();
    user.avatar = Set(Some(image.to_string()));
    user.update(db).await.map_err(Into::into)
}

/// Removes the user's avatar.
///
/// # Errors
/// Returns [`Error::Validation`] if the user has no avatar.
pub async fn clear_avatar<C>(db: &C, user_id: i64) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    let user = get_user_model(db, user_id).await?;
    if user.avatar.is_none() {
        return Err(Error::validation("avatar", "user has no avatar"));
    }
    let mut user: user::ActiveModel = user.into();
    user.avatar = Set(None);
    user.update(db).await.map_err(Into::into)
}

/// Lists the authors `actor_id` follows, each with up to `recipes_limit` of their newest
/// recipes. `None` includes all recipes.
pub async fn subscriptions<C>(
    db: &C,
    actor_id: i64,
    recipes_limit: Option<u64>,
) -> Result<Vec<Subscription>>
where
    C: ConnectionTrait,
{
    let authors = relation::list::<Subscriptions, C>(db, actor_id).await?;
    let mut result = Vec::with_capacity(authors.len());
    for author in authors {
        let mut recipes_query = Recipe::find()
            .filter(recipe::Column::AuthorId.eq(author.id))
            .order_by_desc(recipe::Column::Id);
        if let Some(limit) = recipes_limit {
            recipes_query = recipes_query.limit(limit);
        }
        let recipes = recipes_query.all(db).await?;
        let recipes_count = Recipe::find()
            .filter(recipe::Column::AuthorId.eq(author.id))
            .count(db)
            .await?;
        result.push(Subscription {
            author: profile_for(db, author, Some(actor_id)).await?,
            recipes: recipes.iter().map(RecipeSummary::from).collect(),
            recipes_count,
        });
    }
    Ok(result)
}
