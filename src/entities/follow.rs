//! Follow entity - A subscription of one user to another user's recipes.
//!
//! `user_id` is the subscriber, `author_id` the user being followed. A user can
//! never follow themselves; that rule is enforced by the relation set in
//! [`crate::core::relation`].

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Follow database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "follows")]
pub struct Model {
    /// The subscriber
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i64,
    /// The followed author
    #[sea_orm(primary_key, auto_increment = false)]
    pub author_id: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Follower,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::AuthorId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Author,
}

impl ActiveModelBehavior for ActiveModel {}
