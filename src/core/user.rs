//! User account management.
//!
//! Thin CRUD over the `users` table. Balances are owned by
//! [`crate::core::wallet`]; nothing here writes `wallet_balance`.

use crate::{
    entities::{User, user},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};

/// Creates a user account with a zero balance and the `"user"` role.
pub async fn create_user(
    db: &DatabaseConnection,
    name: String,
    email: String,
) -> Result<user::Model> {
    if name.trim().is_empty() || email.trim().is_empty() {
        return Err(Error::Validation {
            message: "User name and email cannot be empty".to_string(),
        });
    }

    let existing = User::find()
        .filter(user::Column::Email.eq(email.trim()))
        .one(db)
        .await?;
    if existing.is_some() {
        return Err(Error::Validation {
            message: format!("A user with email {} already exists", email.trim()),
        });
    }

    let entry = user::ActiveModel {
        name: Set(name.trim().to_string()),
        email: Set(email.trim().to_string()),
        role: Set("user".to_string()),
        wallet_balance: Set(0.0),
        is_active: Set(true),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    Ok(entry.insert(db).await?)
}

/// Finds a user by id.
pub async fn get_user(db: &DatabaseConnection, user_id: i64) -> Result<user::Model> {
    User::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::UserNotFound {
            id: user_id.to_string(),
        })
}

/// Enables or disables an account. Disabled accounts keep their balance and
/// history.
pub async fn set_user_active(
    db: &DatabaseConnection,
    user_id: i64,
    is_active: bool,
) -> Result<user::Model> {
    let mut active: user::ActiveModel = get_user(db, user_id).await?.into();
    active.is_active = Set(is_active);
    Ok(active.update(db).await?)
}

/// All users, newest first.
pub async fn list_users(db: &DatabaseConnection) -> Result<Vec<user::Model>> {
    User::find()
        .order_by_desc(user::Column::CreatedAt)
        .order_by_desc(user::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}
