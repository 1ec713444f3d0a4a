use super::db;
use crate::common::auth::{hash_password, verify_password};
use crate::common::errors::{BusinessResult, DbErrorExt};
use crate::{duplicate_resource, validation_error};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

const MAX_USERNAME_LENGTH: usize = 150;

/// Registers an active user with an argon2id password hash.
pub async fn create_user(
    db: &DatabaseConnection,
    username: &str,
    password: &str,
) -> BusinessResult<db::Model> {
    let username = username.trim();
    if username.is_empty() || username.chars().count() > MAX_USERNAME_LENGTH {
        return Err(validation_error!(
            "username",
            format!("Username must be between 1 and {MAX_USERNAME_LENGTH} characters.")
        ));
    }
    if password.is_empty() {
        return Err(validation_error!("password", "This field may not be blank."));
    }

    let existing = db::Entity::find()
        .filter(db::Column::Username.eq(username))
        .one(db)
        .await
        .map_err(|e| e.to_business_error("user"))?;
    if existing.is_some() {
        return Err(duplicate_resource!("user", "username"));
    }

    let user = db::ActiveModel {
        id: Set(Uuid::new_v4()),
        username: Set(username.to_string()),
        password_hash: Set(hash_password(password)?),
        is_active: Set(true),
        date_joined: Set(chrono::Utc::now()),
    }
    .insert(db)
    .await
    .map_err(|e| e.to_business_error("user"))?;

    tracing::info!("Created user {}", user.username);
    Ok(user)
}

/// The active user matching the credentials, if any.
pub async fn authenticate(
    db: &DatabaseConnection,
    username: &str,
    password: &str,
) -> BusinessResult<Option<db::Model>> {
    let user = db::Entity::find()
        .filter(db::Column::Username.eq(username))
        .filter(db::Column::IsActive.eq(true))
        .one(db)
        .await
        .map_err(|e| e.to_business_error("user"))?;

    Ok(user.filter(|user| verify_password(password, &user.password_hash)))
}

pub async fn find_active(db: &DatabaseConnection, id: Uuid) -> BusinessResult<Option<db::Model>> {
    db::Entity::find_by_id(id)
        .filter(db::Column::IsActive.eq(true))
        .one(db)
        .await
        .map_err(|e| e.to_business_error("user"))
}
