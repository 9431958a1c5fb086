use uuid::Uuid;

use crate::{
    db::DbPool,
    error::{AppError, AppResult},
    models::UserProfile,
    response::ApiResponse,
};

pub async fn get_user(pool: &DbPool, id: Uuid) -> AppResult<ApiResponse<UserProfile>> {
    let profile = find_profile(pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    Ok(ApiResponse::success("User", profile, None))
}

pub async fn find_profile(pool: &DbPool, id: Uuid) -> AppResult<Option<UserProfile>> {
    let profile = sqlx::query_as::<_, UserProfile>(
        r#"
        SELECT id, email, first_name, last_name, role, created_at, updated_at
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(profile)
}

pub async fn user_exists(pool: &DbPool, id: Uuid) -> AppResult<bool> {
    let exist: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(exist.is_some())
}
