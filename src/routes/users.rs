use axum::{Json, Router, extract::State, routing::get};
use uuid::Uuid;

use crate::{
    error::AppResult, extract::AppPath, models::UserProfile, response::ApiResponse,
    services::user_service, state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/{id}", get(get_user))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Public profile", body = ApiResponse<UserProfile>),
        (status = 404, description = "User not found")
    ),
    tag = "Users"
)]
pub async fn get_user(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<ApiResponse<UserProfile>>> {
    let resp = user_service::get_user(&state.pool, id).await?;
    Ok(Json(resp))
}
