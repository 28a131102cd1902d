use axum::{
    Extension, Form, Json,
    extract::{Path, State},
};
use tracing::info;

use blog_db::queries;
use blog_types::api::{RoleChangeResponse, RoleForm, UserResponse};

use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::policy::{Action, Resource, authorize};
use crate::state::{AppState, db_task};
use crate::views::user_response;

/// GET /users: the user directory with roles, for admins.
pub async fn list_users(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    authorize(&caller, Action::Read, Resource::Users).require()?;

    let rows = db_task(&state, |db| Ok(db.list_users()?)).await?;
    Ok(Json(rows.into_iter().map(user_response).collect()))
}

/// PUT /users/{id}/role. The admin check runs before the target lookup.
pub async fn change_role(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Extension(caller): Extension<CurrentUser>,
    Form(form): Form<RoleForm>,
) -> Result<Json<RoleChangeResponse>, ApiError> {
    authorize(&caller, Action::ChangeRole, Resource::Users).require()?;

    let role = form.role;
    db_task(&state, move |db| {
        db.transaction(|tx| {
            queries::user_by_id(tx, user_id)?.ok_or(ApiError::NotFound("User"))?;
            queries::update_user_role(tx, user_id, role)?;
            Ok(())
        })
    })
    .await?;

    info!("User {} set role of user {} to {}", caller.username, user_id, role);

    Ok(Json(RoleChangeResponse {
        message: "User role updated successfully".to_string(),
        user_id,
        new_role: role,
    }))
}
