use anyhow::anyhow;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{get, post, put},
    Extension, Json, Router,
};
use pocguide_clients::TokenClaims;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::global_state::GlobalState;
use crate::middleware::authenticate;
use crate::response::AppError;

pub fn user_routes(state: &GlobalState) -> Router<GlobalState> {
    Router::new()
        .route("/api/user/me",
            get(get_me)
            .route_layer(middleware::from_fn_with_state(state.clone(), authenticate))
        )
        .route("/api/users/{username}", get(get_user_by_username))
        .route("/api/user/info/{sub}", get(get_user_info))
        .route("/api/user/change-password",
            post(change_password)
            .route_layer(middleware::from_fn_with_state(state.clone(), authenticate))
        )
        .route("/api/user/change-name",
            put(change_name)
            .route_layer(middleware::from_fn_with_state(state.clone(), authenticate))
        )
}

async fn get_me(
    State(state): State<GlobalState>,
    Extension(user): Extension<TokenClaims>,
) -> Result<Json<Value>, AppError> {
    let Some(attrs) = state.cognito.get_user_attributes(&user.username).await? else {
        return Err(AppError::new(StatusCode::NOT_FOUND, anyhow!("User not found")));
    };

    Ok(Json(json!({
        "username": user.username,
        "sub": user.sub,
        "attributes": attrs,
        "isAdmin": user.is_admin(),
    })))
}

/// Public display-name lookup for profile pages.
async fn get_user_by_username(
    State(state): State<GlobalState>,
    Path(username): Path<String>,
) -> Result<Json<Value>, AppError> {
    let Some(attrs) = state.cognito.get_user_attributes(&username).await? else {
        return Err(AppError::new(StatusCode::NOT_FOUND, anyhow!("User not found")));
    };

    let name = attrs.get("name").cloned().unwrap_or_else(|| username.clone());
    Ok(Json(json!({ "username": username, "name": name })))
}

async fn get_user_info(
    State(state): State<GlobalState>,
    Path(sub): Path<String>,
) -> Result<Json<Value>, AppError> {
    let name = match state.cognito.find_by_sub(&sub).await? {
        Some(attrs) => attrs
            .get("name")
            .or_else(|| attrs.get("username"))
            .cloned()
            .unwrap_or_else(|| "Người chơi".to_string()),
        None => "Người chơi".to_string(),
    };
    Ok(Json(json!({ "name": name })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ChangePasswordRequest {
    previous_password: String,
    proposed_password: String,
    access_token: String,
}

/// POST /api/user/change-password — the access token (not the id token) goes
/// to Cognito, which verifies the previous password itself.
async fn change_password(
    State(state): State<GlobalState>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<Value>, AppError> {
    if payload.previous_password.is_empty()
        || payload.proposed_password.is_empty()
        || payload.access_token.is_empty()
    {
        return Err(AppError::new(
            StatusCode::BAD_REQUEST,
            anyhow!("Both previous and new passwords are required"),
        ));
    }

    if let Err(err) = state
        .cognito
        .change_password(
            &payload.previous_password,
            &payload.proposed_password,
            &payload.access_token,
        )
        .await
    {
        tracing::warn!("change password rejected: {}", err);
        return Err(AppError::new(
            StatusCode::BAD_REQUEST,
            anyhow!("Could not change password"),
        ));
    }

    Ok(Json(json!({ "message": "Password changed successfully" })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ChangeNameRequest {
    name: String,
}

async fn change_name(
    State(state): State<GlobalState>,
    Extension(user): Extension<TokenClaims>,
    Json(payload): Json<ChangeNameRequest>,
) -> Result<Json<Value>, AppError> {
    let name = payload.name.trim();
    if name.chars().count() < 3 {
        return Err(AppError::new(
            StatusCode::BAD_REQUEST,
            anyhow!("Tên phải có ít nhất 3 ký tự"),
        ));
    }

    state.cognito.set_display_name(&user.username, name).await?;
    Ok(Json(json!({ "message": "Cập nhật tên thành công", "name": name })))
}
