use anyhow::anyhow;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    routing::{get, patch},
    Extension, Json, Router,
};
use pocguide_clients::TokenClaims;
use pocguide_store::Build;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::global_state::GlobalState;
use crate::middleware::authenticate;
use crate::response::AppError;
use crate::utils::parse_ids;

pub fn favorite_routes(state: &GlobalState) -> Router<GlobalState> {
    Router::new()
        .route("/api/builds/favorites",
            get(list_favorite_builds)
            .route_layer(middleware::from_fn_with_state(state.clone(), authenticate))
        )
        .route("/api/builds/favorites/batch",
            get(favorite_status_batch)
            .route_layer(middleware::from_fn_with_state(state.clone(), authenticate))
        )
        .route("/api/builds/favorites/count/batch", get(favorite_count_batch))
        .route("/api/builds/{id}/favorite",
            patch(toggle_favorite)
            .route_layer(middleware::from_fn_with_state(state.clone(), authenticate))
        )
        .route("/api/builds/{id}/like",
            patch(like_build)
            .route_layer(middleware::from_fn_with_state(state.clone(), authenticate))
        )
}

async fn list_favorite_builds(
    State(state): State<GlobalState>,
    Extension(user): Extension<TokenClaims>,
) -> Result<Json<Vec<Build>>, AppError> {
    let builds = state.builds.list_favorited_by(&user.sub).await?;
    Ok(Json(builds))
}

#[derive(Debug, Default, Deserialize)]
struct BatchQuery {
    ids: Option<String>,
}

/// GET /api/builds/favorites/batch?ids=a,b,c — per-id "did I favorite this"
/// map for the caller, resolved in one batched read.
async fn favorite_status_batch(
    State(state): State<GlobalState>,
    Extension(user): Extension<TokenClaims>,
    Query(query): Query<BatchQuery>,
) -> Result<Json<Value>, AppError> {
    let ids = parse_ids(query.ids.as_deref().unwrap_or(""));
    if ids.is_empty() {
        return Err(AppError::new(
            StatusCode::BAD_REQUEST,
            anyhow!("ids query parameter is required"),
        ));
    }

    let statuses = state.builds.favorite_status_batch(&ids, &user.sub).await?;
    Ok(Json(json!(statuses)))
}

async fn favorite_count_batch(
    State(state): State<GlobalState>,
    Query(query): Query<BatchQuery>,
) -> Result<Json<Value>, AppError> {
    let ids = parse_ids(query.ids.as_deref().unwrap_or(""));
    if ids.is_empty() {
        return Err(AppError::new(
            StatusCode::BAD_REQUEST,
            anyhow!("ids query parameter is required"),
        ));
    }

    let counts = state.builds.favorite_count_batch(&ids).await?;
    Ok(Json(json!(counts)))
}

/// PATCH /api/builds/{id}/favorite — a single conditional update flips the
/// membership; concurrent taps from the same user settle to one state.
async fn toggle_favorite(
    State(state): State<GlobalState>,
    Extension(user): Extension<TokenClaims>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    match state.builds.toggle_favorite(&id, &user.sub).await? {
        Some(toggle) => Ok(Json(json!({
            "isFavorited": toggle.is_favorited,
            "favoriteCount": toggle.favorite_count,
        }))),
        None => Err(AppError::new(
            StatusCode::NOT_FOUND,
            anyhow!("Build not found"),
        )),
    }
}

/// PATCH /api/builds/{id}/like — at most one like per account; a repeat call
/// reports the current count without bumping it.
async fn like_build(
    State(state): State<GlobalState>,
    Extension(user): Extension<TokenClaims>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    match state.builds.record_like(&id, &user.sub).await? {
        Some(outcome) => Ok(Json(json!({
            "like": outcome.like,
            "alreadyLiked": outcome.already_liked,
        }))),
        None => Err(AppError::new(
            StatusCode::NOT_FOUND,
            anyhow!("Build not found"),
        )),
    }
}
