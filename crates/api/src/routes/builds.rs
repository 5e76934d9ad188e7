use anyhow::anyhow;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    middleware,
    routing::{delete, get, post, put},
    Extension, Json, Router,
};
use pocguide_clients::TokenClaims;
use pocguide_common::now_iso;
use pocguide_store::{Build, BuildPatch, DeleteOutcome, UpdateOutcome};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::global_state::GlobalState;
use crate::middleware::authenticate;
use crate::response::AppError;
use crate::utils::bearer_from_headers;

pub fn build_routes(state: &GlobalState) -> Router<GlobalState> {
    Router::new()
        .route("/api/builds", get(list_public_builds))
        .route("/api/builds/my-builds",
            get(list_my_builds)
            .route_layer(middleware::from_fn_with_state(state.clone(), authenticate))
        )
        .route("/api/builds/{id}", get(get_build))

        .route("/api/builds", post(create_build)
            .route_layer(middleware::from_fn_with_state(state.clone(), authenticate))
        )
        .route("/api/builds/{id}", put(update_build)
            .route_layer(middleware::from_fn_with_state(state.clone(), authenticate))
        )
        .route("/api/builds/{id}", delete(delete_build)
            .route_layer(middleware::from_fn_with_state(state.clone(), authenticate))
        )
}

/// GET /api/builds — every public build, with creator display names resolved
/// in one concurrent Cognito batch per request.
async fn list_public_builds(
    State(state): State<GlobalState>,
) -> Result<Json<Value>, AppError> {
    let mut items = state.builds.list_public().await?;

    let mut creators: Vec<String> = items.iter().map(|b| b.creator.clone()).collect();
    creators.sort();
    creators.dedup();

    let names = state.cognito.resolve_display_names(&creators).await;
    for build in &mut items {
        build.creator_name = names.get(&build.creator).cloned();
    }

    Ok(Json(json!({ "items": items })))
}

async fn list_my_builds(
    State(state): State<GlobalState>,
    Extension(user): Extension<TokenClaims>,
) -> Result<Json<Value>, AppError> {
    let items = state.builds.list_by_creator(&user.username).await?;
    Ok(Json(json!({ "items": items })))
}

/// GET /api/builds/{id} — a public build counts a view; a private build is
/// visible to its owner only and reads as missing for everyone else. The
/// bearer token is optional here; an unverifiable one means anonymous.
async fn get_build(
    State(state): State<GlobalState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Build>, AppError> {
    let caller_sub = bearer_from_headers(&headers)
        .and_then(|token| state.verifier.verify(&token).ok())
        .map(|claims| claims.sub);

    let Some(build) = state.builds.get(&id).await? else {
        return Err(AppError::new(StatusCode::NOT_FOUND, anyhow!("Build not found")));
    };

    if build.display {
        if let Err(err) = state.builds.record_view(&id).await {
            tracing::warn!("view bump failed for {}: {}", id, err);
        }
        return Ok(Json(build));
    }

    if caller_sub.as_deref() != Some(build.sub.as_str()) {
        return Err(AppError::new(
            StatusCode::NOT_FOUND,
            anyhow!("Build not found or not public"),
        ));
    }

    Ok(Json(build))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct CreateBuildRequest {
    id: Option<String>,
    champion_name: String,
    description: String,
    #[serde(alias = "artifacts")]
    relic_set: Vec<String>,
    powers: Vec<String>,
    rune: Vec<String>,
    regions: Vec<String>,
    star: i64,
    display: bool,
}

/// POST /api/builds — the client may bring its own id (which makes retries
/// idempotent); creation is a conditional put, so a duplicate id can never
/// overwrite an existing build.
async fn create_build(
    State(state): State<GlobalState>,
    Extension(user): Extension<TokenClaims>,
    Json(payload): Json<CreateBuildRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    if payload.champion_name.trim().is_empty() || payload.relic_set.is_empty() {
        return Err(AppError::new(
            StatusCode::BAD_REQUEST,
            anyhow!("Champion name and relicSet are required."),
        ));
    }

    let build = Build {
        id: payload
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
        sub: user.sub.clone(),
        creator: user.username.clone(),
        creator_name: None,
        champion_name: payload.champion_name,
        description: payload.description,
        relic_set: payload.relic_set,
        powers: payload.powers,
        rune: payload.rune,
        regions: payload.regions,
        star: payload.star,
        display: payload.display,
        like: 0,
        favorite: Vec::new(),
        views: 0,
        created_at: now_iso(),
    };

    if !state.builds.insert(&build).await? {
        return Err(AppError::new(
            StatusCode::BAD_REQUEST,
            anyhow!("ID build đã tồn tại"),
        ));
    }

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Build created successfully", "build": build })),
    ))
}

/// PUT /api/builds/{id} — partial owner update. Ownership is enforced by the
/// store's condition expression, not by reading first.
async fn update_build(
    State(state): State<GlobalState>,
    Extension(user): Extension<TokenClaims>,
    Path(id): Path<String>,
    Json(mut patch): Json<BuildPatch>,
) -> Result<Json<Value>, AppError> {
    // admin-only fields are not owner-editable
    patch.champion_name = None;
    patch.like = None;
    patch.views = None;

    if patch.is_empty() {
        return Err(AppError::new(
            StatusCode::BAD_REQUEST,
            anyhow!("No fields to update"),
        ));
    }

    match state.builds.update_fields(&id, Some(&user.sub), &patch).await? {
        UpdateOutcome::Updated(build) => {
            Ok(Json(json!({ "message": "Build updated successfully", "build": build })))
        }
        UpdateOutcome::NotFound => Err(AppError::new(
            StatusCode::NOT_FOUND,
            anyhow!("Build not found"),
        )),
        UpdateOutcome::Forbidden => Err(AppError::new(
            StatusCode::FORBIDDEN,
            anyhow!("Unauthorized"),
        )),
    }
}

async fn delete_build(
    State(state): State<GlobalState>,
    Extension(user): Extension<TokenClaims>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    match state.builds.delete(&id, Some(&user.sub)).await? {
        DeleteOutcome::Deleted => Ok(Json(json!({ "message": "Build deleted successfully" }))),
        DeleteOutcome::NotFound => Err(AppError::new(
            StatusCode::NOT_FOUND,
            anyhow!("Build not found"),
        )),
        DeleteOutcome::Forbidden => Err(AppError::new(
            StatusCode::FORBIDDEN,
            anyhow!("Unauthorized"),
        )),
    }
}
