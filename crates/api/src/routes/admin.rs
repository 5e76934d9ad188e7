use anyhow::anyhow;
use axum::{
    extract::{Path, State},
    http::StatusCode,
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
use crate::middleware::{authenticate, require_admin};
use crate::response::AppError;

/// Admin surface: full-table listing and unconditioned writes, gated by the
/// Cognito admin group. `require_admin` is layered inside `authenticate` so
/// the claims extension exists by the time it runs.
pub fn admin_routes(state: &GlobalState) -> Router<GlobalState> {
    Router::new()
        .route("/api/admin/builds", get(list_builds))
        .route("/api/admin/builds", post(create_build))
        .route("/api/admin/builds/{id}", put(update_build))
        .route("/api/admin/builds/{id}", delete(delete_build))
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(state.clone(), authenticate))
}

async fn list_builds(State(state): State<GlobalState>) -> Result<Json<Value>, AppError> {
    let items = state.builds.list_all().await?;
    Ok(Json(json!({ "items": items })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct AdminCreateBuildRequest {
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

async fn create_build(
    State(state): State<GlobalState>,
    Extension(user): Extension<TokenClaims>,
    Json(payload): Json<AdminCreateBuildRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    if payload.champion_name.trim().is_empty() {
        return Err(AppError::new(
            StatusCode::BAD_REQUEST,
            anyhow!("Tên tướng là bắt buộc."),
        ));
    }

    let build = Build {
        id: Uuid::new_v4().to_string(),
        sub: user.sub.clone(),
        creator: user.username.clone(),
        creator_name: user.name.clone(),
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
            StatusCode::INTERNAL_SERVER_ERROR,
            anyhow!("build id collision for {}", build.id),
        ));
    }

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Tạo build thành công", "build": build })),
    ))
}

/// Admin update skips the ownership condition, so every BuildPatch field
/// (championName, like, views included) is editable.
async fn update_build(
    State(state): State<GlobalState>,
    Path(id): Path<String>,
    Json(patch): Json<BuildPatch>,
) -> Result<Json<Value>, AppError> {
    if patch.is_empty() {
        return Err(AppError::new(
            StatusCode::BAD_REQUEST,
            anyhow!("Không có trường nào để cập nhật."),
        ));
    }

    match state.builds.update_fields(&id, None, &patch).await? {
        UpdateOutcome::Updated(build) => {
            Ok(Json(json!({ "message": "Cập nhật thành công", "build": build })))
        }
        _ => Err(AppError::new(
            StatusCode::NOT_FOUND,
            anyhow!("Build không tồn tại."),
        )),
    }
}

async fn delete_build(
    State(state): State<GlobalState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    match state.builds.delete(&id, None).await? {
        DeleteOutcome::Deleted => Ok(Json(json!({ "message": "Xóa build thành công" }))),
        _ => Err(AppError::new(
            StatusCode::NOT_FOUND,
            anyhow!("Build không tồn tại."),
        )),
    }
}
