use anyhow::anyhow;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    routing::{delete, get, put},
    Json, Router,
};
use pocguide_store::ChampionWrite;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::global_state::GlobalState;
use crate::middleware::{authenticate, require_admin};
use crate::response::AppError;

pub fn champion_routes(state: &GlobalState) -> Router<GlobalState> {
    let admin_gate = |router: Router<GlobalState>| {
        router
            .route_layer(middleware::from_fn(require_admin))
            .route_layer(middleware::from_fn_with_state(state.clone(), authenticate))
    };

    Router::new()
        .route("/api/champions", get(list_champions))
        .route("/api/champions/search", get(search_champions))
        .merge(admin_gate(
            Router::new()
                .route("/api/champions", put(upsert_champion))
                .route("/api/champions/{championId}", delete(delete_champion)),
        ))
}

async fn list_champions(State(state): State<GlobalState>) -> Result<Json<Vec<Value>>, AppError> {
    let champions = state.champions.list_all().await?;
    Ok(Json(champions))
}

#[derive(Debug, Default, Deserialize)]
struct SearchQuery {
    name: Option<String>,
}

async fn search_champions(
    State(state): State<GlobalState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Value>>, AppError> {
    let Some(name) = query.name.filter(|n| !n.trim().is_empty()) else {
        return Err(AppError::new(
            StatusCode::BAD_REQUEST,
            anyhow!("Tham số 'name' là bắt buộc."),
        ));
    };

    let champions = state.champions.find_by_name(name.trim()).await?;
    Ok(Json(champions))
}

fn valid_champion_id(id: &str) -> bool {
    (2..=50).contains(&id.len())
        && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// PUT /api/champions — admin upsert of one champion document. The client
/// sends `isNew` to declare create-vs-update intent; the matching existence
/// condition rides on the write itself.
async fn upsert_champion(
    State(state): State<GlobalState>,
    Json(mut document): Json<Value>,
) -> Result<Json<Value>, AppError> {
    let is_new = document.get("isNew").and_then(Value::as_bool) == Some(true);
    if let Some(obj) = document.as_object_mut() {
        // editor-only hint, never persisted
        obj.remove("isNew");
    }

    let champion_id = document
        .get("championID")
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or("")
        .to_string();
    let name = document
        .get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or("")
        .to_string();

    if champion_id.is_empty() || name.is_empty() {
        return Err(AppError::new(
            StatusCode::BAD_REQUEST,
            anyhow!("championID và name là bắt buộc."),
        ));
    }
    if !(2..=50).contains(&champion_id.len()) {
        return Err(AppError::new(
            StatusCode::BAD_REQUEST,
            anyhow!("championID phải từ 2-50 ký tự."),
        ));
    }
    if !valid_champion_id(&champion_id) {
        return Err(AppError::new(
            StatusCode::BAD_REQUEST,
            anyhow!("championID chỉ được chứa chữ cái, số, gạch dưới và gạch ngang."),
        ));
    }

    let max_star = match document.get("maxStar") {
        Some(v) if !v.is_null() => v
            .as_i64()
            .filter(|n| (1..=7).contains(n))
            .ok_or_else(|| {
                AppError::new(StatusCode::BAD_REQUEST, anyhow!("maxStar phải là số từ 1-7."))
            })?,
        _ => 7,
    };

    if let Some(obj) = document.as_object_mut() {
        obj.insert("championID".into(), Value::String(champion_id.clone()));
        obj.insert("name".into(), Value::String(name));
        obj.insert("maxStar".into(), Value::from(max_star));
    }

    match state.champions.upsert(&document, is_new).await? {
        ChampionWrite::Saved => {
            let message = if is_new {
                "Tạo tướng mới thành công."
            } else {
                "Cập nhật tướng thành công."
            };
            Ok(Json(json!({ "message": message, "champion": document })))
        }
        ChampionWrite::AlreadyExists => Err(AppError::new(
            StatusCode::BAD_REQUEST,
            anyhow!("Tướng với ID này đã tồn tại."),
        )),
        ChampionWrite::Missing => Err(AppError::new(
            StatusCode::NOT_FOUND,
            anyhow!("Tướng không tồn tại để cập nhật."),
        )),
    }
}

async fn delete_champion(
    State(state): State<GlobalState>,
    Path(champion_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let champion_id = champion_id.trim().to_string();
    if champion_id.is_empty() {
        return Err(AppError::new(
            StatusCode::BAD_REQUEST,
            anyhow!("championID không hợp lệ."),
        ));
    }

    let Some(removed) = state.champions.remove(&champion_id).await? else {
        return Err(AppError::new(
            StatusCode::NOT_FOUND,
            anyhow!("Không tìm thấy tướng để xóa."),
        ));
    };

    let name = removed.get("name").and_then(Value::as_str).unwrap_or("?");
    Ok(Json(json!({
        "message": format!("Tướng \"{}\" (ID: {}) đã được xóa thành công.", name, champion_id),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn champion_id_charset_and_length() {
        assert!(valid_champion_id("C056"));
        assert!(valid_champion_id("TFT9_Ahri-alt"));
        assert!(!valid_champion_id("a"));
        assert!(!valid_champion_id("has space"));
        assert!(!valid_champion_id("việt"));
        assert!(!valid_champion_id(&"x".repeat(51)));
    }
}
