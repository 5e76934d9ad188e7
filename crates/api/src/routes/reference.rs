use anyhow::anyhow;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{delete, get, put},
    Json, Router,
};
use serde_json::{json, Value};

use crate::global_state::GlobalState;
use crate::middleware::authenticate;
use crate::response::AppError;

/// Handler triple for one editable reference table: public listing, an
/// authenticated whole-document upsert, and an authenticated delete by key.
/// The resources differ only in store, key attribute and message nouns.
macro_rules! reference_resource {
    (
        $store:ident, $list:ident, $upsert:ident, $remove:ident,
        key: $key:literal,
        missing: $missing:literal,
        saved: $saved:literal,
        body: $body:literal,
        removed: $removed:literal
    ) => {
        async fn $list(State(state): State<GlobalState>) -> Result<Json<Vec<Value>>, AppError> {
            Ok(Json(state.$store.list_all().await?))
        }

        async fn $upsert(
            State(state): State<GlobalState>,
            Json(document): Json<Value>,
        ) -> Result<Json<Value>, AppError> {
            let has_key = document
                .get($key)
                .and_then(Value::as_str)
                .is_some_and(|code| !code.trim().is_empty());
            if !has_key {
                return Err(AppError::new(StatusCode::BAD_REQUEST, anyhow!($missing)));
            }

            state.$store.upsert(&document).await?;
            Ok(Json(json!({ "message": $saved, $body: document })))
        }

        async fn $remove(
            State(state): State<GlobalState>,
            Path(code): Path<String>,
        ) -> Result<Json<Value>, AppError> {
            if code.trim().is_empty() {
                return Err(AppError::new(StatusCode::BAD_REQUEST, anyhow!($missing)));
            }

            state.$store.delete(&code).await?;
            Ok(Json(json!({ "message": format!($removed, code) })))
        }
    };
}

reference_resource! {
    items, list_items, upsert_item, delete_item,
    key: "itemCode",
    missing: "Item code is required",
    saved: "Item data updated successfully",
    body: "item",
    removed: "Item with code {} deleted successfully"
}

reference_resource! {
    powers, list_powers, upsert_power, delete_power,
    key: "powerCode",
    missing: "Power code is required",
    saved: "Power data updated successfully",
    body: "power",
    removed: "Power with code {} deleted successfully"
}

reference_resource! {
    relics, list_relics, upsert_relic, delete_relic,
    key: "relicCode",
    missing: "Relic code is required",
    saved: "Relic data updated successfully",
    body: "relic",
    removed: "Relic with code {} deleted successfully"
}

reference_resource! {
    runes, list_runes, upsert_rune, delete_rune,
    key: "runeCode",
    missing: "Rune code is required",
    saved: "Rune data updated successfully",
    body: "rune",
    removed: "Rune with code {} deleted successfully"
}

reference_resource! {
    general_powers, list_general_powers, upsert_general_power, delete_general_power,
    key: "generalPowerCode",
    missing: "General power code is required",
    saved: "General power data updated successfully",
    body: "generalPower",
    removed: "General power with code {} deleted successfully"
}

reference_resource! {
    champion_videos, list_champion_videos, upsert_champion_video, delete_champion_video,
    key: "name",
    missing: "Champion name is required",
    saved: "Champion video data saved successfully",
    body: "video",
    removed: "Video for champion {} deleted successfully"
}

pub fn reference_routes(state: &GlobalState) -> Router<GlobalState> {
    let authed = |router: Router<GlobalState>| {
        router.route_layer(middleware::from_fn_with_state(state.clone(), authenticate))
    };

    let reads = Router::new()
        .route("/api/items", get(list_items))
        .route("/api/powers", get(list_powers))
        .route("/api/relics", get(list_relics))
        .route("/api/runes", get(list_runes))
        .route("/api/generalPowers", get(list_general_powers))
        .route("/api/champion-videos", get(list_champion_videos));

    let writes = authed(
        Router::new()
            .route("/api/items", put(upsert_item))
            .route("/api/items/{code}", delete(delete_item))
            .route("/api/powers", put(upsert_power))
            .route("/api/powers/{code}", delete(delete_power))
            .route("/api/relics", put(upsert_relic))
            .route("/api/relics/{code}", delete(delete_relic))
            .route("/api/runes", put(upsert_rune))
            .route("/api/runes/{code}", delete(delete_rune))
            .route("/api/generalPowers", put(upsert_general_power))
            .route("/api/generalPowers/{code}", delete(delete_general_power))
            .route("/api/champion-videos", put(upsert_champion_video))
            .route("/api/champion-videos/{code}", delete(delete_champion_video)),
    );

    reads.merge(writes)
}
