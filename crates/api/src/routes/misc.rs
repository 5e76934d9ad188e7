use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

use crate::global_state::GlobalState;

pub fn misc_routes() -> Router<GlobalState> {
    Router::new().route("/api/checkheal", get(check_health))
}

async fn check_health() -> Json<Value> {
    Json(json!({ "status": "OK", "message": "Server is healthy" }))
}
