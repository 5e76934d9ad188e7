use std::time::Duration;

use anyhow::Result;
use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    Json, Router,
};
use dotenv::dotenv;
use pocguide_api::{
    admin_routes, auth_routes, build_routes, champion_routes, comment_routes, favorite_routes,
    misc_routes, reference_routes, setup_tracing, user_routes, ApiServerEnv, GlobalState,
};
use pocguide_common::EnvVars;
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    setup_tracing();

    let env = ApiServerEnv::load();
    let state = GlobalState::new().await?;

    let mut origins: Vec<HeaderValue> = vec!["http://localhost:5173"
        .parse()
        .map_err(anyhow::Error::from)?];
    if let Ok(origin) = env.frontend_url.parse::<HeaderValue>() {
        origins.push(origin);
    } else {
        tracing::warn!("FRONTEND_URL is not a valid origin: {}", env.frontend_url);
    }

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let app = Router::new()
        .merge(build_routes(&state))
        .merge(favorite_routes(&state))
        .merge(comment_routes(&state))
        .merge(user_routes(&state))
        .merge(auth_routes())
        .merge(admin_routes(&state))
        .merge(champion_routes(&state))
        .merge(reference_routes(&state))
        .merge(misc_routes())
        .fallback(route_not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .with_state(state);

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    tracing::info!("LISTENING ON {}", port);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn route_not_found() -> (StatusCode, Json<Value>) {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Route not found" })))
}
