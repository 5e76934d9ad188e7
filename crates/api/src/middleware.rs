use anyhow::anyhow;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use pocguide_clients::TokenClaims;

use crate::global_state::GlobalState;
use crate::response::AppError;
use crate::utils::extract_bearer_token;

/// Verifies the bearer token against the pool's signing keys and injects the
/// claims for downstream handlers. Every request is verified independently;
/// there is no session state.
pub async fn authenticate(
    State(state): State<GlobalState>,
    mut req: Request,
    next: Next,
) -> Result<Response<Body>, AppError> {
    let token = extract_bearer_token(&req)?;

    let claims = state.verifier.verify(&token).map_err(|err| {
        tracing::debug!("token verification error: {}", err);
        AppError::new(StatusCode::FORBIDDEN, anyhow!("Invalid or expired token"))
    })?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Layered behind `authenticate`; gates on membership in the Cognito
/// `admin` group.
pub async fn require_admin(req: Request, next: Next) -> Result<Response<Body>, AppError> {
    let claims = req.extensions().get::<TokenClaims>().ok_or_else(|| {
        AppError::new(
            StatusCode::UNAUTHORIZED,
            anyhow!("Authorization header is missing"),
        )
    })?;

    if !claims.is_admin() {
        return Err(AppError::new(
            StatusCode::FORBIDDEN,
            anyhow!("Truy cập bị từ chối: Yêu cầu quyền admin"),
        ));
    }

    Ok(next.run(req).await)
}
