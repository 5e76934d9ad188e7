use anyhow::anyhow;
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::global_state::GlobalState;
use crate::response::AppError;

pub fn auth_routes() -> Router<GlobalState> {
    Router::new()
        .route("/api/auth/forgot-password", post(forgot_password))
        .route("/api/auth/confirm-password-reset", post(confirm_password_reset))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ForgotPasswordRequest {
    username: String,
    email: String,
}

/// POST /api/auth/forgot-password — the account must exist and the supplied
/// email must match the one on record before a reset code goes out.
async fn forgot_password(
    State(state): State<GlobalState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Json<Value>, AppError> {
    if payload.username.trim().is_empty() {
        return Err(AppError::new(
            StatusCode::BAD_REQUEST,
            anyhow!("Username is required"),
        ));
    }

    let Some(attrs) = state.cognito.get_user_attributes(&payload.username).await? else {
        return Err(AppError::new(
            StatusCode::NOT_FOUND,
            anyhow!("Tài khoản hoặc email không chính xác"),
        ));
    };

    let on_record = attrs.get("email").map(String::as_str).unwrap_or("");
    if !payload.email.trim().is_empty() && !payload.email.trim().eq_ignore_ascii_case(on_record) {
        return Err(AppError::new(
            StatusCode::BAD_REQUEST,
            anyhow!("Tài khoản hoặc email không chính xác"),
        ));
    }

    state.cognito.forgot_password(&payload.username).await?;
    Ok(Json(json!({
        "message": "Mã đặt lại mật khẩu đã được gửi đến email"
    })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ConfirmResetRequest {
    username: String,
    code: String,
    new_password: String,
}

async fn confirm_password_reset(
    State(state): State<GlobalState>,
    Json(payload): Json<ConfirmResetRequest>,
) -> Result<Json<Value>, AppError> {
    if payload.username.trim().is_empty()
        || payload.code.trim().is_empty()
        || payload.new_password.is_empty()
    {
        return Err(AppError::new(
            StatusCode::BAD_REQUEST,
            anyhow!("Thiếu thông tin cần thiết"),
        ));
    }

    if let Err(err) = state
        .cognito
        .confirm_forgot_password(&payload.username, payload.code.trim(), &payload.new_password)
        .await
    {
        tracing::warn!("password reset confirmation rejected: {}", err);
        return Err(AppError::new(
            StatusCode::BAD_REQUEST,
            anyhow!("Mã OTP không hợp lệ hoặc đã hết hạn"),
        ));
    }

    Ok(Json(json!({ "message": "Đặt lại mật khẩu thành công" })))
}
