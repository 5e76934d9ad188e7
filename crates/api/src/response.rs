use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

// Make our own error that wraps `anyhow::Error`.
#[derive(Debug)]
pub struct AppError(pub StatusCode, pub anyhow::Error);

impl AppError {
    pub fn new(status: StatusCode, err: anyhow::Error) -> Self {
        Self(status, err)
    }
}

// Tell axum how to convert `AppError` into a response. Client errors carry
// their message; server errors are logged in full and answered with a
// generic body so store/provider internals never reach the caller.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.0.is_server_error() {
            tracing::error!("CODE: {}, MESSAGE: {}", self.0.as_u16(), self.1);
            return (self.0, Json(json!({ "error": "Internal server error" }))).into_response();
        }

        (self.0, Json(json!({ "error": self.1.to_string() }))).into_response()
    }
}

// This enables using `?` on functions that return `Result<_, anyhow::Error>`
// to turn them into `Result<_, AppError>`. Unclassified failures are store or
// provider trouble, not the caller's fault, hence 500.
impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(StatusCode::INTERNAL_SERVER_ERROR, err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use axum::http::StatusCode;

    #[test]
    fn client_errors_keep_their_message() {
        let resp = AppError::new(StatusCode::BAD_REQUEST, anyhow!("ID build đã tồn tại"))
            .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn blanket_conversion_is_a_server_error() {
        let err: AppError = anyhow!("dynamodb timed out at 10.0.0.3").into();
        assert_eq!(err.0, StatusCode::INTERNAL_SERVER_ERROR);
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
