use anyhow::anyhow;
use axum::extract::Request;
use axum::http::{header, HeaderMap, StatusCode};
use tracing_subscriber::EnvFilter;

use crate::response::AppError;

/// Pulls the bearer token out of an Authorization header, if any.
pub fn bearer_from_headers(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let mut parts = value.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) => Some(token.to_string()),
        _ => None,
    }
}

/// Strict variant for protected routes, preserving the original error split:
/// a missing header is 401, a present-but-useless one too.
pub fn extract_bearer_token(req: &Request) -> Result<String, AppError> {
    if !req.headers().contains_key(header::AUTHORIZATION) {
        return Err(AppError::new(
            StatusCode::UNAUTHORIZED,
            anyhow!("Authorization header is missing"),
        ));
    }

    match bearer_from_headers(req.headers()) {
        // frontends have been observed serializing absent tokens literally
        Some(token) if token != "null" && token != "undefined" => Ok(token),
        _ => Err(AppError::new(
            StatusCode::UNAUTHORIZED,
            anyhow!("Token is missing or invalid"),
        )),
    }
}

/// Comma-separated id list from a batch query parameter, deduplicated with
/// order preserved.
pub fn parse_ids(raw: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .filter(|id| seen.insert(id.to_string()))
        .map(str::to_string)
        .collect()
}

pub fn setup_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(filter)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn parses_well_formed_bearer_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(bearer_from_headers(&headers).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn rejects_non_bearer_schemes() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcg=="));
        assert_eq!(bearer_from_headers(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer"));
        assert_eq!(bearer_from_headers(&headers), None);
    }

    #[test]
    fn id_lists_are_trimmed_and_deduplicated() {
        assert_eq!(parse_ids("b1, b2 ,b1,,b3"), vec!["b1", "b2", "b3"]);
        assert!(parse_ids("").is_empty());
        assert!(parse_ids(" , ,").is_empty());
    }
}
