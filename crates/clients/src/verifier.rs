use std::collections::HashMap;

use anyhow::{anyhow, Result};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

/// Claims extracted from a verified Cognito id token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    #[serde(rename = "cognito:username")]
    pub username: String,
    #[serde(rename = "cognito:groups", default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub token_use: Option<String>,
}

impl TokenClaims {
    pub fn is_admin(&self) -> bool {
        self.groups.iter().any(|g| g == "admin")
    }
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: String,
    n: String,
    e: String,
}

#[derive(Debug, Deserialize)]
struct JwkSet {
    keys: Vec<Jwk>,
}

/// Stateless verifier for tokens issued by one Cognito user pool. The pool's
/// JWKS is fetched once at startup; signature, expiry, audience, issuer and
/// token_use are all checked locally on every request.
pub struct TokenVerifier {
    issuer: String,
    audience: String,
    keys: HashMap<String, DecodingKey>,
}

impl TokenVerifier {
    pub async fn from_user_pool(
        region: &str,
        user_pool_id: &str,
        app_client_id: &str,
    ) -> Result<Self> {
        let issuer = format!("https://cognito-idp.{}.amazonaws.com/{}", region, user_pool_id);
        let jwks_url = format!("{}/.well-known/jwks.json", issuer);

        let jwks: JwkSet = reqwest::get(&jwks_url)
            .await
            .map_err(|e| anyhow!("failed to fetch JWKS from {}: {}", jwks_url, e))?
            .json()
            .await
            .map_err(|e| anyhow!("invalid JWKS document: {}", e))?;

        let mut keys = HashMap::new();
        for jwk in jwks.keys {
            let key = DecodingKey::from_rsa_components(&jwk.n, &jwk.e)
                .map_err(|e| anyhow!("bad RSA components for kid {}: {}", jwk.kid, e))?;
            keys.insert(jwk.kid, key);
        }

        if keys.is_empty() {
            return Err(anyhow!("user pool {} published no signing keys", user_pool_id));
        }

        tracing::info!("loaded {} Cognito signing keys for {}", keys.len(), user_pool_id);

        Ok(Self {
            issuer,
            audience: app_client_id.to_string(),
            keys,
        })
    }

    pub fn verify(&self, token: &str) -> Result<TokenClaims> {
        let header = decode_header(token).map_err(|e| anyhow!("malformed token: {}", e))?;
        let kid = header.kid.ok_or_else(|| anyhow!("token has no kid"))?;
        let key = self
            .keys
            .get(&kid)
            .ok_or_else(|| anyhow!("unknown signing key {}", kid))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[self.audience.clone()]);
        validation.set_issuer(&[self.issuer.clone()]);

        let claims = decode::<TokenClaims>(token, key, &validation)
            .map_err(|e| anyhow!("token verification failed: {}", e))?
            .claims;

        match claims.token_use.as_deref() {
            Some("id") | None => Ok(claims),
            Some(other) => Err(anyhow!("expected an id token, got token_use={}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn claims_decode_cognito_names() {
        let claims: TokenClaims = serde_json::from_value(json!({
            "sub": "u-123",
            "cognito:username": "jinxmain",
            "cognito:groups": ["admin", "mods"],
            "name": "Jinx Main",
            "token_use": "id",
        }))
        .unwrap();

        assert_eq!(claims.sub, "u-123");
        assert_eq!(claims.username, "jinxmain");
        assert!(claims.is_admin());
        assert_eq!(claims.name.as_deref(), Some("Jinx Main"));
    }

    #[test]
    fn missing_groups_means_not_admin() {
        let claims: TokenClaims = serde_json::from_value(json!({
            "sub": "u-456",
            "cognito:username": "someone",
        }))
        .unwrap();

        assert!(claims.groups.is_empty());
        assert!(!claims.is_admin());
    }

    #[test]
    fn garbage_token_is_rejected_before_key_lookup() {
        assert!(decode_header("not-a-jwt").is_err());
    }
}
