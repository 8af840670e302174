//! Signed blob URLs.
//!
//! A signed URL embeds a scoped, expiring token: `put` tokens authorize one
//! direct upload, `get` tokens authorize downloads. The blob endpoint
//! validates the token against the path it is used on, so a URL grants
//! access to exactly one object.

use capstone_core::{ApiError, Result};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// What a signed URL authorizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlScope {
    Put,
    Get,
}

impl UrlScope {
    fn as_str(self) -> &'static str {
        match self {
            UrlScope::Put => "put",
            UrlScope::Get => "get",
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct BlobClaims {
    /// Object path this token is bound to.
    sub: String,
    /// "put" or "get".
    scope: String,
    iat: i64,
    exp: i64,
}

/// Mints and validates signed blob URLs.
#[derive(Clone)]
pub struct UrlSigner {
    secret: String,
    base_url: String,
}

impl UrlSigner {
    pub fn new(secret: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            base_url: base_url.into(),
        }
    }

    /// Mint a signed URL for one object path.
    pub fn sign_url(&self, path: &str, scope: UrlScope, ttl_secs: u64) -> Result<String> {
        super::validate_path(path)?;

        let now = chrono::Utc::now().timestamp();
        let claims = BlobClaims {
            sub: path.to_string(),
            scope: scope.as_str().to_string(),
            iat: now,
            exp: now + ttl_secs as i64,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| ApiError::Internal(format!("Failed to sign URL: {}", e)))?;

        Ok(format!(
            "{}/blobs/{}?token={}",
            self.base_url.trim_end_matches('/'),
            path,
            token
        ))
    }

    /// Validate a token presented at the blob endpoint. Returns an error
    /// unless the token is unexpired, carries the expected scope and is
    /// bound to the path it is being used on.
    pub fn verify(&self, token: &str, path: &str, scope: UrlScope) -> Result<()> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 5;

        let data = decode::<BlobClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|_| ApiError::PermissionDenied("Signed URL invalid or expired".into()))?;

        if data.claims.sub != path || data.claims.scope != scope.as_str() {
            return Err(ApiError::PermissionDenied(
                "Signed URL does not match this object".into(),
            ));
        }

        Ok(())
    }
}
