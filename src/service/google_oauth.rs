use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use thiserror::Error;
use tokio::sync::Mutex;

const GOOGLE_CERTS_URL: &str = "https://www.googleapis.com/oauth2/v3/certs";
const GOOGLE_ISSUERS: [&str; 2] = ["https://accounts.google.com", "accounts.google.com"];
const KEYS_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, PartialEq)]
pub struct GoogleUserInfo {
    pub sub: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
    pub email_verified: bool,
}

#[derive(Debug, Deserialize)]
struct GoogleClaims {
    sub: String,
    email: Option<String>,
    #[serde(default)]
    email_verified: bool,
    name: Option<String>,
    picture: Option<String>,
}

#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("Google sign-in is not configured")]
    NotConfigured,
    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("JWT validation error: {0}")]
    JwtValidation(String),
}

#[derive(Debug, Deserialize)]
struct GoogleCertsResponse {
    keys: Vec<GooglePublicKey>,
}

#[derive(Debug, Deserialize, Clone)]
struct GooglePublicKey {
    kid: String,
    n: String,
    e: String,
}

type KeyCache = Option<(HashMap<String, GooglePublicKey>, Instant)>;

/// Verifies Google ID tokens against Google's published signing keys.
#[derive(Debug, Clone)]
pub struct GoogleAuthService {
    http: reqwest::Client,
    client_id: Option<String>,
    cached_public_keys: Arc<Mutex<KeyCache>>,
}

impl GoogleAuthService {
    pub fn new(http: reqwest::Client, client_id: Option<String>) -> Self {
        Self {
            http,
            client_id,
            cached_public_keys: Arc::new(Mutex::new(None)),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.client_id.is_some()
    }

    async fn fetch_public_keys(&self) -> Result<HashMap<String, GooglePublicKey>, OAuthError> {
        let response = self.http.get(GOOGLE_CERTS_URL).send().await?;

        if !response.status().is_success() {
            return Err(OAuthError::JwtValidation(format!(
                "Failed to fetch Google public keys: HTTP {}",
                response.status()
            )));
        }

        let certs: GoogleCertsResponse = response.json().await?;
        Ok(certs
            .keys
            .into_iter()
            .map(|key| (key.kid.clone(), key))
            .collect())
    }

    /// Key for `kid`, refetching when the cache is stale or the key rotated.
    async fn public_key(&self, kid: &str) -> Result<GooglePublicKey, OAuthError> {
        let mut cache = self.cached_public_keys.lock().await;

        if let Some((keys, fetched_at)) = cache.as_ref() {
            if fetched_at.elapsed() < KEYS_TTL {
                if let Some(key) = keys.get(kid) {
                    return Ok(key.clone());
                }
            }
        }

        let keys = self.fetch_public_keys().await?;
        let key = keys.get(kid).cloned();
        *cache = Some((keys, Instant::now()));

        key.ok_or_else(|| {
            OAuthError::JwtValidation(format!("No public key found for Key ID: {}", kid))
        })
    }

    pub async fn validate_id_token(&self, id_token: &str) -> Result<GoogleUserInfo, OAuthError> {
        let client_id = self.client_id.as_deref().ok_or(OAuthError::NotConfigured)?;

        let header = jsonwebtoken::decode_header(id_token)
            .map_err(|e| OAuthError::JwtValidation(format!("Invalid token header: {}", e)))?;

        let kid = header
            .kid
            .ok_or_else(|| OAuthError::JwtValidation("Missing key ID in token header".to_string()))?;

        let public_key = self.public_key(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[client_id]);
        validation.set_issuer(&GOOGLE_ISSUERS);

        let decoding_key = DecodingKey::from_rsa_components(&public_key.n, &public_key.e)
            .map_err(|e| OAuthError::JwtValidation(format!("Failed to create decoding key: {}", e)))?;

        let token_data = decode::<GoogleClaims>(id_token, &decoding_key, &validation)
            .map_err(|e| OAuthError::JwtValidation(format!("Token validation failed: {}", e)))?;

        Ok(user_info_from_claims(token_data.claims))
    }
}

fn user_info_from_claims(claims: GoogleClaims) -> GoogleUserInfo {
    GoogleUserInfo {
        sub: claims.sub,
        // An unverified address must not link onto an existing email account.
        email: claims.email.filter(|_| claims.email_verified),
        name: claims.name.filter(|n| !n.trim().is_empty()),
        picture: claims.picture,
        email_verified: claims.email_verified,
    }
}
