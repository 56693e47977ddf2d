//! Google Cloud credentials and OAuth access tokens.
//!
//! Two credential shapes are supported:
//!
//! * a **service-account key** (the JSON file `GOOGLE_APPLICATION_CREDENTIALS`
//!   points at) — we sign an RS256 JWT with its private key and trade it for a
//!   short-lived access token at the key's `token_uri`;
//! * a ready-made **access token** (`GOOGLE_OAUTH_ACCESS_TOKEN`, e.g. from
//!   `gcloud auth print-access-token`).
//!
//! [`TokenSource`] caches the exchanged token until shortly before it expires
//! so a batch of documents signs one JWT, not one per document.

use crate::error::TranslateError;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// OAuth scope for the Cloud Translation API.
pub const TRANSLATION_SCOPE: &str = "https://www.googleapis.com/auth/cloud-translation";

/// Token endpoint used when a key omits `token_uri`.
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Env var holding a ready-made OAuth access token.
pub const ACCESS_TOKEN_ENV: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

/// Env var pointing at a service-account key file.
pub const KEY_FILE_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";

/// Refresh this long before the reported expiry.
const EXPIRY_SKEW: Duration = Duration::from_secs(60);

/// Lifetime requested for the signed assertion.
const ASSERTION_LIFETIME_SECS: u64 = 3600;

/// A service-account key as downloaded from the Cloud console.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub project_id: Option<String>,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("token_uri", &self.token_uri)
            .field("project_id", &self.project_id)
            .finish()
    }
}

/// Credentials used to authorise Translation API calls.
#[derive(Clone)]
pub enum Credentials {
    ServiceAccount(Arc<ServiceAccountKey>),
    AccessToken(String),
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::ServiceAccount(key) => f.debug_tuple("ServiceAccount").field(key).finish(),
            Credentials::AccessToken(_) => f.debug_tuple("AccessToken").field(&"<redacted>").finish(),
        }
    }
}

impl Credentials {
    /// Short label for logs; never includes secret material.
    pub fn kind(&self) -> &'static str {
        match self {
            Credentials::ServiceAccount(_) => "service_account",
            Credentials::AccessToken(_) => "access_token",
        }
    }

    /// Project id carried by a service-account key, if any.
    pub fn project_id(&self) -> Option<&str> {
        match self {
            Credentials::ServiceAccount(key) => key.project_id.as_deref(),
            Credentials::AccessToken(_) => None,
        }
    }

    /// Load a service-account key file.
    pub fn from_key_file(path: impl AsRef<Path>) -> Result<Self, TranslateError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| TranslateError::InvalidCredentials {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        Self::from_key_json(&json, path)
    }

    /// Parse service-account key JSON. `origin` is only used in error messages.
    pub fn from_key_json(json: &str, origin: impl AsRef<Path>) -> Result<Self, TranslateError> {
        let key: ServiceAccountKey =
            serde_json::from_str(json).map_err(|e| TranslateError::InvalidCredentials {
                path: origin.as_ref().to_path_buf(),
                detail: e.to_string(),
            })?;
        if !key.private_key.contains("PRIVATE KEY") {
            return Err(TranslateError::InvalidCredentials {
                path: origin.as_ref().to_path_buf(),
                detail: "private_key is not a PEM-encoded key".into(),
            });
        }
        Ok(Credentials::ServiceAccount(Arc::new(key)))
    }

    /// Resolve credentials from the process environment.
    pub fn from_env() -> Result<Self, TranslateError> {
        Self::resolve(
            std::env::var(ACCESS_TOKEN_ENV).ok(),
            std::env::var(KEY_FILE_ENV).ok().map(PathBuf::from),
        )
    }

    /// Precedence: access token, then key file. Empty values count as unset.
    pub(crate) fn resolve(
        access_token: Option<String>,
        key_file: Option<PathBuf>,
    ) -> Result<Self, TranslateError> {
        if let Some(token) = access_token.filter(|t| !t.trim().is_empty()) {
            debug!("Using access token from {}", ACCESS_TOKEN_ENV);
            return Ok(Credentials::AccessToken(token.trim().to_string()));
        }
        if let Some(path) = key_file.filter(|p| !p.as_os_str().is_empty()) {
            debug!("Using service-account key {}", path.display());
            return Self::from_key_file(path);
        }
        Err(TranslateError::CredentialsNotConfigured {
            hint: format!(
                "Set {KEY_FILE_ENV}=/path/to/service-account.json,\n\
                 or {ACCESS_TOKEN_ENV}=$(gcloud auth print-access-token),\n\
                 or pass --credentials <FILE>."
            ),
        })
    }
}

/// JWT claims for the OAuth 2.0 JWT-bearer grant.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    iss: String,
    scope: String,
    aud: String,
    exp: u64,
    iat: u64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// Hands out bearer tokens, exchanging and caching them as needed.
pub struct TokenSource {
    credentials: Credentials,
    http: reqwest::Client,
    cached: RwLock<Option<CachedToken>>,
}

impl TokenSource {
    pub fn new(credentials: Credentials, http: reqwest::Client) -> Self {
        Self {
            credentials,
            http,
            cached: RwLock::new(None),
        }
    }

    /// Return a valid access token, refreshing it if needed.
    pub async fn access_token(&self) -> Result<String, TranslateError> {
        let key = match &self.credentials {
            Credentials::AccessToken(token) => return Ok(token.clone()),
            Credentials::ServiceAccount(key) => Arc::clone(key),
        };

        {
            let cached = self.cached.read().await;
            if let Some(ref t) = *cached {
                if Instant::now() < t.refresh_at {
                    return Ok(t.value.clone());
                }
            }
        }

        let mut cached = self.cached.write().await;
        // Another task may have refreshed while we waited for the write lock.
        if let Some(ref t) = *cached {
            if Instant::now() < t.refresh_at {
                return Ok(t.value.clone());
            }
        }

        let fresh = self.exchange(&key).await?;
        let value = fresh.value.clone();
        *cached = Some(fresh);
        Ok(value)
    }

    async fn exchange(&self, key: &ServiceAccountKey) -> Result<CachedToken, TranslateError> {
        let assertion = sign_assertion(key, unix_now()?)?;
        info!("Requesting access token for {}", key.client_email);

        let response = self
            .http
            .post(&key.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await
            .map_err(|e| TranslateError::TokenExchangeFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TranslateError::TokenExchangeFailed(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body.trim()
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| TranslateError::TokenExchangeFailed(e.to_string()))?;

        let lifetime = Duration::from_secs(token.expires_in.unwrap_or(ASSERTION_LIFETIME_SECS));
        debug!("Access token valid for {}s", lifetime.as_secs());

        Ok(CachedToken {
            value: token.access_token,
            refresh_at: Instant::now() + lifetime.saturating_sub(EXPIRY_SKEW),
        })
    }
}

fn unix_now() -> Result<u64, TranslateError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| TranslateError::Internal(format!("system clock before 1970: {e}")))
}

/// Sign the JWT-bearer assertion for `key` issued at `now` (Unix seconds).
fn sign_assertion(key: &ServiceAccountKey, now: u64) -> Result<String, TranslateError> {
    let claims = Claims {
        iss: key.client_email.clone(),
        scope: TRANSLATION_SCOPE.to_string(),
        aud: key.token_uri.clone(),
        exp: now + ASSERTION_LIFETIME_SECS,
        iat: now,
    };

    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .map_err(|e| TranslateError::TokenExchangeFailed(format!("bad RSA private key: {e}")))?;

    encode(&Header::new(Algorithm::RS256), &claims, &encoding_key)
        .map_err(|e| TranslateError::TokenExchangeFailed(format!("JWT signing failed: {e}")))
}
