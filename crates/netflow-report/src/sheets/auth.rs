//! Service-account authentication for the Sheets API.
//!
//! An RS256-signed JWT assertion is exchanged at the key's `token_uri` for a
//! bearer token, which is cached until shortly before it expires.

use std::fmt::{Debug, Formatter};
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use netflow_core::{HttpClient, HttpRequest, UtcDateTime};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::ReportError;

pub const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Assertion lifetime; Google caps it at one hour.
const ASSERTION_TTL_SECS: i64 = 3_600;
/// Tokens are refreshed this long before they expire.
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Supplies bearer tokens for API calls.
pub trait TokenSource: Send + Sync {
    fn token<'a>(&'a self) -> Pin<Box<dyn Future<Output = Result<String, ReportError>> + Send + 'a>>;
}

/// Fixed token, for tests and pre-issued credentials.
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

impl TokenSource for StaticToken {
    fn token<'a>(&'a self) -> Pin<Box<dyn Future<Output = Result<String, ReportError>> + Send + 'a>> {
        let token = self.0.clone();
        Box::pin(async move { Ok(token) })
    }
}

/// The fields of a service-account JSON key that signing needs.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl ServiceAccountKey {
    pub fn from_json(raw: &str) -> Result<Self, ReportError> {
        let key: Self = serde_json::from_str(raw)?;
        if key.client_email.trim().is_empty() {
            return Err(ReportError::Auth(String::from(
                "service account key has an empty client_email",
            )));
        }
        Ok(key)
    }

    pub fn from_file(path: &Path) -> Result<Self, ReportError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }
}

impl Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

fn default_token_uri() -> String {
    String::from(DEFAULT_TOKEN_URI)
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3_600
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// OAuth2 JWT-bearer flow for a service account.
pub struct ServiceAccountAuth {
    key: ServiceAccountKey,
    signing_key: EncodingKey,
    http_client: Arc<dyn HttpClient>,
    timeout_ms: u64,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountAuth {
    /// Validates the private key up front so a bad credential fails at startup.
    pub fn new(
        key: ServiceAccountKey,
        http_client: Arc<dyn HttpClient>,
        timeout_ms: u64,
    ) -> Result<Self, ReportError> {
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| ReportError::Auth(format!("invalid service account private key: {e}")))?;

        Ok(Self {
            key,
            signing_key,
            http_client,
            timeout_ms,
            cached: Mutex::new(None),
        })
    }

    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }

    /// Signed assertion for the token endpoint.
    pub fn assertion(&self, issued_at: UtcDateTime) -> Result<String, ReportError> {
        let iat = issued_at.unix_timestamp();
        let claims = Claims {
            iss: &self.key.client_email,
            scope: SPREADSHEETS_SCOPE,
            aud: &self.key.token_uri,
            iat,
            exp: iat + ASSERTION_TTL_SECS,
        };
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();

        jsonwebtoken::encode(&header, &claims, &self.signing_key)
            .map_err(|e| ReportError::Auth(format!("failed to sign assertion: {e}")))
    }

    async fn exchange(&self) -> Result<CachedToken, ReportError> {
        let assertion = self.assertion(UtcDateTime::now())?;
        let body = format!(
            "grant_type={}&assertion={}",
            urlencoding::encode("urn:ietf:params:oauth:grant-type:jwt-bearer"),
            urlencoding::encode(&assertion)
        );
        let request = HttpRequest::post(&self.key.token_uri)
            .with_form_body(body)
            .with_timeout_ms(self.timeout_ms);

        let response = self.http_client.execute(request).await?;
        if !response.is_success() {
            return Err(ReportError::Auth(format!(
                "token endpoint returned status {}: {}",
                response.status, response.body
            )));
        }

        let token: TokenResponse = serde_json::from_str(&response.body)?;
        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(REFRESH_MARGIN);
        tracing::debug!(
            client_email = %self.key.client_email,
            expires_in = token.expires_in,
            "obtained sheets access token"
        );

        Ok(CachedToken {
            value: token.access_token,
            refresh_at: Instant::now() + lifetime,
        })
    }
}

impl Debug for ServiceAccountAuth {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountAuth")
            .field("key", &self.key)
            .field("timeout_ms", &self.timeout_ms)
            .finish_non_exhaustive()
    }
}

impl TokenSource for ServiceAccountAuth {
    fn token<'a>(&'a self) -> Pin<Box<dyn Future<Output = Result<String, ReportError>> + Send + 'a>> {
        Box::pin(async move {
            let mut cached = self.cached.lock().await;
            if let Some(token) = cached.as_ref() {
                if Instant::now() < token.refresh_at {
                    return Ok(token.value.clone());
                }
            }

            let fresh = self.exchange().await?;
            let value = fresh.value.clone();
            *cached = Some(fresh);
            Ok(value)
        })
    }
}
