//! Google OAuth2 token sources
//!
//! Three credential file shapes are understood:
//!
//! - `service_account`: a signed RS256 assertion is exchanged through the
//!   JWT bearer grant
//! - `authorized_user`: the stored refresh token is exchanged through the
//!   refresh token grant
//! - anything else: treated as an OAuth2 client configuration (`installed`
//!   or `web`) and run through an authorization code exchange

use crate::domain::ResolveError;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

pub const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECONDS: i64 = 3600;

/// Code presented by the non-interactive authorization code exchange
pub const PLACEHOLDER_AUTHORIZATION_CODE: &str = "authorization-code";

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URI.to_string()
}

#[derive(Debug, Deserialize)]
struct ServiceAccountKey {
    client_email: String,
    private_key: String,
    #[serde(default)]
    private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    token_uri: String,
}

#[derive(Debug, Deserialize)]
struct AuthorizedUser {
    client_id: String,
    client_secret: String,
    refresh_token: String,
    #[serde(default = "default_token_uri")]
    token_uri: String,
}

#[derive(Debug, Deserialize)]
struct OAuthClientConfig {
    client_id: String,
    client_secret: String,
    #[serde(default = "default_token_uri")]
    token_uri: String,
    #[serde(default)]
    redirect_uris: Vec<String>,
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

fn parse_section<T: serde::de::DeserializeOwned>(
    json: &serde_json::Value,
    step: &str,
) -> Result<T, ResolveError> {
    T::deserialize(json).map_err(|e| ResolveError::token_exchange(step, e))
}

/// Exchanges a service account key for an access token
pub(crate) async fn service_account_token(
    json: &serde_json::Value,
    http: &reqwest::Client,
) -> Result<String, ResolveError> {
    let step = "service account assertion";
    let key: ServiceAccountKey = parse_section(json, step)?;

    let iat = chrono::Utc::now().timestamp();
    let claims = AssertionClaims {
        iss: &key.client_email,
        scope: CLOUD_PLATFORM_SCOPE,
        aud: &key.token_uri,
        iat,
        exp: iat + ASSERTION_LIFETIME_SECONDS,
    };
    let mut header = Header::new(Algorithm::RS256);
    header.kid = key.private_key_id.clone();

    let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .map_err(|e| ResolveError::token_exchange(step, e))?;
    let assertion = jsonwebtoken::encode(&header, &claims, &signing_key)
        .map_err(|e| ResolveError::token_exchange(step, e))?;

    post_token_request(
        http,
        &key.token_uri,
        &[("grant_type", JWT_BEARER_GRANT), ("assertion", &assertion)],
        "service account token",
    )
    .await
}

/// Exchanges an authorized user's refresh token for an access token
pub(crate) async fn authorized_user_token(
    json: &serde_json::Value,
    http: &reqwest::Client,
) -> Result<String, ResolveError> {
    let step = "refresh token grant";
    let user: AuthorizedUser = parse_section(json, step)?;
    post_token_request(
        http,
        &user.token_uri,
        &[
            ("grant_type", "refresh_token"),
            ("client_id", &user.client_id),
            ("client_secret", &user.client_secret),
            ("refresh_token", &user.refresh_token),
        ],
        step,
    )
    .await
}

/// Runs the authorization code exchange for an OAuth2 client configuration
///
/// The configuration may be nested under `installed` or `web`, or sit at the
/// top level.
pub(crate) async fn authorization_code_token(
    json: &serde_json::Value,
    http: &reqwest::Client,
) -> Result<String, ResolveError> {
    let step = "authorization code exchange";
    let section = json
        .get("installed")
        .or_else(|| json.get("web"))
        .unwrap_or(json);
    let client: OAuthClientConfig = parse_section(section, step)?;
    let redirect_uri = client.redirect_uris.first().map(String::as_str).unwrap_or("");

    post_token_request(
        http,
        &client.token_uri,
        &[
            ("grant_type", "authorization_code"),
            ("code", PLACEHOLDER_AUTHORIZATION_CODE),
            ("client_id", &client.client_id),
            ("client_secret", &client.client_secret),
            ("redirect_uri", redirect_uri),
        ],
        step,
    )
    .await
}

async fn post_token_request(
    http: &reqwest::Client,
    token_uri: &str,
    form: &[(&str, &str)],
    step: &str,
) -> Result<String, ResolveError> {
    let endpoint = url::Url::parse(token_uri)
        .map_err(|e| ResolveError::token_exchange(step, format!("invalid token_uri '{token_uri}': {e}")))?;
    tracing::debug!(step = step, token_uri = %endpoint, "Requesting access token");

    let response = http
        .post(endpoint)
        .form(form)
        .send()
        .await
        .map_err(|e| ResolveError::token_exchange(step, e))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ResolveError::token_exchange(
            step,
            format!("HTTP {status}: {body}"),
        ));
    }

    let token: TokenResponse = response
        .json()
        .await
        .map_err(|e| ResolveError::token_exchange(step, e))?;
    Ok(token.access_token)
}
