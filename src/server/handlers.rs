//! HTTP request handlers for the vault API.
//!
//! Every vault call runs on the blocking pool: key derivation is
//! deliberately slow and must not stall the async workers.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::KeyVaultError;
use crate::providers::{self, ProviderTemplate};
use crate::vault::{KeyListing, KeyOptions};

use super::auth::SessionContext;
use super::error::ApiError;
use super::AppState;

/// Shortest key `POST /api/validate-key` accepts.
const MIN_KEY_LEN: usize = 10;
/// Longest key `POST /api/validate-key` accepts.
const MAX_KEY_LEN: usize = 500;

// ── Request / response bodies ────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    pub master_password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct KeysResponse {
    pub keys: KeyListing,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddKeyRequest {
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub key_name: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub metadata: Option<KeyOptions>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyResponse {
    pub api_key: String,
}

#[derive(Debug, Serialize)]
pub struct ProvidersResponse {
    pub providers: Vec<ProviderTemplate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateKeyRequest {
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ValidateKeyResponse {
    pub valid: bool,
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub vault_exists: bool,
    pub active_sessions: usize,
    pub timestamp: String,
}

// ── Helpers ──────────────────────────────────────────────────────────

/// Run a vault operation on the blocking pool.
async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> crate::errors::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::from(KeyVaultError::Server(format!("worker task failed: {e}"))))?
        .map_err(ApiError::from)
}

/// Treat absent and blank fields the same way.
fn required(field: Option<String>) -> Option<String> {
    field.filter(|v| !v.trim().is_empty())
}

// ── Auth ─────────────────────────────────────────────────────────────

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(body) = body?;
    let sessions = state.sessions.clone();
    let password = zeroize::Zeroizing::new(body.master_password);
    let token = blocking(move || sessions.login(&password)).await?;

    Ok(Json(LoginResponse {
        token,
        message: "Authenticated successfully".to_string(),
    }))
}

/// POST /api/auth/logout
pub async fn logout(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
) -> Json<MessageResponse> {
    state.sessions.logout(&session.token);
    Json(MessageResponse {
        message: "Logged out successfully".to_string(),
    })
}

// ── Keys ─────────────────────────────────────────────────────────────

/// GET /api/keys
pub async fn list_keys(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
) -> Result<Json<KeysResponse>, ApiError> {
    let store = state.store.clone();
    let keys = blocking(move || store.list_keys(session.password.as_bytes())).await?;
    Ok(Json(KeysResponse { keys }))
}

/// POST /api/keys
pub async fn add_key(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    body: Result<Json<AddKeyRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(body) = body?;
    let (Some(provider), Some(key_name), Some(api_key)) = (
        required(body.provider),
        required(body.key_name),
        required(body.api_key),
    ) else {
        return Err(ApiError::bad_request(
            "Provider, keyName, and apiKey are required",
        ));
    };

    if !providers::validate_format(&provider, &api_key) {
        return Err(ApiError::bad_request(format!(
            "Invalid API key format for {provider}"
        )));
    }

    let store = state.store.clone();
    let options = body.metadata.unwrap_or_default();
    blocking(move || {
        store.add_key(
            &provider,
            &key_name,
            &api_key,
            session.password.as_bytes(),
            options,
        )
    })
    .await?;

    Ok(Json(MessageResponse {
        message: "API key added successfully".to_string(),
    }))
}

/// GET /api/keys/{provider}/{key_name}
pub async fn get_key(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path((provider, key_name)): Path<(String, String)>,
) -> Result<Json<ApiKeyResponse>, ApiError> {
    let store = state.store.clone();
    let api_key =
        blocking(move || store.get_key(&provider, &key_name, session.password.as_bytes())).await?;
    Ok(Json(ApiKeyResponse { api_key }))
}

/// DELETE /api/keys/{provider}/{key_name}
pub async fn delete_key(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path((provider, key_name)): Path<(String, String)>,
) -> Result<Json<MessageResponse>, ApiError> {
    let store = state.store.clone();
    let deleted =
        blocking(move || store.delete_key(&provider, &key_name, session.password.as_bytes()))
            .await?;

    if !deleted {
        return Err(ApiError::not_found("API key not found"));
    }
    Ok(Json(MessageResponse {
        message: "API key deleted successfully".to_string(),
    }))
}

// ── Catalogue ────────────────────────────────────────────────────────

/// GET /api/providers
pub async fn list_providers() -> Json<ProvidersResponse> {
    let providers = providers::PROVIDERS
        .iter()
        .map(ProviderTemplate::from)
        .collect();
    Json(ProvidersResponse { providers })
}

/// POST /api/validate-key
///
/// A length sanity check only; format matching happens on `POST /api/keys`.
pub async fn validate_key(
    body: Result<Json<ValidateKeyRequest>, JsonRejection>,
) -> Result<Json<ValidateKeyResponse>, ApiError> {
    let Json(body) = body?;
    let (Some(_provider), Some(api_key)) = (required(body.provider), required(body.api_key))
    else {
        return Err(ApiError::bad_request("Provider and apiKey are required"));
    };

    Ok(Json(check_key_length(&api_key)))
}

fn check_key_length(api_key: &str) -> ValidateKeyResponse {
    let len = api_key.trim().chars().count();
    let (valid, reason) = if len < MIN_KEY_LEN {
        (false, format!("Too short (minimum {MIN_KEY_LEN} characters)"))
    } else if len > MAX_KEY_LEN {
        (false, format!("Too long (maximum {MAX_KEY_LEN} characters)"))
    } else {
        (true, "Valid".to_string())
    };
    ValidateKeyResponse { valid, reason }
}

/// GET /api/export/shell
pub async fn export_shell(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
) -> Result<Response, ApiError> {
    let store = state.store.clone();
    let script = blocking(move || {
        let password = session.password.as_bytes();
        let listing = store.list_keys(password)?;
        Ok(providers::export_shell(&listing, |provider, key_name| {
            store.get_key(provider, key_name, password)
        }))
    })
    .await?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/x-sh"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"api_keys.sh\"",
            ),
        ],
        script,
    )
        .into_response())
}

// ── Health ───────────────────────────────────────────────────────────

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        vault_exists: state.store.exists(),
        active_sessions: state.sessions.active_count(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_length_bounds() {
        assert!(!check_key_length("short").valid);
        assert!(check_key_length("exactly-10").valid);
        assert!(check_key_length(&"k".repeat(500)).valid);

        let long = check_key_length(&"k".repeat(501));
        assert!(!long.valid);
        assert!(long.reason.contains("500"));
    }

    #[test]
    fn length_check_ignores_surrounding_whitespace() {
        assert!(!check_key_length("   abc   \n").valid);
    }

    #[test]
    fn blank_fields_count_as_missing() {
        assert_eq!(required(None), None);
        assert_eq!(required(Some("  ".into())), None);
        assert_eq!(required(Some("openai".into())), Some("openai".into()));
    }
}
