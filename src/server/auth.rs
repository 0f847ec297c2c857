//! Bearer-token middleware for the vault API.
//!
//! The token is looked up in the `SessionRegistry`; on success the
//! resolved session is attached to the request as a [`SessionContext`]
//! extension for handlers to pick up.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use zeroize::Zeroizing;

use super::error::ApiError;
use super::AppState;

/// The authenticated session behind a request.
#[derive(Clone)]
pub struct SessionContext {
    pub token: String,
    pub password: Zeroizing<String>,
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("token", &"[redacted]")
            .field("password", &"[redacted]")
            .finish()
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    header
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Reject requests without a live session token.
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok());

    let Some(token) = bearer_token(header).map(str::to_owned) else {
        return Err(ApiError::unauthorized("Authentication required"));
    };

    let password = state.sessions.resolve(&token)?;
    request
        .extensions_mut()
        .insert(SessionContext { token, password });

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_token_strips_prefix() {
        assert_eq!(bearer_token(Some("Bearer abc123")), Some("abc123"));
    }

    #[test]
    fn bearer_token_rejects_other_schemes() {
        assert_eq!(bearer_token(Some("Basic abc123")), None);
        assert_eq!(bearer_token(Some("abc123")), None);
        assert_eq!(bearer_token(None), None);
    }

    #[test]
    fn bearer_token_rejects_empty_token() {
        assert_eq!(bearer_token(Some("Bearer ")), None);
        assert_eq!(bearer_token(Some("Bearer    ")), None);
    }

    #[test]
    fn session_context_debug_redacts_secrets() {
        let ctx = SessionContext {
            token: "tok-123".into(),
            password: Zeroizing::new("hunter2".into()),
        };
        let debug_output = format!("{ctx:?}");
        assert!(!debug_output.contains("tok-123"));
        assert!(!debug_output.contains("hunter2"));
    }
}
