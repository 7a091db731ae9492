//! Auth Gate
//!
//! Middleware for protected routes. Reads the bearer token, verifies it
//! against the session store and hands the resolved identity to the
//! handler as an [`AuthenticatedUser`] extension. It never changes session
//! state.

use crate::error::AuthError;
use crate::session::SessionManager;
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::debug;

/// Identity attached to requests that passed the gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub username: String,
    /// The bearer token the request presented
    pub token: String,
}

/// Pull the token out of `Authorization`.
///
/// Accepts `Bearer <token>` (scheme matched case-insensitively) and, for
/// older clients, a bare token.
pub fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();

    let token = match value.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        Some(_) => return None,
        None if value.eq_ignore_ascii_case("bearer") => return None,
        None => value,
    };

    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Gate middleware; any failure becomes a uniform 401
pub async fn auth_gate(
    State(sessions): State<SessionManager>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = match extract_bearer(request.headers()) {
        Some(token) => token.to_string(),
        None => {
            debug!("Rejected request without bearer token: {}", request.uri().path());
            return Err(AuthError::Unauthorized);
        }
    };

    let username = sessions
        .verify(&token)
        .await
        .map_err(|_| AuthError::Unauthorized)?;

    request
        .extensions_mut()
        .insert(AuthenticatedUser { username, token });
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_bearer_prefix() {
        assert_eq!(extract_bearer(&headers("Bearer abc.def.ghi")), Some("abc.def.ghi"));
        assert_eq!(extract_bearer(&headers("bearer abc.def.ghi")), Some("abc.def.ghi"));
        assert_eq!(extract_bearer(&headers("Bearer   abc.def.ghi  ")), Some("abc.def.ghi"));
    }

    #[test]
    fn test_bare_token() {
        assert_eq!(extract_bearer(&headers("abc.def.ghi")), Some("abc.def.ghi"));
    }

    #[test]
    fn test_missing_or_empty() {
        assert_eq!(extract_bearer(&HeaderMap::new()), None);
        assert_eq!(extract_bearer(&headers("")), None);
        assert_eq!(extract_bearer(&headers("Bearer ")), None);
        assert_eq!(extract_bearer(&headers("Bearer")), None);
    }

    #[test]
    fn test_other_schemes_rejected() {
        assert_eq!(extract_bearer(&headers("Basic YWRtaW46c2VjcmV0")), None);
    }
}
