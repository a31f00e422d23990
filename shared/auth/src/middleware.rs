use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use rizqtutor_common::UserRole;

use crate::jwt::JwtService;

/// Authentication middleware for tutor-only routes. Validates the bearer
/// credential and requires the Tutor role; the resolved SessionUser is
/// inserted into request extensions for handlers.
pub async fn require_tutor_session(
    State(jwt_service): State<JwtService>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let token =
        extract_token_from_headers(request.headers()).ok_or(StatusCode::UNAUTHORIZED)?;

    let session = jwt_service
        .verify(&token)
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    if session.role != UserRole::Tutor {
        return Err(StatusCode::UNAUTHORIZED);
    }

    request.extensions_mut().insert(session);

    Ok(next.run(request).await)
}

/// Extract the session JWT from the Authorization header
fn extract_token_from_headers(headers: &HeaderMap) -> Option<String> {
    let auth_header = headers.get("Authorization")?;
    let auth_str = auth_header.to_str().ok()?;

    auth_str.strip_prefix("Bearer ").map(|t| t.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_token_is_extracted() {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", HeaderValue::from_static("Bearer abc123"));
        assert_eq!(extract_token_from_headers(&headers), Some("abc123".to_string()));
    }

    #[test]
    fn non_bearer_schemes_are_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", HeaderValue::from_static("Basic abc123"));
        assert_eq!(extract_token_from_headers(&headers), None);
        assert_eq!(extract_token_from_headers(&HeaderMap::new()), None);
    }
}
