//! Caller identity extraction.
//!
//! Authentication itself lives in an upstream identity provider; by the time
//! a request reaches this service the gateway has already verified the caller
//! and forwarded the stable user id in `x-user-id`. The value is trusted
//! verbatim.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    Json,
};
use serde_json::json;
use uuid::Uuid;

pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated caller, resolved from the `x-user-id` header.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<serde_json::Value>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok());

        match header.map(Uuid::parse_str) {
            Some(Ok(user_id)) => Ok(AuthenticatedUser(user_id)),
            Some(Err(_)) => Err(reject("x-user-id header is not a valid UUID")),
            None => Err(reject("missing x-user-id header")),
        }
    }
}

fn reject(message: &str) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "error": message,
            "status": StatusCode::UNAUTHORIZED.as_u16(),
        })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, routing::get, Router};
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new().route(
            "/whoami",
            get(|user: AuthenticatedUser| async move { user.0.to_string() }),
        )
    }

    #[tokio::test]
    async fn extracts_user_id_from_header() {
        let user_id = Uuid::new_v4();
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/whoami")
                    .header(USER_ID_HEADER, user_id.to_string())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        let response = app()
            .oneshot(Request::builder().uri("/whoami").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn malformed_header_is_unauthorized() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/whoami")
                    .header(USER_ID_HEADER, "not-a-uuid")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
