use axum::{
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
    body::Body,
};
use tracing::warn;

use shared_models::error::AppError;

use crate::admin::ADMIN_PASSWORD_HEADER;
use crate::state::AppState;

// Guards the admin routers; delegates the decision to the injected authenticator.
pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let credential = request
        .headers()
        .get(ADMIN_PASSWORD_HEADER)
        .and_then(|value| value.to_str().ok());

    if !state.admin_auth.authorize(credential) {
        warn!("Rejected admin request to {}", request.uri().path());
        return Err(AppError::Auth("Unauthorized".to_string()));
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{middleware, routing::get, Router};
    use axum::http::StatusCode;
    use tower::ServiceExt;

    use crate::test_utils::{test_state, TEST_ADMIN_PASSWORD};

    fn guarded() -> Router {
        let state = test_state();
        Router::new()
            .route("/admin", get(|| async { "ok" }))
            .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
            .with_state(state)
    }

    #[tokio::test]
    async fn test_missing_header_is_unauthorized() {
        let request = Request::builder().uri("/admin").body(Body::empty()).unwrap();
        let response = guarded().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_correct_password_passes() {
        let request = Request::builder()
            .uri("/admin")
            .header(ADMIN_PASSWORD_HEADER, TEST_ADMIN_PASSWORD)
            .body(Body::empty())
            .unwrap();
        let response = guarded().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
