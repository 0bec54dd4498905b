use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    routing::post,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

use crate::auth::logging::{
    log_access_denied, log_auth_event, log_failed_login, log_logout, log_successful_login, AuthEvent,
    AuthEventType,
};
use crate::auth::token::{self, TokenSettings};
use crate::auth::{AuthError, AuthServiceTrait, CurrentUser, LoginRequest, LoginResponse};

/// State shared by the authentication routes
#[derive(Clone)]
pub struct AuthState {
    pub service: Arc<dyn AuthServiceTrait>,
    pub tokens: Arc<TokenSettings>,
}

/// Authentication error response
#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct AuthErrorResponse {
    pub error: String,
    pub message: String,
}

fn auth_error(status: StatusCode, error: &str, message: impl Into<String>) -> Response {
    (
        status,
        Json(AuthErrorResponse {
            error: error.to_string(),
            message: message.into(),
        }),
    )
        .into_response()
}

/// Router with the login and logout routes
pub fn auth_routes() -> Router<AuthState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
}

/// Sign in and receive a bearer token
#[cfg_attr(feature = "with-api", utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = LoginResponse),
        (status = 400, description = "Missing email or password", body = AuthErrorResponse),
        (status = 401, description = "Invalid credentials", body = AuthErrorResponse),
        (status = 502, description = "Authentication backend unavailable", body = AuthErrorResponse)
    ),
    tag = "Authentication"
))]
pub async fn login(
    State(state): State<AuthState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Response {
    let start_time = Instant::now();
    let mode = state.service.mode();

    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            return auth_error(StatusCode::BAD_REQUEST, "bad_request", rejection.body_text());
        }
    };

    let user = match state.service.authenticate(&request).await {
        Ok(user) => user,
        Err(e) => {
            log_failed_login(request.email.trim(), mode, &e.to_string());
            return match e {
                AuthError::MissingEmail | AuthError::MissingPassword => {
                    auth_error(StatusCode::BAD_REQUEST, "validation_error", e.to_string())
                }
                AuthError::InvalidCredentials(_) => {
                    auth_error(StatusCode::UNAUTHORIZED, "unauthorized", e.to_string())
                }
                AuthError::Backend(_) => {
                    auth_error(StatusCode::BAD_GATEWAY, "backend_error", e.to_string())
                }
                AuthError::Token(_) => {
                    auth_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", e.to_string())
                }
            };
        }
    };

    let access_token = match token::generate_token(&state.tokens, &user) {
        Ok(token) => token,
        Err(e) => {
            error!("Failed to generate access token: {}", e);
            return auth_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Failed to generate access token",
            );
        }
    };

    log_successful_login(&user.email, mode);
    debug!(
        "Issued access token for {} in {}ms",
        user.email,
        start_time.elapsed().as_millis()
    );

    (
        StatusCode::OK,
        Json(LoginResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: state.tokens.expires_in(),
            user,
            mode: mode.to_string(),
        }),
    )
        .into_response()
}

/// End the session. Tokens are stateless, so the client discards its token.
#[cfg_attr(feature = "with-api", utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 204, description = "Signed out"),
        (status = 401, description = "Not signed in", body = AuthErrorResponse)
    ),
    tag = "Authentication",
    security(("jwt_auth" = []))
))]
pub async fn logout(user: Option<Extension<CurrentUser>>) -> Response {
    match user {
        Some(Extension(user)) => {
            log_logout(&user.email);
            StatusCode::NO_CONTENT.into_response()
        }
        None => {
            log_access_denied("/auth/logout", "No bearer token");
            auth_error(StatusCode::UNAUTHORIZED, "unauthorized", "Not signed in")
        }
    }
}

/// Attach the [`CurrentUser`] of a valid bearer token to the request.
///
/// Requests without an `Authorization` header pass through anonymously;
/// a header that does not hold a valid bearer token is rejected with 401.
pub async fn auth_middleware(
    State(tokens): State<Arc<TokenSettings>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let request_path = req.uri().path().to_string();
    let start_time = Instant::now();

    let auth_header = match req.headers().get(header::AUTHORIZATION) {
        None => return next.run(req).await,
        Some(value) => value.to_str().unwrap_or_default().to_string(),
    };

    let reject = |details: String| {
        warn!("Rejected bearer token on {}: {}", request_path, details);
        log_auth_event(
            AuthEvent::new(AuthEventType::TokenValidation, None, false)
                .with_details(details)
                .with_resource(request_path.clone())
                .with_duration(start_time.elapsed().as_millis() as u64)
                .with_auth_method("jwt"),
        );
        auth_error(StatusCode::UNAUTHORIZED, "unauthorized", "Invalid or expired token")
    };

    let Some(bearer) = auth_header.strip_prefix("Bearer ") else {
        return reject("Authorization header does not contain Bearer token".to_string());
    };

    match token::validate_token(&tokens, bearer.trim()) {
        Ok(claims) => {
            debug!("Token validated for user: {}", claims.sub);
            req.extensions_mut().insert(CurrentUser::from(&claims));
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        Err(e) => reject(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::DemoAuthService;
    use axum::body::to_bytes;
    use axum::middleware;
    use chrono::Duration;
    use tower::util::ServiceExt;

    const BODY_SIZE_LIMIT: usize = 1024 * 1024;

    fn app() -> (Router, Arc<TokenSettings>) {
        let tokens = Arc::new(TokenSettings::new("route-test-secret", "test", Duration::minutes(5)));
        let state = AuthState {
            service: Arc::new(DemoAuthService),
            tokens: tokens.clone(),
        };
        let router = auth_routes()
            .with_state(state)
            .layer(middleware::from_fn_with_state(tokens.clone(), auth_middleware));
        (router, tokens)
    }

    fn post(uri: &str, body: Option<&str>, bearer: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder
            .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
            .unwrap()
    }

    #[tokio::test]
    async fn test_login_issues_valid_token() {
        let (app, tokens) = app();
        let response = app
            .oneshot(post("/login", Some(r#"{"email":"doc@example.org"}"#), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), BODY_SIZE_LIMIT).await.unwrap();
        let login: LoginResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(login.token_type, "Bearer");
        assert_eq!(login.mode, "demo");
        assert_eq!(login.user.email, "doc@example.org");
        assert_eq!(login.expires_in, 300);

        let claims = token::validate_token(&tokens, &login.access_token).unwrap();
        assert_eq!(claims.sub, "doc@example.org");
    }

    #[tokio::test]
    async fn test_login_requires_email() {
        let (app, _) = app();
        let response = app
            .oneshot(post("/login", Some(r#"{"email":"  "}"#), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_logout_needs_token() {
        let (app, tokens) = app();

        let response = app.clone().oneshot(post("/logout", None, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let token = token::generate_token(&tokens, &CurrentUser::new("doc@example.org")).unwrap();
        let response = app.oneshot(post("/logout", None, Some(&token))).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_invalid_bearer_is_rejected() {
        let (app, _) = app();
        let response = app
            .oneshot(post("/logout", None, Some("not-a-token")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = to_bytes(response.into_body(), BODY_SIZE_LIMIT).await.unwrap();
        let error: AuthErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.error, "unauthorized");
    }
}
