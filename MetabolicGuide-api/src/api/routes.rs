use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Extension, Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use metabolic_guide_domain::auth::{auth_middleware, auth_routes, AuthState};

use crate::api::context::AppContext;
use crate::api::handlers::{assessment, documents, health, records};
use crate::openapi::configure_swagger_routes;

/// Create the application router
pub fn create_app(context: AppContext, cors_allow_origin: Option<&str>) -> Router {
    debug!("Creating application router");

    // Define specific routes before parametrized routes to avoid conflicts
    let api_routes = Router::new()
        .route("/assessments", post(assessment::submit_assessment))
        .route("/assessments/preview", post(assessment::preview_assessment))
        .route("/assessments/export", post(assessment::export_assessment))
        .route("/records", get(records::list_records).post(records::save_record))
        .route("/records/export", get(records::export_all_records))
        .route("/records/:id", get(records::get_record))
        .route("/records/:id/export", get(records::export_record))
        .route("/documents/preview", post(documents::preview_document))
        .route("/documents/pdf", post(documents::generate_pdf));

    debug!("API routes configured");

    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .layer(Extension(context.health.clone()));

    let auth_state = AuthState {
        service: context.auth.clone(),
        tokens: context.tokens.clone(),
    };

    let app = Router::new()
        .merge(public_routes)
        .nest("/auth", auth_routes().with_state(auth_state))
        .nest("/api/v1", api_routes)
        .with_state(context.clone())
        .merge(configure_swagger_routes());

    debug!("Routes and Swagger UI merged");

    // Every route sees the bearer token; handlers decide whether a user is required
    let app = app.layer(middleware::from_fn_with_state(
        context.tokens.clone(),
        auth_middleware,
    ));

    let app = configure_security(app, cors_allow_origin);
    debug!("Security configuration applied");

    app.layer(TraceLayer::new_for_http())
}

/// CORS and security response headers for the whole application
pub fn configure_security(app: Router, cors_allow_origin: Option<&str>) -> Router {
    let allow_origin = match cors_allow_origin.map(str::parse::<HeaderValue>) {
        None => AllowOrigin::any(),
        Some(Ok(origin)) => AllowOrigin::exact(origin),
        Some(Err(e)) => {
            warn!("Ignoring invalid CORS_ALLOW_ORIGIN: {}", e);
            AllowOrigin::any()
        }
    };

    let cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_DISPOSITION])
        .max_age(std::time::Duration::from_secs(3600));

    let security_headers = tower::ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::if_not_present(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static("max-age=63072000; includeSubDomains"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static("referrer-policy"),
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static("permissions-policy"),
            HeaderValue::from_static("camera=(), microphone=(), geolocation=()"),
        ));

    app.layer(cors).layer(security_headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    use metabolic_guide_domain::auth::token::TokenSettings;
    use metabolic_guide_domain::repository::PatientRecordRepository;
    use metabolic_guide_domain::services::RecommendationService;
    use metabolic_guide_domain::testing::MockAuthService;

    fn context() -> AppContext {
        AppContext::new(
            PatientRecordRepository::in_memory(),
            RecommendationService::rules_only(),
            Arc::new(MockAuthService::new()),
            TokenSettings::new("routes-secret", "test", chrono::Duration::minutes(5)),
        )
    }

    #[tokio::test]
    async fn test_security_headers_and_cors() {
        let app = create_app(context(), Some("https://clinic.example.org"));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header(header::ORIGIN, "https://clinic.example.org")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(headers[header::X_FRAME_OPTIONS], "DENY");
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://clinic.example.org"
        );
    }

    #[tokio::test]
    async fn test_invalid_bearer_is_rejected_everywhere() {
        let app = create_app(context(), None);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/records")
                    .header(header::AUTHORIZATION, "Bearer not-a-token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let app = create_app(context(), None);
        let response = app
            .oneshot(Request::builder().uri("/api/v1/nothing").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
