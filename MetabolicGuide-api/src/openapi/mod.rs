use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

/// Configure Swagger UI endpoints
pub fn configure_swagger_routes() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())
}

/// Registers the bearer scheme referenced as `jwt_auth`
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "jwt_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

// API Documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        // Health endpoints
        crate::api::handlers::health::health_check,

        // Assessment endpoints
        crate::api::handlers::assessment::submit_assessment,
        crate::api::handlers::assessment::preview_assessment,
        crate::api::handlers::assessment::export_assessment,

        // Record endpoints
        crate::api::handlers::records::save_record,
        crate::api::handlers::records::list_records,
        crate::api::handlers::records::export_all_records,
        crate::api::handlers::records::get_record,
        crate::api::handlers::records::export_record,

        // Document endpoints
        crate::api::handlers::documents::preview_document,
        crate::api::handlers::documents::generate_pdf,

        // Auth endpoints
        metabolic_guide_domain::auth::routes::login,
        metabolic_guide_domain::auth::routes::logout
    ),
    components(
        schemas(
            // Entities
            crate::entities::common::ErrorResponse,
            crate::entities::common::RecordListQuery,
            crate::entities::assessment::AssessmentResponse,
            crate::entities::assessment::PreviewResponse,
            crate::entities::assessment::RiskSummary,
            crate::entities::assessment::SaveRecordRequest,
            crate::entities::assessment::DocumentPreviewResponse,

            // Health handlers
            crate::api::handlers::health::HealthResponse,
            crate::api::handlers::health::ComponentStatus,
            crate::api::handlers::health::ComponentHealthStatus,

            // Domain schemas
            metabolic_guide_domain::entities::AssessmentRequest,
            metabolic_guide_domain::entities::PatientProfile,
            metabolic_guide_domain::entities::MetabolicMetrics,
            metabolic_guide_domain::entities::RiskCategory,
            metabolic_guide_domain::entities::PatientRecord,
            metabolic_guide_domain::entities::DocumentDraft,
            metabolic_guide_domain::services::RecordPage,
            metabolic_guide_domain::services::metrics::MetricsPreviewRequest,
            metabolic_guide_domain::services::recommendations::RecommendationSource,

            // Auth schemas
            metabolic_guide_domain::auth::LoginRequest,
            metabolic_guide_domain::auth::LoginResponse,
            metabolic_guide_domain::auth::CurrentUser,
            metabolic_guide_domain::auth::routes::AuthErrorResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoint"),
        (name = "assessments", description = "Metabolic risk assessment, live preview and CSV export"),
        (name = "records", description = "Saved patient records"),
        (name = "documents", description = "Document preview and PDF generation"),
        (name = "Authentication", description = "Sign-in and bearer tokens")
    ),
    info(
        title = "MetabolicGuide API",
        version = "0.1.0",
        description = "Metabolic risk assessment, patient records and clinical documents",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        ),
    ),
    servers(
        (url = "/", description = "Local development server")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_doc_generation() {
        let openapi = ApiDoc::openapi();

        assert_eq!(openapi.info.title, "MetabolicGuide API");
        assert_eq!(openapi.info.version, "0.1.0");

        let tags = openapi.tags.as_ref().unwrap();
        assert!(tags.iter().any(|tag| tag.name == "assessments"));
        assert!(tags.iter().any(|tag| tag.name == "records"));

        for path in [
            "/health",
            "/auth/login",
            "/auth/logout",
            "/api/v1/assessments",
            "/api/v1/assessments/preview",
            "/api/v1/assessments/export",
            "/api/v1/records",
            "/api/v1/records/export",
            "/api/v1/records/{id}",
            "/api/v1/records/{id}/export",
            "/api/v1/documents/preview",
            "/api/v1/documents/pdf",
        ] {
            assert!(openapi.paths.paths.contains_key(path), "missing {}", path);
        }
    }

    #[test]
    fn test_bearer_scheme_registered() {
        let openapi = ApiDoc::openapi();
        let components = openapi.components.unwrap();
        assert!(components.security_schemes.contains_key("jwt_auth"));
    }
}
