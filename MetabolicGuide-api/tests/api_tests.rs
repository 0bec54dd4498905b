use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use metabolic_guide_api::{create_application, AppContext};
use metabolic_guide_domain::auth::token::TokenSettings;
use metabolic_guide_domain::health::HealthService;
use metabolic_guide_domain::repository::PatientRecordRepository;
use metabolic_guide_domain::services::recommendations::RECOMMENDATION_ERROR_MESSAGE;
use metabolic_guide_domain::services::{
    AssessmentService, PrintPdfRenderer, RecommendationService,
};
use metabolic_guide_domain::testing::{
    MockAuthService, MockPatientRecordRepository, MockRecommendationProvider,
};

fn tokens() -> TokenSettings {
    TokenSettings::new("integration-secret", "metabolic-guide-test", chrono::Duration::minutes(10))
}

fn app_with(recommendations: RecommendationService) -> Router {
    let context = AppContext::new(
        PatientRecordRepository::in_memory(),
        recommendations,
        Arc::new(MockAuthService::new().rejecting("intruder@example.org")),
        tokens(),
    );
    create_application(context, None)
}

fn app() -> Router {
    app_with(RecommendationService::rules_only())
}

/// App over a shared mock repository so tests can inspect what was stored
fn app_with_repository(repository: MockPatientRecordRepository) -> Router {
    app_with_repository_and_auth(repository, MockAuthService::new())
}

fn app_with_repository_and_auth(repository: MockPatientRecordRepository, auth: MockAuthService) -> Router {
    let context = AppContext {
        assessments: Arc::new(AssessmentService::new(
            repository,
            RecommendationService::rules_only(),
        )),
        health: Arc::new(HealthService::new(PatientRecordRepository::in_memory(), false)),
        auth: Arc::new(auth),
        tokens: Arc::new(tokens()),
        pdf: Arc::new(PrintPdfRenderer),
    };
    create_application(context, None)
}

fn patient(name: &str) -> Value {
    json!({
        "full_name": name,
        "age": 45,
        "gender": "Female",
        "weight": 70,
        "height": 1.65,
        "fasting_glucose": 100,
        "triglycerides": 150,
        "hdl": 50,
        "hba1c": 5.6,
        "diabetes_status": "No"
    })
}

fn request(method: Method, uri: &str, body: Option<Value>, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder
        .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

async fn login(app: &Router, email: &str) -> String {
    let response = send(
        app,
        request(Method::POST, "/auth/login", Some(json!({ "email": email })), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["access_token"]
        .as_str()
        .unwrap()
        .to_string()
}

fn header_value(response: &Response, name: header::HeaderName) -> String {
    response.headers()[name].to_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_endpoint() {
    let response = send(&app(), request(Method::GET, "/health", None, None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["components"]["storage"]["status"], "ok");
    assert_eq!(body["components"]["recommendations"]["message"], "Rule table only");
}

#[tokio::test]
async fn test_submit_assessment_with_rule_recommendations() {
    let response = send(
        &app(),
        request(Method::POST, "/api/v1/assessments", Some(patient("Jane Doe")), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["patient"]["full_name"], "Jane Doe");
    assert_eq!(body["metrics"]["bmi"], 25.7);
    assert_eq!(body["metrics"]["tyg_index"], 8.92);
    assert_eq!(body["metrics"]["tg_hdl_ratio"], 3.0);
    assert_eq!(body["risk"]["category"], "High");
    assert_eq!(body["risk"]["level"], "High Risk");
    assert_eq!(body["recommendations_source"], "rules");
    assert!(body["recommendations_html"].as_str().unwrap().starts_with("<p>"));
    assert!(body.get("recommendations_error").is_none());
}

#[tokio::test]
async fn test_ai_recommendations_are_formatted() {
    let provider = MockRecommendationProvider::replying("**Diet**: more fiber\n\nWalk daily");
    let app = app_with(RecommendationService::new(Arc::new(provider)));

    let body = body_json(
        send(&app, request(Method::POST, "/api/v1/assessments", Some(patient("Jane Doe")), None)).await,
    )
    .await;

    assert_eq!(body["recommendations_source"], "ai");
    assert_eq!(
        body["recommendations_html"],
        "<p><strong>Diet</strong>: more fiber</p><p>Walk daily</p>"
    );
}

#[tokio::test]
async fn test_failed_recommendations_fall_back_to_rules() {
    let app = app_with(RecommendationService::new(Arc::new(MockRecommendationProvider::failing())));

    let response = send(
        &app,
        request(Method::POST, "/api/v1/assessments", Some(patient("Jane Doe")), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["recommendations_source"], "rules");
    assert_eq!(body["recommendations_error"], RECOMMENDATION_ERROR_MESSAGE);
    assert!(!body["recommendations_html"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_fields_are_rejected() {
    let mut incomplete = patient("Jane Doe");
    incomplete.as_object_mut().unwrap().remove("age");
    incomplete["gender"] = json!("   ");

    let response = send(
        &app(),
        request(Method::POST, "/api/v1/assessments", Some(incomplete), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"], "validation_error");
    let message = body["message"].as_str().unwrap();
    assert!(message.contains("Age is required"));
    assert!(message.contains("Gender is required"));
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let response = send(
        &app(),
        Request::builder()
            .method(Method::POST)
            .uri("/api/v1/assessments")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"age\": \"forty\""))
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "bad_request");
}

#[tokio::test]
async fn test_live_preview() {
    let app = app();

    let partial = body_json(
        send(
            &app,
            request(
                Method::POST,
                "/api/v1/assessments/preview",
                Some(json!({ "weight": 70, "height": 1.65 })),
                None,
            ),
        )
        .await,
    )
    .await;
    assert!(partial["metrics"].is_null());
    assert!(partial["risk"].is_null());

    let complete = body_json(
        send(
            &app,
            request(
                Method::POST,
                "/api/v1/assessments/preview",
                Some(json!({
                    "weight": 70,
                    "height": 1.65,
                    "fasting_glucose": 90,
                    "triglycerides": 60,
                    "hdl": 60
                })),
                None,
            ),
        )
        .await,
    )
    .await;
    assert_eq!(complete["metrics"]["bmi"], 25.7);
    assert_eq!(complete["metrics"]["tyg_index"], 7.9);
    assert_eq!(complete["risk"]["category"], "Low");
}

#[tokio::test]
async fn test_export_assessment_csv() {
    let response = send(
        &app(),
        request(Method::POST, "/api/v1/assessments/export", Some(patient("Jane Doe")), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_value(&response, header::CONTENT_TYPE), "text/csv; charset=utf-8");
    assert_eq!(
        header_value(&response, header::CONTENT_DISPOSITION),
        "attachment; filename=\"jane_doe_metabolic_assessment.csv\""
    );

    let csv = body_text(response).await;
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 16);
    assert_eq!(lines[0], "Field,Value");
    assert_eq!(lines[1], "Patient Name,Jane Doe");
    assert!(lines[14].starts_with("Risk Level,High Risk"));
}

#[tokio::test]
async fn test_save_requires_login_and_stores_nothing() {
    let repository = MockPatientRecordRepository::new();
    let app = app_with_repository(repository.clone());

    let response = send(
        &app,
        request(Method::POST, "/api/v1/records", Some(patient("Jane Doe")), None),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["message"], "Please login to save results");
    assert!(repository.is_empty());
}

#[tokio::test]
async fn test_save_uses_remote_session_from_login() {
    let repository = MockPatientRecordRepository::new();
    let app = app_with_repository_and_auth(
        repository.clone(),
        MockAuthService::new().with_session("remote-session"),
    );

    let response = send(
        &app,
        request(Method::POST, "/auth/login", Some(json!({ "email": "doc@example.org" })), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["user"], json!({ "email": "doc@example.org" }));
    let token = body["access_token"].as_str().unwrap().to_string();

    let response = send(
        &app,
        request(Method::POST, "/api/v1/records", Some(patient("Jane Doe")), Some(&token)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(repository.session_tokens(), vec![Some("remote-session".to_string())]);
}

#[tokio::test]
async fn test_storage_failure_is_bad_gateway() {
    let app = app_with_repository(MockPatientRecordRepository::failing("store offline"));
    let token = login(&app, "doc@example.org").await;

    let response = send(
        &app,
        request(Method::POST, "/api/v1/records", Some(patient("Jane Doe")), Some(&token)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(body_json(response).await["error"], "backend_error");

    let response = send(&app, request(Method::GET, "/api/v1/records", None, None)).await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_rejected_login() {
    let response = send(
        &app(),
        request(
            Method::POST,
            "/auth/login",
            Some(json!({ "email": "intruder@example.org", "password": "guess" })),
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_save_list_view_and_export_records() {
    let app = app();
    let token = login(&app, "doc@example.org").await;

    for name in ["Jane Doe", "John Smith"] {
        let mut body = patient(name);
        body["recommendations_html"] = json!("<p>Keep walking</p>");
        let response = send(&app, request(Method::POST, "/api/v1/records", Some(body), Some(&token))).await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let saved = body_json(response).await;
        assert_eq!(saved["full_name"], name);
        assert_eq!(saved["created_by"], "doc@example.org");
        assert_eq!(saved["risk_level"], "High Risk");
        assert_eq!(saved["ai_recommendations"], "<p>Keep walking</p>");
    }

    // Newest first
    let page = body_json(send(&app, request(Method::GET, "/api/v1/records", None, None)).await).await;
    assert_eq!(page["total"], 2);
    assert_eq!(page["records"][0]["full_name"], "John Smith");
    assert_eq!(page["records"][1]["full_name"], "Jane Doe");

    let search = body_json(
        send(&app, request(Method::GET, "/api/v1/records?search=JANE", None, None)).await,
    )
    .await;
    assert_eq!(search["total"], 1);
    assert_eq!(search["records"][0]["full_name"], "Jane Doe");

    let limited = body_json(
        send(&app, request(Method::GET, "/api/v1/records?limit=1&offset=1", None, None)).await,
    )
    .await;
    assert_eq!(limited["total"], 2);
    assert_eq!(limited["records"].as_array().unwrap().len(), 1);
    assert_eq!(limited["records"][0]["full_name"], "Jane Doe");

    let id = search["records"][0]["id"].as_str().unwrap().to_string();
    let record = send(&app, request(Method::GET, &format!("/api/v1/records/{}", id), None, None)).await;
    assert_eq!(record.status(), StatusCode::OK);
    assert_eq!(body_json(record).await["id"], id.as_str());

    let export = send(
        &app,
        request(Method::GET, &format!("/api/v1/records/{}/export", id), None, None),
    )
    .await;
    assert_eq!(export.status(), StatusCode::OK);
    assert_eq!(
        header_value(&export, header::CONTENT_DISPOSITION),
        "attachment; filename=\"jane_doe_metabolic_assessment.csv\""
    );
    assert!(body_text(export).await.starts_with("Field,Value"));

    let all = send(&app, request(Method::GET, "/api/v1/records/export", None, None)).await;
    assert_eq!(all.status(), StatusCode::OK);
    assert_eq!(
        header_value(&all, header::CONTENT_DISPOSITION),
        "attachment; filename=\"all_patient_records.csv\""
    );
    let csv = body_text(all).await;
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("Name,Age,Gender,Weight,Height,BMI"));
    assert!(lines[1].starts_with("John Smith,"));
}

#[tokio::test]
async fn test_unknown_record_and_empty_export() {
    let app = app();

    let response = send(&app, request(Method::GET, "/api/v1/records/missing", None, None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "not_found");

    let response = send(&app, request(Method::GET, "/api/v1/records/export", None, None)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["message"], "No patient records to export");
}

#[tokio::test]
async fn test_logout() {
    let app = app();
    let token = login(&app, "doc@example.org").await;

    let response = send(&app, request(Method::POST, "/auth/logout", None, Some(&token))).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(&app, request(Method::POST, "/auth/logout", None, None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_document_preview() {
    let response = send(
        &app(),
        request(
            Method::POST,
            "/api/v1/documents/preview",
            Some(json!({ "title": "Notes", "content": "A\n\n• x\n• y" })),
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["html"],
        "<p>A</p>\n<ul><li>x</li><li>y</li></ul>"
    );
}

#[tokio::test]
async fn test_document_pdf() {
    let app = app();

    let response = send(
        &app,
        request(
            Method::POST,
            "/api/v1/documents/pdf",
            Some(json!({
                "title": "Visit Summary",
                "subject": "Follow-up",
                "author": "Dr. Smith",
                "content": "Patient doing well.\n\n• Continue diet\n• Recheck in 3 months"
            })),
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_value(&response, header::CONTENT_TYPE), "application/pdf");
    assert_eq!(
        header_value(&response, header::CONTENT_DISPOSITION),
        "attachment; filename=\"visit_summary.pdf\""
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(bytes.starts_with(b"%PDF"));

    let response = send(
        &app,
        request(
            Method::POST,
            "/api/v1/documents/pdf",
            Some(json!({ "title": "Empty", "content": "  " })),
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let response = send(&app(), request(Method::GET, "/api-docs/openapi.json", None, None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let doc = body_json(response).await;
    assert_eq!(doc["info"]["title"], "MetabolicGuide API");
    assert!(doc["paths"]["/api/v1/records/{id}/export"].is_object());
}
