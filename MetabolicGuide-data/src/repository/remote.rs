use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use tracing::{debug, error};

use crate::models::{PatientRecord, RemoteSession};
use super::errors::RepositoryError;

const RECORDS_PATH: &str = "/rest/v1/patient_records";
const TOKEN_PATH: &str = "/auth/v1/token?grant_type=password";

/// Connection settings for the hosted REST store
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteStoreConfig {
    /// Project base URL, e.g. `https://abc.supabase.co`
    pub base_url: String,
    /// Public (anon) API key
    pub api_key: String,
    /// Request timeout
    pub timeout: Duration,
}

/// Client for a PostgREST-style `patient_records` collection plus its
/// password sign-in endpoint
#[derive(Debug, Clone)]
pub struct RemoteStore {
    client: Client,
    config: RemoteStoreConfig,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    user: Option<TokenUser>,
}

#[derive(Debug, Deserialize)]
struct TokenUser {
    email: Option<String>,
}

impl RemoteStore {
    pub fn new(config: RemoteStoreConfig) -> Result<Self, RepositoryError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// The anon key always goes in `apikey`; the bearer is the user's
    /// session token when there is one, so row-level policies see that user
    fn authorized(&self, builder: RequestBuilder, session_token: Option<&str>) -> RequestBuilder {
        builder
            .header("apikey", &self.config.api_key)
            .bearer_auth(session_token.unwrap_or(&self.config.api_key))
    }

    fn insert_request(&self, record: &PatientRecord, session_token: Option<&str>) -> RequestBuilder {
        self.authorized(self.client.post(self.url(RECORDS_PATH)), session_token)
            .header("Prefer", "return=representation")
            .json(&[record])
    }

    /// Insert one record as the signed-in user and return the stored
    /// representation
    pub async fn insert(
        &self,
        record: &PatientRecord,
        session_token: Option<&str>,
    ) -> Result<PatientRecord, RepositoryError> {
        debug!(
            "Inserting patient record into remote store: id={}, user session={}",
            record.id,
            session_token.is_some()
        );

        let response = self.insert_request(record, session_token).send().await?;

        let mut stored: Vec<PatientRecord> = check_status(response).await?.json().await?;
        Ok(stored.pop().unwrap_or_else(|| record.clone()))
    }

    /// All records, newest first
    pub async fn list(&self) -> Result<Vec<PatientRecord>, RepositoryError> {
        debug!("Listing patient records from remote store");

        let response = self
            .authorized(self.client.get(self.url(RECORDS_PATH)), None)
            .query(&[("select", "*"), ("order", "created_at.desc")])
            .send()
            .await?;

        Ok(check_status(response).await?.json().await?)
    }

    /// One record by id
    pub async fn get_by_id(&self, id: &str) -> Result<Option<PatientRecord>, RepositoryError> {
        debug!("Fetching patient record from remote store: id={}", id);

        let filter = format!("eq.{}", id);
        let response = self
            .authorized(self.client.get(self.url(RECORDS_PATH)), None)
            .query(&[("select", "*"), ("id", filter.as_str())])
            .send()
            .await?;

        let mut records: Vec<PatientRecord> = check_status(response).await?.json().await?;
        Ok(records.pop())
    }

    /// Password sign-in against the store's auth endpoint
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<RemoteSession, RepositoryError> {
        debug!("Signing in to remote store: email={}", email);

        let response = self
            .client
            .post(self.url(TOKEN_PATH))
            .header("apikey", &self.config.api_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::BAD_REQUEST || status == reqwest::StatusCode::UNAUTHORIZED {
            let message = response.text().await.unwrap_or_default();
            return Err(RepositoryError::Unauthorized(extract_message(&message)));
        }

        let token: TokenResponse = check_status(response).await?.json().await?;
        Ok(RemoteSession {
            access_token: token.access_token,
            email: token
                .user
                .and_then(|user| user.email)
                .unwrap_or_else(|| email.to_string()),
        })
    }
}

async fn check_status(response: Response) -> Result<Response, RepositoryError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = extract_message(&body);
    error!("Remote store returned {}: {}", status, message);
    Err(RepositoryError::Remote {
        status: status.as_u16(),
        message,
    })
}

/// Pull a readable message out of a PostgREST / GoTrue error body
fn extract_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            ["message", "error_description", "msg", "error"]
                .iter()
                .find_map(|key| value.get(*key).and_then(|v| v.as_str()).map(str::to_string))
        })
        .unwrap_or_else(|| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::patient_record::sample_request;

    fn store(base_url: &str) -> RemoteStore {
        RemoteStore::new(RemoteStoreConfig {
            base_url: base_url.to_string(),
            api_key: "anon".to_string(),
            timeout: Duration::from_secs(1),
        })
        .unwrap()
    }

    #[test]
    fn test_url_joins_without_double_slash() {
        let store = store("https://example.supabase.co/");
        assert_eq!(
            store.url(RECORDS_PATH),
            "https://example.supabase.co/rest/v1/patient_records"
        );
    }

    #[test]
    fn test_extract_message_prefers_json_fields() {
        assert_eq!(extract_message(r#"{"message":"permission denied"}"#), "permission denied");
        assert_eq!(
            extract_message(r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#),
            "Invalid login credentials"
        );
        assert_eq!(extract_message("  bad gateway "), "bad gateway");
    }

    #[test]
    fn test_insert_uses_user_session_as_bearer() {
        let store = store("https://example.supabase.co");
        let record = sample_request("Jane", "2024-01-01T00:00:00Z").into_record("rec-1".to_string());

        let request = store.insert_request(&record, Some("user-session")).build().unwrap();
        let headers = request.headers();
        assert_eq!(headers["authorization"].to_str().unwrap(), "Bearer user-session");
        assert_eq!(headers["apikey"].to_str().unwrap(), "anon");
        assert_eq!(headers["prefer"].to_str().unwrap(), "return=representation");

        let request = store.insert_request(&record, None).build().unwrap();
        assert_eq!(request.headers()["authorization"].to_str().unwrap(), "Bearer anon");
    }

    #[tokio::test]
    async fn test_unreachable_store_reports_http_error() {
        let store = store("http://127.0.0.1:9");
        let result = store.list().await;
        assert!(matches!(result, Err(RepositoryError::Http(_))));
    }
}
