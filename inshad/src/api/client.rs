//! HTTP client for the conversion service

use inshad_common::api::{
    GenerateRequest, GenerateResponse, JobStatusResponse, SubmitTextRequest, SubmitTextResponse,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("inshad/", env!("CARGO_PKG_VERSION"));
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Conversion service client errors
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Explicit session credential, injected wherever remote calls are made.
///
/// Replaces ambient token state: the lifecycle is {absent, present} and the
/// value travels with the client instead of living in a global. Without a
/// token, authenticated endpoints fail as ordinary API errors; the remote
/// does not distinguish missing auth from other rejections for us.
#[derive(Debug, Clone, Default)]
pub struct Session {
    token: Option<String>,
}

impl Session {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }

    /// Session with no credential; public catalog endpoints still work
    pub fn anonymous() -> Self {
        Self { token: None }
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Value of the `Authorization` header, when a token is present
    fn authorization(&self) -> Option<String> {
        self.token.as_ref().map(|t| format!("Token {}", t))
    }
}

/// Conversion service API client
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Session,
}

impl ApiClient {
    /// Create a client for the given service base URL and session.
    ///
    /// # Errors
    /// Fails if the underlying HTTP client cannot be constructed.
    pub fn new(base_url: impl Into<String>, session: Session) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self {
            http,
            base_url,
            session,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.session.authorization() {
            Some(value) => req.header(reqwest::header::AUTHORIZATION, value),
            None => req,
        }
    }

    async fn read_ok(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Api(status.as_u16(), body));
        }
        Ok(response)
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self
            .authorize(self.http.get(self.url(path)))
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Self::read_ok(response)
            .await?
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))
    }

    pub(crate) async fn get_json_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let response = self
            .authorize(self.http.get(self.url(path)).query(query))
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Self::read_ok(response)
            .await?
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self
            .authorize(self.http.post(self.url(path)).json(body))
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Self::read_ok(response)
            .await?
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))
    }

    /// Submit poem text for meter detection; returns the submission id and
    /// rhythm suggestions.
    pub async fn submit_text(
        &self,
        request: &SubmitTextRequest,
    ) -> Result<SubmitTextResponse, ApiError> {
        tracing::debug!(title = %request.title, "Submitting poem text");
        let response: SubmitTextResponse = self.post_json("/submit-text/", request).await?;
        tracing::info!(
            submission_id = %response.id,
            meter = %response.meter_guess,
            confidence = response.meter_confidence,
            "Poem submitted"
        );
        Ok(response)
    }

    /// Start a conversion job for a prior submission
    pub async fn start_generation(
        &self,
        request: &GenerateRequest,
    ) -> Result<GenerateResponse, ApiError> {
        tracing::debug!(
            submission_id = %request.submission_id,
            style = %request.style_key,
            rhythm = %request.rhythm_key,
            tempo = request.tempo,
            "Starting generation"
        );
        self.post_json("/generate/", request).await
    }

    /// Query current job status
    pub async fn job_status(&self, job_id: &str) -> Result<JobStatusResponse, ApiError> {
        self.get_json(&format!("/job-status/{}/", job_id)).await
    }

    /// Fetch the synthesized audio for a succeeded job
    pub async fn download(&self, job_id: &str) -> Result<Vec<u8>, ApiError> {
        let response = self
            .authorize(self.http.get(self.url(&format!("/download/{}/", job_id))))
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let bytes = Self::read_ok(response)
            .await?
            .bytes()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        tracing::info!(job_id = %job_id, size_bytes = bytes.len(), "Audio downloaded");
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = ApiClient::new("https://inshad.example/api/", Session::anonymous());
        assert!(client.is_ok());
        // Trailing slash is normalized away
        assert_eq!(client.unwrap().base_url(), "https://inshad.example/api");
    }

    #[test]
    fn test_url_join() {
        let client = ApiClient::new("https://inshad.example/api", Session::anonymous()).unwrap();
        assert_eq!(
            client.url("/job-status/j-1/"),
            "https://inshad.example/api/job-status/j-1/"
        );
    }

    #[test]
    fn test_session_authorization_header() {
        let with = Session::new(Some("abc123".into()));
        let without = Session::anonymous();
        assert_eq!(with.authorization().as_deref(), Some("Token abc123"));
        assert!(with.has_token());
        assert!(without.authorization().is_none());
        assert!(!without.has_token());
    }
}
