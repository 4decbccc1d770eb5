//! HTTP client for the meeting service
//!
//! The service transcribes uploaded files, generates a summary with three
//! email drafts, and keeps the history of past generations. Failures are
//! returned as-is; retrying is left to the user.

use crate::error::ServiceError;
use crate::history::HistoryEntry;
use crate::session::SelectedFile;
use anyhow::Context;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, instrument, warn};
use url::Url;

/// Operations offered by the meeting service
#[async_trait]
pub(crate) trait MeetingService: Send + Sync {
    /// Upload a transcript file and get back its text
    async fn upload(&self, file: &SelectedFile) -> Result<String, ServiceError>;

    /// Generate a summary and email drafts for a transcript
    async fn generate(
        &self,
        transcript: &str,
        filename: &str,
    ) -> Result<GeneratedDrafts, ServiceError>;

    /// Fetch all past sessions, newest first
    async fn history(&self) -> Result<Vec<HistoryEntry>, ServiceError>;
}

/// Response body of `POST /upload`
#[derive(Debug, Deserialize)]
struct UploadResponse {
    transcript: String,
}

/// Request body of `POST /generate`
#[derive(Debug, Serialize)]
struct GenerateRequestBody<'a> {
    transcript: &'a str,
    filename: &'a str,
}

/// Response body of `POST /generate`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(crate) struct GeneratedDrafts {
    pub summary: String,
    pub emails: Vec<String>,
}

/// Error body returned by the service
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

/// Timeouts applied by the underlying transport
#[derive(Debug, Clone, Copy)]
pub(crate) struct ClientTimeouts {
    pub request: Duration,
    pub connect: Duration,
}

/// Meeting service reached over HTTP
pub(crate) struct HttpMeetingClient {
    base_url: Url,
    client: reqwest::Client,
}

impl HttpMeetingClient {
    /// Create a client for the service at `base_url`
    pub(crate) fn new(base_url: &str, timeouts: ClientTimeouts) -> anyhow::Result<Self> {
        let base_url = normalize_base_url(base_url)
            .with_context(|| format!("Invalid service URL: {}", base_url))?;
        let client = reqwest::Client::builder()
            .timeout(timeouts.request)
            .connect_timeout(timeouts.connect)
            .build()
            .context("Failed to create HTTP client for HttpMeetingClient")?;

        Ok(Self { base_url, client })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ServiceError> {
        Ok(self.base_url.join(path)?)
    }

    /// Turn a non-success response into a `ServerError`
    async fn server_error(response: reqwest::Response) -> ServiceError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let detail = extract_detail(&body);
        warn!(status, detail = ?detail, "Meeting service returned an error");
        ServiceError::ServerError { status, detail }
    }
}

/// Make sure relative endpoints resolve under the base path
fn normalize_base_url(raw: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(raw)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Pull a textual `detail` out of an error body
fn extract_detail(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    match parsed.detail {
        serde_json::Value::String(detail) => Some(detail),
        _ => None,
    }
}

#[async_trait]
impl MeetingService for HttpMeetingClient {
    #[instrument(skip(self, file), fields(filename = %file.name(), bytes = file.contents().len()))]
    async fn upload(&self, file: &SelectedFile) -> Result<String, ServiceError> {
        let part = Part::bytes(file.contents().to_vec())
            .file_name(file.name().to_string())
            .mime_str(file.mime_type())?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(self.endpoint("upload")?)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::server_error(response).await);
        }

        let body: UploadResponse = response.json().await.map_err(|e| {
            ServiceError::InvalidResponse(format!("Failed to parse upload response: {}", e))
        })?;
        info!(chars = body.transcript.len(), "Upload transcribed");
        Ok(body.transcript)
    }

    #[instrument(skip(self, transcript), fields(transcript_len = transcript.len()))]
    async fn generate(
        &self,
        transcript: &str,
        filename: &str,
    ) -> Result<GeneratedDrafts, ServiceError> {
        let response = self
            .client
            .post(self.endpoint("generate")?)
            .json(&GenerateRequestBody {
                transcript,
                filename,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::server_error(response).await);
        }

        let drafts: GeneratedDrafts = response.json().await.map_err(|e| {
            ServiceError::InvalidResponse(format!("Failed to parse generate response: {}", e))
        })?;
        info!(emails = drafts.emails.len(), "Drafts generated");
        Ok(drafts)
    }

    #[instrument(skip(self))]
    async fn history(&self) -> Result<Vec<HistoryEntry>, ServiceError> {
        let response = self
            .client
            .get(self.endpoint("history")?)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::server_error(response).await);
        }

        let entries: Vec<HistoryEntry> = response.json().await.map_err(|e| {
            ServiceError::InvalidResponse(format!("Failed to parse history response: {}", e))
        })?;
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn timeouts() -> ClientTimeouts {
        ClientTimeouts {
            request: Duration::from_secs(5),
            connect: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_generate_request_serialization() {
        let body = GenerateRequestBody {
            transcript: "Alice: hi",
            filename: "standup.txt",
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"transcript": "Alice: hi", "filename": "standup.txt"})
        );
    }

    #[test]
    fn test_extract_detail() {
        assert_eq!(
            extract_detail(r#"{"detail": "API Key not found"}"#),
            Some("API Key not found".to_string())
        );
        assert_eq!(extract_detail(r#"{"detail": [{"msg": "field required"}]}"#), None);
        assert_eq!(extract_detail("Internal Server Error"), None);
        assert_eq!(extract_detail(""), None);
    }

    #[test]
    fn test_normalize_base_url() {
        let url = normalize_base_url("http://localhost:8000").unwrap();
        assert_eq!(url.join("upload").unwrap().as_str(), "http://localhost:8000/upload");

        let url = normalize_base_url("https://example.com/api").unwrap();
        assert_eq!(
            url.join("history").unwrap().as_str(),
            "https://example.com/api/history"
        );
        assert!(normalize_base_url("not a url").is_err());
    }

    #[tokio::test]
    async fn test_upload_returns_transcript() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/upload")
            .match_header(
                "content-type",
                Matcher::Regex("multipart/form-data".to_string()),
            )
            .match_body(Matcher::Regex("filename=\"meeting.txt\"".to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"transcript": "Alice: hello", "filename": "meeting.txt"}"#)
            .create_async()
            .await;

        let client = HttpMeetingClient::new(&server.url(), timeouts()).unwrap();
        let file = SelectedFile::new("meeting.txt", b"Alice: hello".to_vec());
        let transcript = client.upload(&file).await.unwrap();

        assert_eq!(transcript, "Alice: hello");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_upload_failure_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/upload")
            .with_status(400)
            .with_body(r#"{"detail": "Unsupported file format. Please upload .txt or .docx"}"#)
            .create_async()
            .await;

        let client = HttpMeetingClient::new(&server.url(), timeouts()).unwrap();
        let file = SelectedFile::new("meeting.pdf", vec![1, 2, 3]);
        let err = client.upload(&file).await.unwrap_err();

        assert!(matches!(err, ServiceError::ServerError { status: 400, .. }));
    }

    #[tokio::test]
    async fn test_generate_posts_json() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/generate")
            .match_body(Matcher::Json(serde_json::json!({
                "transcript": "Alice: hello",
                "filename": "meeting.txt"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"summary": "Greetings", "emails": ["a", "b", "c"]}"#)
            .create_async()
            .await;

        let client = HttpMeetingClient::new(&server.url(), timeouts()).unwrap();
        let drafts = client.generate("Alice: hello", "meeting.txt").await.unwrap();

        assert_eq!(drafts.summary, "Greetings");
        assert_eq!(drafts.emails, ["a", "b", "c"]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_generate_error_carries_detail() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/generate")
            .with_status(500)
            .with_header("content-type", "application/json")
            .with_body(r#"{"detail": "API Key not found. Please set GEMINI_API_KEY in .env file."}"#)
            .create_async()
            .await;

        let client = HttpMeetingClient::new(&server.url(), timeouts()).unwrap();
        let err = client.generate("t", "f").await.unwrap_err();

        assert_eq!(
            err.detail(),
            Some("API Key not found. Please set GEMINI_API_KEY in .env file.")
        );
    }

    #[tokio::test]
    async fn test_generate_malformed_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/generate")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let client = HttpMeetingClient::new(&server.url(), timeouts()).unwrap();
        let err = client.generate("t", "f").await.unwrap_err();

        assert!(matches!(err, ServiceError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_history_parses_entries() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/history")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[{"id": 2, "filename": "b.txt", "transcript": "t2", "summary": "s2",
                     "emails": ["x", "y", "z"], "timestamp": "2024-06-01 12:00:00"},
                    {"id": 1, "filename": "a.txt", "transcript": "t1", "summary": "s1",
                     "emails": ["x", "y", "z"], "timestamp": "2024-05-01 12:00:00"}]"#,
            )
            .create_async()
            .await;

        let client = HttpMeetingClient::new(&server.url(), timeouts()).unwrap();
        let entries = client.history().await.unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, "2");
        assert_eq!(entries[1].filename, "a.txt");
    }

    #[tokio::test]
    async fn test_history_server_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/history")
            .with_status(503)
            .create_async()
            .await;

        let client = HttpMeetingClient::new(&server.url(), timeouts()).unwrap();
        let err = client.history().await.unwrap_err();

        assert!(matches!(err, ServiceError::ServerError { status: 503, detail: None }));
    }

    #[test]
    fn test_new_rejects_invalid_url() {
        assert!(HttpMeetingClient::new("::not-a-url", timeouts()).is_err());
    }
}
