//! Remote sync server API.
//!
//! This module defines the narrow [`RemoteApi`] seam the sync engine and
//! CLI consume, plus the reqwest-backed [`HttpApi`] adapter. The adapter
//! owns transport details only: URL construction, bearer credentials,
//! timeouts, HTTP error mapping, and JSON decoding.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::catalog::ViolationType;
use crate::error::{Error, Result};
use crate::record::ViolationRecord;

/// Longest response-body excerpt carried in a `ServerRejected` error.
const PREVIEW_CHAR_LIMIT: usize = 160;

/// Server acknowledgment for a sync push.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SyncAck {
    /// Human-readable acknowledgment message.
    #[serde(default)]
    pub message: String,
}

/// Wire body for `POST /api/sync/db`.
#[derive(Debug, Serialize)]
struct SyncBody<'a> {
    violations: &'a [ViolationRecord],
}

/// Wire body for `POST /api/login`.
#[derive(Debug, Serialize)]
struct LoginBody<'a> {
    username: &'a str,
    password: &'a str,
}

/// Wire reply for `POST /api/login`.
#[derive(Debug, Deserialize)]
struct LoginReply {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// The sync server operations the rest of the crate depends on.
///
/// Kept narrow and object-safe so the sync engine takes any implementation
/// and tests substitute in-memory fakes.
#[async_trait]
pub trait RemoteApi: Send + Sync + std::fmt::Debug {
    /// Fetch the list of registered schools.
    async fn schools(&self) -> Result<Vec<String>>;

    /// Fetch the violation-type catalog for a school.
    async fn violation_types(&self, school: &str) -> Result<Vec<ViolationType>>;

    /// Push a batch of pending violations in one request.
    ///
    /// The batch is all-or-nothing: an error means the server applied
    /// nothing the caller may prune.
    async fn push_violations(&self, batch: &[ViolationRecord]) -> Result<SyncAck>;

    /// Exchange credentials for an access token.
    async fn login(&self, username: &str, password: &str) -> Result<String>;
}

/// Reqwest-backed [`RemoteApi`] adapter.
pub struct HttpApi {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpApi {
    /// Build an adapter for the given server.
    ///
    /// `timeout` bounds each whole request; `None` disables the bound.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL does not parse or the client
    /// cannot be constructed.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let url = Url::parse(base_url).map_err(|e| Error::ConfigValidation {
            message: format!("invalid base_url {base_url:?}: {e}"),
        })?;

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            base_url: url,
            token: None,
        })
    }

    /// Attach a stored access token, sent as a bearer credential.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Build an endpoint URL from path segments.
    ///
    /// Segments are pushed one at a time, so a school name with slashes or
    /// spaces stays a single percent-encoded segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|()| Error::ConfigValidation {
                message: format!("base_url {:?} cannot carry API paths", self.base_url),
            })?;
            path.pop_if_empty();
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }

    /// Send a request and decode a JSON reply.
    async fn execute<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            return Err(Error::ServerRejected {
                status: status.as_u16(),
                message: body_preview(&body),
            });
        }

        Ok(serde_json::from_slice(&body)?)
    }
}

impl std::fmt::Debug for HttpApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpApi")
            .field("base_url", &self.base_url.as_str())
            .field("token", &self.token.as_ref().map(|_| "<set>"))
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl RemoteApi for HttpApi {
    async fn schools(&self) -> Result<Vec<String>> {
        let url = self.endpoint(&["api", "schools"])?;
        self.execute(self.client.get(url)).await
    }

    async fn violation_types(&self, school: &str) -> Result<Vec<ViolationType>> {
        let url = self.endpoint(&["api", "violation_types", school])?;
        self.execute(self.client.get(url)).await
    }

    async fn push_violations(&self, batch: &[ViolationRecord]) -> Result<SyncAck> {
        let url = self.endpoint(&["api", "sync", "db"])?;
        let body = SyncBody { violations: batch };
        self.execute(self.client.post(url).json(&body)).await
    }

    async fn login(&self, username: &str, password: &str) -> Result<String> {
        let url = self.endpoint(&["api", "login"])?;
        let body = LoginBody { username, password };
        let reply: LoginReply = self.execute(self.client.post(url).json(&body)).await?;
        token_from_reply(reply)
    }
}

/// Extract the token a login reply hands out.
fn token_from_reply(reply: LoginReply) -> Result<String> {
    match reply.token {
        Some(token) if !token.is_empty() => Ok(token),
        _ => Err(Error::login_rejected(
            reply.error.unwrap_or_else(|| "no token in reply".to_string()),
        )),
    }
}

/// Compact a response body into a short single-line excerpt.
fn body_preview(body: &[u8]) -> String {
    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}

#[cfg(test)]
mod tests {
    //! Coverage for the non-network pieces: URL construction, wire shapes,
    //! and error mapping helpers.

    use super::*;

    fn api(base: &str) -> HttpApi {
        HttpApi::new(base, None).expect("base URL should parse")
    }

    #[test]
    fn test_new_rejects_bad_base_url() {
        let result = HttpApi::new("not a url", None);
        assert!(matches!(result, Err(Error::ConfigValidation { .. })));
    }

    #[test]
    fn test_new_with_timeout() {
        let api = HttpApi::new("http://127.0.0.1:5000", Some(Duration::from_secs(5)));
        assert!(api.is_ok());
    }

    #[test]
    fn test_endpoint_paths() {
        let api = api("http://127.0.0.1:5000");

        let url = api.endpoint(&["api", "schools"]).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:5000/api/schools");

        let url = api.endpoint(&["api", "sync", "db"]).unwrap();
        assert_eq!(url.path(), "/api/sync/db");
    }

    #[test]
    fn test_endpoint_encodes_school_as_one_segment() {
        let api = api("http://127.0.0.1:5000");
        let url = api
            .endpoint(&["api", "violation_types", "Northside High"])
            .unwrap();
        assert_eq!(url.path(), "/api/violation_types/Northside%20High");

        let url = api
            .endpoint(&["api", "violation_types", "A/B School"])
            .unwrap();
        assert_eq!(url.path(), "/api/violation_types/A%2FB%20School");
    }

    #[test]
    fn test_endpoint_tolerates_trailing_slash() {
        let api = api("http://127.0.0.1:5000/");
        let url = api.endpoint(&["api", "schools"]).unwrap();
        assert_eq!(url.path(), "/api/schools");
    }

    #[test]
    fn test_endpoint_keeps_base_prefix() {
        let api = api("http://example.edu/conduct");
        let url = api.endpoint(&["api", "schools"]).unwrap();
        assert_eq!(url.path(), "/conduct/api/schools");
    }

    #[test]
    fn test_sync_body_wire_shape() {
        let batch = vec![ViolationRecord {
            id: Some(1),
            student_id: "Northside High_3105".to_string(),
            student_name: "Li Wei".to_string(),
            class_name: "10A".to_string(),
            dob: "2008-03-14".to_string(),
            gender: "M".to_string(),
            violation_type: "Late arrival".to_string(),
            points_deducted: 5,
            violation_date: "2024-01-15".to_string(),
            school_name: "Northside High".to_string(),
            recorder_name: "Ms. Tran".to_string(),
            recorder_class: "10A".to_string(),
        }];

        let json = serde_json::to_value(SyncBody { violations: &batch }).unwrap();
        let violations = json["violations"].as_array().unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0]["student_id"], "Northside High_3105");
        assert_eq!(violations[0]["points_deducted"], 5);
    }

    #[test]
    fn test_sync_ack_parsing() {
        let ack: SyncAck =
            serde_json::from_str(r#"{"message": "Data updated successfully"}"#).unwrap();
        assert_eq!(ack.message, "Data updated successfully");

        // Message is optional; an empty object still acknowledges.
        let ack: SyncAck = serde_json::from_str("{}").unwrap();
        assert_eq!(ack.message, "");
    }

    #[test]
    fn test_login_body_wire_shape() {
        let json = serde_json::to_value(LoginBody {
            username: "ms.tran",
            password: "hunter2",
        })
        .unwrap();
        assert_eq!(json["username"], "ms.tran");
        assert_eq!(json["password"], "hunter2");
    }

    #[test]
    fn test_token_from_reply_success() {
        let reply: LoginReply =
            serde_json::from_str(r#"{"token": "abc123", "error": null}"#).unwrap();
        assert_eq!(token_from_reply(reply).unwrap(), "abc123");
    }

    #[test]
    fn test_token_from_reply_carries_server_error() {
        let reply: LoginReply =
            serde_json::from_str(r#"{"token": null, "error": "bad credentials"}"#).unwrap();
        let err = token_from_reply(reply).unwrap_err();
        assert!(err.to_string().contains("bad credentials"));
    }

    #[test]
    fn test_token_from_reply_empty_token() {
        let reply: LoginReply = serde_json::from_str(r#"{"token": ""}"#).unwrap();
        let err = token_from_reply(reply).unwrap_err();
        assert!(matches!(err, Error::LoginRejected { .. }));
    }

    #[test]
    fn test_body_preview_compacts_whitespace() {
        let preview = body_preview(b"{\n  \"error\":   \"No violations data\"\n}");
        assert_eq!(preview, "{ \"error\": \"No violations data\" }");
    }

    #[test]
    fn test_body_preview_truncates() {
        let body = "x".repeat(PREVIEW_CHAR_LIMIT * 2);
        let preview = body_preview(body.as_bytes());
        assert_eq!(preview.chars().count(), PREVIEW_CHAR_LIMIT + 3);
        assert!(preview.ends_with("..."));
    }

    #[test]
    fn test_body_preview_empty() {
        assert_eq!(body_preview(b""), "");
    }

    #[test]
    fn test_debug_redacts_token() {
        let api = api("http://127.0.0.1:5000").with_token("secret-token");
        let debug = format!("{api:?}");
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("<set>"));
    }
}
