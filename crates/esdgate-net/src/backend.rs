//! The backend seam and its HTTP implementation.

use std::future::Future;
use std::time::Duration;

use esdgate_core::types::TestRecord;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, trace};

use crate::error::{NetError, Result};

/// Identity payload of a successful `POST /esd/authenticate`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthReply {
    pub username: String,
    #[serde(default)]
    pub fullname: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<String>,
}

/// Payload of a `POST /face` classification.
///
/// `username` is the recognized identity when `result` is true, an empty
/// string when a face was seen but not identified, and absent when the
/// frame carried no face at all.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FaceReply {
    pub result: bool,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub fullname: Option<String>,
}

/// The station's view of the HTTP backend.
///
/// One implementation talks to the real service; the scriptable
/// [`MockBackend`](crate::mock::MockBackend) covers tests and development.
///
/// Methods are declared with explicit `impl Future + Send` returns so
/// callers can move the futures onto spawned tasks; implementations write
/// plain `async fn`.
pub trait StationBackend: Send + Sync {
    /// Exchange a username for a verified identity.
    ///
    /// # Errors
    ///
    /// [`NetError::Unauthorized`] on HTTP 401; timeout/transport errors
    /// per [`NetError`].
    fn authenticate(&self, username: &str) -> impl Future<Output = Result<AuthReply>> + Send;

    /// Submit one base64-encoded JPEG frame for classification.
    ///
    /// # Errors
    ///
    /// Timeout/transport/decode errors per [`NetError`].
    fn match_face(&self, frame_b64: String) -> impl Future<Output = Result<FaceReply>> + Send;

    /// Report a completed test. Any 2xx status is success.
    ///
    /// # Errors
    ///
    /// Timeout/transport errors per [`NetError`]; callers fall back to
    /// local storage.
    fn save_result(&self, record: &TestRecord) -> impl Future<Output = Result<()>> + Send;
}

/// Production backend over HTTP.
///
/// Requests are form-encoded, responses are JSON. The client-wide timeout
/// bounds every call.
pub struct HttpBackend {
    client: reqwest::Client,
    api_url: String,
}

impl HttpBackend {
    /// Build a backend rooted at `api_url` (e.g. `http://host:8989/api`).
    ///
    /// # Errors
    ///
    /// Returns a transport error if the underlying client cannot be built.
    pub fn new(api_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.api_url)
    }
}

impl StationBackend for HttpBackend {
    async fn authenticate(&self, username: &str) -> Result<AuthReply> {
        trace!(username, "authenticate request");
        let response = self
            .client
            .post(self.endpoint("/esd/authenticate"))
            .form(&[("username", username)])
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED => Err(NetError::Unauthorized),
            status if status.is_success() => Ok(response.json().await?),
            status => Err(NetError::Http {
                status: status.as_u16(),
            }),
        }
    }

    async fn match_face(&self, frame_b64: String) -> Result<FaceReply> {
        let response = self
            .client
            .post(self.endpoint("/face"))
            .form(&[("data", frame_b64.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NetError::Http {
                status: status.as_u16(),
            });
        }
        Ok(response.json().await?)
    }

    async fn save_result(&self, record: &TestRecord) -> Result<()> {
        debug!(username = %record.username, outcome = %record.outcome, "save request");
        let response = self
            .client
            .post(self.endpoint("/esd/save"))
            .form(record)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(NetError::Http {
                status: status.as_u16(),
            })
        }
    }
}
