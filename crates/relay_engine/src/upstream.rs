use std::fmt;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::multipart::{Form, Part};
use serde_json::Value;

use crate::FormSubmission;

#[derive(Debug, Clone)]
pub struct UpstreamSettings {
    pub connect_timeout: Duration,
    /// Workflows may hold the request open while they run, so this is generous.
    pub request_timeout: Duration,
    pub max_bytes: u64,
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(600),
            max_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Body encodings the relay forwards to the workflow.
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamPayload {
    Json(Value),
    Multipart(FormSubmission),
}

/// Body of a successful workflow reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamReply {
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamError {
    pub kind: FailureKind,
    pub message: String,
}

impl UpstreamError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for UpstreamError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    /// Non-success status; the error message carries the response body.
    HttpStatus(u16),
    Timeout,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    InvalidPayload,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::InvalidPayload => write!(f, "invalid payload"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}

/// Outbound side of the relay: one POST to a workflow URL.
#[async_trait::async_trait]
pub trait Upstream: Send + Sync {
    async fn post(&self, url: &str, payload: UpstreamPayload)
        -> Result<UpstreamReply, UpstreamError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestUpstream {
    settings: UpstreamSettings,
    client: reqwest::Client,
}

impl ReqwestUpstream {
    pub fn new(settings: UpstreamSettings) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| UpstreamError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self { settings, client })
    }

    async fn read_capped(&self, response: reqwest::Response) -> Result<Vec<u8>, UpstreamError> {
        if let Some(content_len) = response.content_length() {
            if content_len > self.settings.max_bytes {
                return Err(self.too_large(Some(content_len)));
            }
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > self.settings.max_bytes {
                return Err(self.too_large(Some(next_len)));
            }
            bytes.extend_from_slice(&chunk);
        }
        Ok(bytes)
    }

    /// Error bodies are only reported, so an oversized one is cut short
    /// instead of failing the request.
    async fn read_error_body(&self, response: reqwest::Response) -> String {
        let cap = usize::try_from(self.settings.max_bytes).unwrap_or(usize::MAX);
        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(Ok(chunk)) = stream.next().await {
            let room = cap - bytes.len();
            if chunk.len() >= room {
                bytes.extend_from_slice(&chunk[..room]);
                break;
            }
            bytes.extend_from_slice(&chunk);
        }
        String::from_utf8_lossy(&bytes).into_owned()
    }

    fn too_large(&self, actual: Option<u64>) -> UpstreamError {
        UpstreamError::new(
            FailureKind::TooLarge {
                max_bytes: self.settings.max_bytes,
                actual,
            },
            "response too large",
        )
    }
}

#[async_trait::async_trait]
impl Upstream for ReqwestUpstream {
    async fn post(
        &self,
        url: &str,
        payload: UpstreamPayload,
    ) -> Result<UpstreamReply, UpstreamError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|err| UpstreamError::new(FailureKind::InvalidUrl, err.to_string()))?;

        let request = match payload {
            UpstreamPayload::Json(body) => self.client.post(parsed).json(&body),
            UpstreamPayload::Multipart(submission) => {
                self.client.post(parsed).multipart(build_form(submission)?)
            }
        };

        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        if !status.is_success() {
            let body = self.read_error_body(response).await;
            return Err(UpstreamError::new(
                FailureKind::HttpStatus(status.as_u16()),
                body,
            ));
        }

        let bytes = self.read_capped(response).await?;
        Ok(UpstreamReply { bytes })
    }
}

fn build_form(submission: FormSubmission) -> Result<Form, UpstreamError> {
    let mut form = Form::new();
    for (name, value) in submission.fields {
        form = form.text(name, value);
    }
    if let Some(file) = submission.file {
        let mut part = Part::bytes(file.bytes.to_vec()).file_name(file.file_name);
        if let Some(content_type) = file.content_type.as_deref() {
            part = part
                .mime_str(content_type)
                .map_err(|err| UpstreamError::new(FailureKind::InvalidPayload, err.to_string()))?;
        }
        form = form.part("file", part);
    }
    Ok(form)
}

fn map_reqwest_error(err: reqwest::Error) -> UpstreamError {
    if err.is_timeout() {
        return UpstreamError::new(FailureKind::Timeout, err.to_string());
    }
    UpstreamError::new(FailureKind::Network, err.to_string())
}
