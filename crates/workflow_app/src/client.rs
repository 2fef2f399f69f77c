// HTTP client for the relay server.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use relay_logging::{relay_debug, relay_info};
use reqwest::multipart::{Form, Part};
use serde_json::{json, Value};
use thiserror::Error;
use url::Url;
use workflow_core::{Checkpoint, FeedbackData, FormData, WorkflowKind};

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Relay reply did not include a resume URL")]
    MissingResumeUrl,

    #[error("Invalid relay URL '{0}'")]
    InvalidBaseUrl(String),

    #[error("Could not read upload {path}: {source}")]
    Upload {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ClientError {
    /// Status returned by the relay, when it answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Http(err) => err.status().map(|status| status.as_u16()),
            _ => None,
        }
    }

    /// Text suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Operations the client needs from the relay.
#[async_trait]
pub trait RelayApi: Send + Sync {
    /// Starts a workflow run and returns its resume handle.
    async fn init_workflow(&self, kind: WorkflowKind) -> Result<String, ClientError>;

    async fn submit_form(
        &self,
        handle: &str,
        form: &FormData,
    ) -> Result<Option<Checkpoint>, ClientError>;

    async fn submit_feedback(
        &self,
        handle: &str,
        feedback: &FeedbackData,
    ) -> Result<Option<Checkpoint>, ClientError>;

    /// Tells the workflow the external feedback sheet is done.
    async fn continue_workflow(&self, handle: &str) -> Result<Option<Checkpoint>, ClientError>;

    /// Takes whatever content the relay holds for `handle`.
    async fn check_result(&self, handle: &str) -> Result<Option<Checkpoint>, ClientError>;
}

pub struct HttpRelayClient {
    base_url: String,
    http: reqwest::Client,
}

impl HttpRelayClient {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, ClientError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url).map_err(|_| ClientError::InvalidBaseUrl(base_url.clone()))?;
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;
        Ok(Self { base_url, http })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn submit_form_url(&self, handle: &str) -> Result<Url, ClientError> {
        let mut url = Url::parse(&self.endpoint("/api/submit-form"))
            .map_err(|_| ClientError::InvalidBaseUrl(self.base_url.clone()))?;
        url.query_pairs_mut().append_pair("resumeUrl", handle);
        Ok(url)
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value, ClientError> {
        let response = self.http.post(self.endpoint(path)).json(body).send().await?;
        handle_response(response).await
    }
}

#[async_trait]
impl RelayApi for HttpRelayClient {
    async fn init_workflow(&self, kind: WorkflowKind) -> Result<String, ClientError> {
        let reply = self
            .post_json("/api/init-workflow", &json!({ "workflowType": kind.as_str() }))
            .await?;
        let handle = reply
            .get("resumeURL")
            .and_then(Value::as_str)
            .filter(|handle| !handle.is_empty())
            .ok_or(ClientError::MissingResumeUrl)?;
        relay_info!("Workflow {} initialized, resume handle {}", kind, handle);
        Ok(handle.to_string())
    }

    async fn submit_form(
        &self,
        handle: &str,
        form: &FormData,
    ) -> Result<Option<Checkpoint>, ClientError> {
        let mut multipart = Form::new();
        for (name, value) in &form.fields {
            multipart = multipart.text(name.clone(), value.clone());
        }
        if let Some(path) = &form.file {
            multipart = multipart.part("file", file_part(path).await?);
        }
        relay_debug!(
            "Submitting {} fields (file: {}) to {}",
            form.fields.len(),
            form.file.is_some(),
            handle
        );

        let response = self
            .http
            .post(self.submit_form_url(handle)?)
            .multipart(multipart)
            .send()
            .await?;
        Ok(checkpoint_from_value(&handle_response(response).await?))
    }

    async fn submit_feedback(
        &self,
        handle: &str,
        feedback: &FeedbackData,
    ) -> Result<Option<Checkpoint>, ClientError> {
        let mut body = json!({ "resumeUrl": handle, "feedback": feedback.feedback });
        if let Some(outline) = &feedback.edited_outline {
            body["editedOutline"] = json!(outline);
        }
        if let Some(article) = &feedback.edited_article {
            body["editedArticle"] = json!(article);
        }
        let reply = self.post_json("/api/submit-feedback", &body).await?;
        Ok(checkpoint_from_value(&reply))
    }

    async fn continue_workflow(&self, handle: &str) -> Result<Option<Checkpoint>, ClientError> {
        let response = self
            .http
            .post(self.submit_form_url(handle)?)
            .json(&json!({ "feedback": true }))
            .send()
            .await?;
        Ok(checkpoint_from_value(&handle_response(response).await?))
    }

    async fn check_result(&self, handle: &str) -> Result<Option<Checkpoint>, ClientError> {
        let reply = self
            .post_json("/api/check-outline", &json!({ "resumeUrl": handle }))
            .await?;
        Ok(checkpoint_from_value(&reply))
    }
}

async fn handle_response(response: reqwest::Response) -> Result<Value, ClientError> {
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(ClientError::Api {
            status: status.as_u16(),
            message: error_message(&text),
        });
    }
    let text = response.text().await?;
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&text).map_err(|err| ClientError::Api {
        status: status.as_u16(),
        message: format!("Relay returned invalid JSON: {err}"),
    })
}

/// Pulls `error` (and `details`) out of a relay error body.
fn error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return body.trim().to_string();
    };
    let error = value.get("error").and_then(Value::as_str);
    let details = value.get("details").and_then(Value::as_str);
    match (error, details) {
        (Some(error), Some(details)) => format!("{error}: {details}"),
        (Some(error), None) => error.to_string(),
        _ => body.trim().to_string(),
    }
}

/// First non-empty string among outline, article, end, getFeedback.
pub fn checkpoint_from_value(value: &Value) -> Option<Checkpoint> {
    let text = |key: &str| {
        value
            .get(key)
            .and_then(Value::as_str)
            .filter(|text| !text.is_empty())
            .map(str::to_string)
    };
    text("outline")
        .map(Checkpoint::Outline)
        .or_else(|| text("article").map(Checkpoint::Article))
        .or_else(|| text("end").map(Checkpoint::End))
        .or_else(|| text("getFeedback").map(Checkpoint::GetFeedback))
}

async fn file_part(path: &Path) -> Result<Part, ClientError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| ClientError::Upload {
            path: path.to_path_buf(),
            source,
        })?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    Ok(Part::bytes(bytes)
        .file_name(file_name)
        .mime_str(content_type_for(path))?)
}

fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        Some("xls") => "application/vnd.ms-excel",
        Some("csv") => "text/csv",
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain",
        Some("json") => "application/json",
        _ => "application/octet-stream",
    }
}
