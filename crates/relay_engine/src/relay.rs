use std::collections::BTreeMap;
use std::sync::Arc;

use relay_logging::{relay_debug, relay_info, relay_warn};
use serde_json::{json, Value};

use crate::sanitize::{clean_json_text, decode_body, parse_workflow_body};
use crate::upstream::{FailureKind, Upstream, UpstreamError, UpstreamPayload};
use crate::{
    CheckpointFields, FeedbackSubmission, FormSubmission, Mailbox, RelayError, ResumeHandle,
    StoredResult,
};

/// Workflow kind that selects the keyword-template webhook.
pub const SETUP_WITH_KEYWORDS: &str = "setupWithKeywords";

const INIT_FAILED: &str = "Failed to initialize workflow";
const SUBMIT_FORM_FAILED: &str = "Failed to submit form";
const SUBMIT_FEEDBACK_FAILED: &str = "Failed to submit feedback";

/// Maps a requested workflow kind to the webhook that starts it.
///
/// Unknown or missing kinds fall back to the default webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowRoutes {
    default_url: String,
    routes: BTreeMap<String, String>,
}

impl WorkflowRoutes {
    pub fn new(default_url: impl Into<String>) -> Self {
        Self {
            default_url: default_url.into(),
            routes: BTreeMap::new(),
        }
    }

    pub fn with_route(mut self, kind: impl Into<String>, url: impl Into<String>) -> Self {
        self.routes.insert(kind.into(), url.into());
        self
    }

    pub fn resolve(&self, kind: Option<&str>) -> &str {
        kind.and_then(|kind| self.routes.get(kind))
            .map_or(self.default_url.as_str(), String::as_str)
    }
}

/// The relay service: owns the mailbox and talks to the workflow.
///
/// Constructed once at startup and shared by every request handler.
pub struct Relay {
    mailbox: Mailbox,
    upstream: Arc<dyn Upstream>,
    routes: WorkflowRoutes,
}

impl Relay {
    pub fn new(upstream: Arc<dyn Upstream>, routes: WorkflowRoutes) -> Self {
        Self {
            mailbox: Mailbox::new(),
            upstream,
            routes,
        }
    }

    pub fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    /// Starts a workflow run and returns the workflow's reply, `resumeURL` included.
    pub async fn initialize_workflow(&self, kind: Option<&str>) -> Result<Value, RelayError> {
        let url = self.routes.resolve(kind);
        relay_info!(
            "Initializing workflow kind={} url={}",
            kind.unwrap_or("default"),
            url
        );

        let body = self
            .forward(url, UpstreamPayload::Json(json!({})), INIT_FAILED)
            .await?;

        let handle = body
            .get("resumeURL")
            .and_then(Value::as_str)
            .filter(|handle| !handle.is_empty())
            .map(ResumeHandle::from)
            .ok_or_else(|| RelayError::UpstreamParse {
                details: "response does not contain a resumeURL".to_string(),
            })?;
        relay_info!("Workflow initialized, resume handle={}", handle);

        self.store_opportunistic(&handle, &body, "init");
        Ok(body)
    }

    /// Forwards a form submission to the resume handle and returns the workflow's reply.
    pub async fn submit_form(
        &self,
        handle: &ResumeHandle,
        mut submission: FormSubmission,
    ) -> Result<Value, RelayError> {
        let url = validate_target(handle)?;
        submission.fields.retain(|(name, _)| name != "resumeUrl");

        let (payload, failure) = if submission.is_feedback_ack() {
            relay_info!("Forwarding feedback acknowledgement to {}", handle);
            (
                UpstreamPayload::Json(json!({ "feedback": true })),
                SUBMIT_FEEDBACK_FAILED,
            )
        } else {
            relay_info!(
                "Forwarding form to {} fields={:?} file={}",
                handle,
                submission
                    .fields
                    .iter()
                    .map(|(name, _)| name.as_str())
                    .collect::<Vec<_>>(),
                describe_file(&submission)
            );
            (UpstreamPayload::Multipart(submission), SUBMIT_FORM_FAILED)
        };

        let body = self.forward(url, payload, failure).await?;
        self.store_opportunistic(handle, &body, "submit-form");
        Ok(body)
    }

    /// Forwards reviewer feedback. Once the handle is known to be forwardable,
    /// any unread checkpoint for it is evicted, whatever happens to the forward.
    pub async fn submit_feedback(
        &self,
        handle: &ResumeHandle,
        feedback: FeedbackSubmission,
    ) -> Result<Value, RelayError> {
        let url = validate_target(handle)?;
        if self.mailbox.evict(handle) {
            relay_info!("Cleared unread content for {}", handle);
        }
        relay_info!(
            "Forwarding feedback to {} feedback_len={} edited_outline={} edited_article={}",
            handle,
            feedback.feedback.as_deref().map_or(0, str::len),
            feedback.edited_outline.is_some(),
            feedback.edited_article.is_some()
        );

        let body = self
            .forward(
                url,
                UpstreamPayload::Multipart(feedback.into_form()),
                SUBMIT_FEEDBACK_FAILED,
            )
            .await?;
        self.store_opportunistic(handle, &body, "submit-feedback");
        Ok(body)
    }

    /// Takes whatever is stored for the handle. Nothing stored is not an error.
    pub fn check_result(&self, handle: &ResumeHandle) -> CheckpointFields {
        let taken = self.mailbox.take_and_clear(handle);
        match &taken {
            Some(result) => relay_info!("Delivering {} for {}", result.kind(), handle),
            None => relay_debug!(
                "Nothing stored for {} ({} pending handles)",
                handle,
                self.mailbox.len()
            ),
        }
        CheckpointFields::from(taken)
    }

    /// Accepts a checkpoint delivered by the workflow's callback.
    pub fn store_result(
        &self,
        raw_body: &[u8],
    ) -> Result<(ResumeHandle, StoredResult), RelayError> {
        let body = parse_workflow_body(raw_body).map_err(|err| {
            relay_warn!("Rejected callback body: {}", err);
            RelayError::validation("Invalid JSON in request body")
        })?;

        let handle = body
            .get("resumeUrl")
            .and_then(Value::as_str)
            .filter(|handle| !handle.is_empty())
            .map(ResumeHandle::from);
        let result = StoredResult::from_body(&body);
        let (Some(handle), Some(result)) = (handle, result) else {
            return Err(RelayError::validation(
                "Resume URL and either outline, article, end, or getFeedback are required",
            ));
        };

        relay_info!("Callback stored {} for {}", result.kind(), handle);
        self.put_result(&handle, result.clone());
        Ok((handle, result))
    }

    async fn forward(
        &self,
        url: &str,
        payload: UpstreamPayload,
        failure: &str,
    ) -> Result<Value, RelayError> {
        let reply = self
            .upstream
            .post(url, payload)
            .await
            .map_err(|err| map_upstream_error(err, failure))?;

        let text = decode_body(&reply.bytes);
        relay_debug!("Raw workflow response ({} bytes): {}", reply.bytes.len(), text);
        relay_debug!("Cleaned workflow response: {}", clean_json_text(&text));

        parse_workflow_body(&reply.bytes).map_err(|err| {
            relay_warn!("Workflow response from {} is not JSON: {}", url, err);
            RelayError::UpstreamParse {
                details: err.to_string(),
            }
        })
    }

    fn put_result(&self, handle: &ResumeHandle, result: StoredResult) {
        if let Some(replaced) = self.mailbox.put(handle.clone(), result) {
            relay_info!("Replaced unread {} for {}", replaced.kind(), handle);
        }
    }

    fn store_opportunistic(&self, handle: &ResumeHandle, body: &Value, source: &str) {
        match StoredResult::from_body(body) {
            Some(result) => {
                relay_info!(
                    "Workflow returned {} directly ({}) for {}",
                    result.kind(),
                    source,
                    handle
                );
                self.put_result(handle, result);
            }
            None => relay_debug!(
                "No checkpoint in {} response; keys={:?}",
                source,
                body.as_object()
                    .map(|object| object.keys().cloned().collect::<Vec<_>>())
                    .unwrap_or_default()
            ),
        }
    }
}

/// The handle is forwarded to as-is, so it has to be an absolute http(s) URL.
fn validate_target(handle: &ResumeHandle) -> Result<&str, RelayError> {
    let parsed = url::Url::parse(handle.as_str())
        .map_err(|_| RelayError::validation("Resume URL must be an absolute URL"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(RelayError::validation("Resume URL must use http or https"));
    }
    Ok(handle.as_str())
}

fn map_upstream_error(err: UpstreamError, failure: &str) -> RelayError {
    match err.kind {
        FailureKind::HttpStatus(status) => {
            relay_warn!("{}: upstream status {} body={}", failure, status, err.message);
            RelayError::Upstream {
                status,
                message: failure.to_string(),
                body: err.message,
            }
        }
        _ => {
            relay_warn!("{}: {}", failure, err);
            RelayError::Internal(err.to_string())
        }
    }
}

fn describe_file(submission: &FormSubmission) -> String {
    match &submission.file {
        Some(file) => format!("{} ({} bytes)", file.file_name, file.bytes.len()),
        None => "none".to_string(),
    }
}
