use axum::extract::rejection::{BytesRejection, QueryRejection};
use axum::extract::{FromRequest, Multipart, Query, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::{Form, Json};
use bytes::Bytes;
use relay_engine::{
    CheckpointFields, FeedbackSubmission, FileUpload, FormSubmission, ResumeHandle,
};
use relay_logging::{relay_debug, relay_info};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;
use crate::router::AppState;

const RESUME_URL_REQUIRED: &str = "Resume URL is required";

#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
    message: &'static str,
}

pub(crate) async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        message: "Backend server is running",
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InitRequest {
    workflow_type: Option<String>,
}

pub(crate) async fn init_workflow(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<Value>, ApiError> {
    let request: InitRequest = lenient_json(&body?)?;
    let reply = state
        .relay
        .initialize_workflow(request.workflow_type.as_deref())
        .await?;
    Ok(Json(reply))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ResumeQuery {
    resume_url: Option<String>,
}

/// Accepts multipart, urlencoded, or JSON bodies; `resumeUrl` may be in the
/// query string or among the fields.
pub(crate) async fn submit_form(
    State(state): State<AppState>,
    query: Result<Query<ResumeQuery>, QueryRejection>,
    request: Request,
) -> Result<Json<Value>, ApiError> {
    let Query(query) = query?;
    let submission = read_submission(request, &state).await?;
    let handle = query
        .resume_url
        .or_else(|| submission.field("resumeUrl").map(str::to_string))
        .filter(|handle| !handle.is_empty())
        .map(ResumeHandle::from)
        .ok_or_else(|| ApiError::bad_request(RESUME_URL_REQUIRED))?;

    let reply = state.relay.submit_form(&handle, submission).await?;
    Ok(Json(reply))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FeedbackRequest {
    resume_url: Option<String>,
    #[serde(flatten)]
    feedback: FeedbackSubmission,
}

pub(crate) async fn submit_feedback(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<Value>, ApiError> {
    let request: FeedbackRequest = lenient_json(&body?)?;
    let handle = required_handle(request.resume_url)?;
    let reply = state
        .relay
        .submit_feedback(&handle, request.feedback)
        .await?;
    Ok(Json(reply))
}

pub(crate) async fn check_outline(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<CheckpointFields>, ApiError> {
    let request: ResumeQuery = lenient_json(&body?)?;
    let handle = required_handle(request.resume_url)?;
    Ok(Json(state.relay.check_result(&handle)))
}

#[derive(Debug, Serialize)]
pub(crate) struct StoreResponse {
    success: bool,
    message: &'static str,
}

/// Callback target for the workflow; the body is cleaned before parsing.
pub(crate) async fn store_outline(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<StoreResponse>, ApiError> {
    let body = body?;
    relay_debug!("Callback body: {}", String::from_utf8_lossy(&body));
    state.relay.store_result(&body)?;
    Ok(Json(StoreResponse {
        success: true,
        message: "Content stored successfully",
    }))
}

fn required_handle(raw: Option<String>) -> Result<ResumeHandle, ApiError> {
    raw.filter(|handle| !handle.is_empty())
        .map(ResumeHandle::from)
        .ok_or_else(|| ApiError::bad_request(RESUME_URL_REQUIRED))
}

/// An empty body reads as the default request; anything else must be JSON.
fn lenient_json<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|err| {
        relay_info!("Rejected request body: {}", err);
        ApiError::bad_request("Invalid JSON in request body")
    })
}

async fn read_submission(request: Request, state: &AppState) -> Result<FormSubmission, ApiError> {
    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::from_request(request, state).await?;
        read_multipart(multipart).await
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        let Form(fields) = Form::<Vec<(String, String)>>::from_request(request, state).await?;
        Ok(FormSubmission { fields, file: None })
    } else {
        let body = Bytes::from_request(request, state).await?;
        json_fields(&body)
    }
}

async fn read_multipart(mut multipart: Multipart) -> Result<FormSubmission, ApiError> {
    let mut submission = FormSubmission::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        match file_name {
            Some(file_name) if name == "file" => {
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await?;
                submission.file = Some(FileUpload {
                    file_name,
                    content_type,
                    bytes,
                });
            }
            _ => {
                let value = field.text().await?;
                submission.fields.push((name, value));
            }
        }
    }
    Ok(submission)
}

/// Flattens a JSON object into form fields; `null` members are dropped.
fn json_fields(body: &[u8]) -> Result<FormSubmission, ApiError> {
    let value: Value = lenient_json::<Option<Value>>(body)?.unwrap_or(Value::Null);
    let fields = match value {
        Value::Null => Vec::new(),
        Value::Object(object) => object
            .into_iter()
            .filter_map(|(name, value)| match value {
                Value::Null => None,
                Value::String(text) => Some((name, text)),
                other => Some((name, other.to_string())),
            })
            .collect(),
        _ => return Err(ApiError::bad_request("Expected a JSON object")),
    };
    Ok(FormSubmission { fields, file: None })
}
