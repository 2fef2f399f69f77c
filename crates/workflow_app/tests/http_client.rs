use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use workflow_app::{ClientError, HttpRelayClient, RelayApi};
use workflow_core::{Checkpoint, FeedbackData, FormData, WorkflowKind};
use wiremock::matchers::{body_json, body_string_contains, header_regex, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const HANDLE: &str = "https://n8n.example/webhook-waiting/h1";

fn client_for(server: &MockServer) -> HttpRelayClient {
    relay_logging::initialize_for_tests();
    HttpRelayClient::new(&server.uri(), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn init_sends_workflow_type_and_returns_handle() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/init-workflow"))
        .and(body_json(json!({"workflowType": "setupWithKeywords"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"resumeURL": HANDLE})))
        .expect(1)
        .mount(&server)
        .await;

    let handle = client_for(&server)
        .init_workflow(WorkflowKind::SetupWithKeywords)
        .await
        .unwrap();
    assert_eq!(handle, HANDLE);
}

#[tokio::test]
async fn init_without_resume_url_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/init-workflow"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "started"})))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .init_workflow(WorkflowKind::SetupWithoutKeywords)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::MissingResumeUrl));
}

#[tokio::test]
async fn check_result_maps_fields_to_checkpoints() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/check-outline"))
        .and(body_json(json!({"resumeUrl": HANDLE})))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            json!({"outline": null, "article": "Body text", "getFeedback": null, "end": null}),
        ))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/check-outline"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            json!({"outline": null, "article": null, "getFeedback": null, "end": null}),
        ))
        .mount(&server)
        .await;
    let client = client_for(&server);

    assert_eq!(
        client.check_result(HANDLE).await.unwrap(),
        Some(Checkpoint::Article("Body text".into()))
    );
    assert_eq!(client.check_result(HANDLE).await.unwrap(), None);
}

#[tokio::test]
async fn submit_form_uploads_fields_and_file() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/submit-form"))
        .and(query_param("resumeUrl", HANDLE))
        .and(header_regex("content-type", "^multipart/form-data"))
        .and(body_string_contains("name=\"kundenname\""))
        .and(body_string_contains("filename=\"brief.csv\""))
        .and(body_string_contains("keyword,volume"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"outline": "Draft v1"})))
        .expect(1)
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("brief.csv");
    std::fs::write(&file, "keyword,volume\nrust,100\n").unwrap();

    let form = FormData {
        fields: vec![("kundenname".into(), "ACME".into())],
        file: Some(file),
    };
    let reply = client_for(&server).submit_form(HANDLE, &form).await.unwrap();

    assert_eq!(reply, Some(Checkpoint::Outline("Draft v1".into())));
}

#[tokio::test]
async fn missing_upload_file_fails_before_sending() {
    let server = MockServer::start().await;
    let form = FormData {
        fields: Vec::new(),
        file: Some("/nonexistent/brief.csv".into()),
    };

    let err = client_for(&server)
        .submit_form(HANDLE, &form)
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Upload { .. }));
    assert_eq!(err.status(), None);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn relay_errors_carry_status_and_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/submit-form"))
        .respond_with(
            ResponseTemplate::new(502).set_body_json(json!({"error": "Failed to submit form"})),
        )
        .mount(&server)
        .await;

    let err = client_for(&server)
        .submit_form(HANDLE, &FormData::default())
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(502));
    assert_eq!(err.user_message(), "Failed to submit form");
}

#[tokio::test]
async fn continue_sends_feedback_acknowledgement() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/submit-form"))
        .and(query_param("resumeUrl", HANDLE))
        .and(body_json(json!({"feedback": true})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let reply = client_for(&server).continue_workflow(HANDLE).await.unwrap();
    assert_eq!(reply, None);
}

#[tokio::test]
async fn feedback_includes_only_present_edits() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/submit-feedback"))
        .and(body_json(json!({
            "resumeUrl": HANDLE,
            "feedback": "more examples",
            "editedArticle": "Revised body",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"end": "https://drive/doc"})))
        .expect(1)
        .mount(&server)
        .await;

    let feedback = FeedbackData {
        feedback: "more examples".into(),
        edited_outline: None,
        edited_article: Some("Revised body".into()),
    };
    let reply = client_for(&server)
        .submit_feedback(HANDLE, &feedback)
        .await
        .unwrap();
    assert_eq!(reply, Some(Checkpoint::End("https://drive/doc".into())));
}
