use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use workflow_app::{ClientError, Driver, RelayApi};
use workflow_core::{
    AppState, AppViewModel, Checkpoint, FeedbackData, FormData, Msg, WorkflowKind, WorkflowPhase,
};

const HANDLE: &str = "https://n8n.example/webhook-waiting/h1";

enum CheckOutcome {
    Empty,
    Content(Checkpoint),
    Unreachable,
}

#[derive(Default)]
struct FakeRelay {
    checks: AtomicUsize,
    script: Mutex<VecDeque<CheckOutcome>>,
    submit_failure: Option<(u16, &'static str)>,
    init_failure: bool,
    check_delay: Duration,
}

impl FakeRelay {
    fn with_checks(script: Vec<CheckOutcome>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Self::default()
        }
    }

    fn checks(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RelayApi for FakeRelay {
    async fn init_workflow(&self, _kind: WorkflowKind) -> Result<String, ClientError> {
        if self.init_failure {
            return Err(ClientError::Api {
                status: 503,
                message: "Failed to initialize workflow".into(),
            });
        }
        Ok(HANDLE.to_string())
    }

    async fn submit_form(
        &self,
        _handle: &str,
        _form: &FormData,
    ) -> Result<Option<Checkpoint>, ClientError> {
        match self.submit_failure {
            Some((status, message)) => Err(ClientError::Api {
                status,
                message: message.into(),
            }),
            None => Ok(None),
        }
    }

    async fn submit_feedback(
        &self,
        _handle: &str,
        _feedback: &FeedbackData,
    ) -> Result<Option<Checkpoint>, ClientError> {
        Ok(None)
    }

    async fn continue_workflow(&self, _handle: &str) -> Result<Option<Checkpoint>, ClientError> {
        Ok(None)
    }

    async fn check_result(&self, handle: &str) -> Result<Option<Checkpoint>, ClientError> {
        assert_eq!(handle, HANDLE);
        self.checks.fetch_add(1, Ordering::SeqCst);
        if !self.check_delay.is_zero() {
            tokio::time::sleep(self.check_delay).await;
        }
        let next = self.script.lock().unwrap().pop_front();
        match next.unwrap_or(CheckOutcome::Empty) {
            CheckOutcome::Empty => Ok(None),
            CheckOutcome::Content(checkpoint) => Ok(Some(checkpoint)),
            CheckOutcome::Unreachable => Err(ClientError::Api {
                status: 503,
                message: "relay unavailable".into(),
            }),
        }
    }
}

fn init_logging() {
    relay_logging::initialize_for_tests();
}

fn phase_is(phase: WorkflowPhase) -> impl FnMut(&AppViewModel) -> bool {
    move |view| view.phase() == Some(phase)
}

async fn submitted(relay: Arc<FakeRelay>, state: AppState, kind: WorkflowKind) -> Driver {
    let mut driver = Driver::new(relay, state);
    driver.dispatch(Msg::WorkflowSelected(kind));
    driver
        .run_until(|view| view.session.as_ref().is_some_and(|s| !s.initializing))
        .await;
    driver.dispatch(Msg::FormSubmitted(FormData::default()));
    driver
}

#[tokio::test(start_paused = true)]
async fn polls_until_completion_then_stops() {
    init_logging();
    let relay = Arc::new(FakeRelay::with_checks(vec![
        CheckOutcome::Empty,
        CheckOutcome::Empty,
        CheckOutcome::Empty,
        CheckOutcome::Content(Checkpoint::End("https://drive/doc".into())),
    ]));
    let mut driver =
        submitted(relay.clone(), AppState::new(), WorkflowKind::SetupWithoutKeywords).await;

    let view = driver.run_until(phase_is(WorkflowPhase::Complete)).await;

    let session = view.session.unwrap();
    assert_eq!(session.completion_url.as_deref(), Some("https://drive/doc"));
    assert!(!session.polling);
    assert_eq!(relay.checks(), 4);
    assert_eq!(driver.active_polls(), 0);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(relay.checks(), 4);
}

#[tokio::test(start_paused = true)]
async fn failed_submission_goes_to_error_without_polling() {
    init_logging();
    let relay = Arc::new(FakeRelay {
        submit_failure: Some((502, "Failed to submit form")),
        ..FakeRelay::default()
    });
    let mut driver =
        submitted(relay.clone(), AppState::new(), WorkflowKind::SetupWithKeywords).await;

    let view = driver.run_until(phase_is(WorkflowPhase::Error)).await;

    assert_eq!(
        view.session.unwrap().error.as_deref(),
        Some("Failed to submit form")
    );
    assert_eq!(driver.active_polls(), 0);
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(relay.checks(), 0);
}

#[tokio::test(start_paused = true)]
async fn deadline_without_content_ends_in_error() {
    init_logging();
    let relay = Arc::new(FakeRelay::default());
    let state = AppState::new().with_poll_deadline(Duration::from_secs(10));
    let mut driver = submitted(relay.clone(), state, WorkflowKind::SetupWithoutKeywords).await;

    let view = driver.run_until(phase_is(WorkflowPhase::Error)).await;

    assert!(view.session.unwrap().error.unwrap().contains("Timed out"));
    let checks = relay.checks();
    assert!((4..=5).contains(&checks), "unexpected check count {checks}");
    assert_eq!(driver.active_polls(), 0);
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(relay.checks(), checks);
}

#[tokio::test(start_paused = true)]
async fn poll_errors_are_retried_on_the_next_tick() {
    init_logging();
    let relay = Arc::new(FakeRelay::with_checks(vec![
        CheckOutcome::Unreachable,
        CheckOutcome::Content(Checkpoint::Outline("1. Intro".into())),
    ]));
    let mut driver =
        submitted(relay.clone(), AppState::new(), WorkflowKind::ArticleGeneration).await;

    let view = driver.run_until(phase_is(WorkflowPhase::Outline)).await;

    let session = view.session.unwrap();
    assert_eq!(session.outline.as_deref(), Some("1. Intro"));
    assert_eq!(session.last_poll_error, None);
    assert_eq!(relay.checks(), 2);
}

#[tokio::test(start_paused = true)]
async fn slow_check_with_content_is_not_followed_by_an_immediate_check() {
    init_logging();
    let relay = Arc::new(FakeRelay {
        check_delay: Duration::from_secs(4),
        ..FakeRelay::with_checks(vec![CheckOutcome::Content(Checkpoint::Outline(
            "1. Intro".into(),
        ))])
    });
    let mut driver =
        submitted(relay.clone(), AppState::new(), WorkflowKind::ArticleGeneration).await;

    // First check starts at 3s and returns its content at 7s.
    tokio::time::sleep(Duration::from_millis(7500)).await;
    assert_eq!(relay.checks(), 1);

    let view = driver.run_until(phase_is(WorkflowPhase::Outline)).await;
    assert_eq!(view.session.unwrap().outline.as_deref(), Some("1. Intro"));
    assert_eq!(driver.active_polls(), 0);
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(relay.checks(), 1);
}

#[tokio::test(start_paused = true)]
async fn final_polling_ignores_everything_but_completion() {
    init_logging();
    let relay = Arc::new(FakeRelay::with_checks(vec![
        CheckOutcome::Content(Checkpoint::GetFeedback("https://sheets/1".into())),
        CheckOutcome::Content(Checkpoint::GetFeedback("https://sheets/2".into())),
        CheckOutcome::Content(Checkpoint::End("https://drive/ads".into())),
    ]));
    let mut driver =
        submitted(relay.clone(), AppState::new(), WorkflowKind::SetupWithKeywords).await;

    driver.run_until(phase_is(WorkflowPhase::Feedback)).await;
    assert_eq!(relay.checks(), 1);
    driver.dispatch(Msg::ContinueClicked);

    let view = driver.run_until(phase_is(WorkflowPhase::Complete)).await;
    let session = view.session.unwrap();
    assert_eq!(session.feedback_sheet_url.as_deref(), Some("https://sheets/1"));
    assert_eq!(session.completion_url.as_deref(), Some("https://drive/ads"));
    assert_eq!(relay.checks(), 3);
}

#[tokio::test(start_paused = true)]
async fn init_failure_leaves_the_form_usable_but_unsendable() {
    init_logging();
    let relay = Arc::new(FakeRelay {
        init_failure: true,
        ..FakeRelay::default()
    });
    let mut driver =
        submitted(relay.clone(), AppState::new(), WorkflowKind::SetupWithKeywords).await;

    let notice = driver.take_notice().expect("notice");
    assert!(notice.contains("not initialized"), "{notice}");
    let view = driver.view();
    assert_eq!(view.phase(), Some(WorkflowPhase::Form));
    assert_eq!(view.session.unwrap().resume_handle, None);
    assert_eq!(driver.active_polls(), 0);
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(relay.checks(), 0);
}

#[tokio::test(start_paused = true)]
async fn back_to_selection_stops_the_poller() {
    init_logging();
    let relay = Arc::new(FakeRelay::default());
    let mut driver =
        submitted(relay.clone(), AppState::new(), WorkflowKind::SetupWithoutKeywords).await;

    tokio::time::sleep(Duration::from_secs(5)).await;
    let before = relay.checks();
    assert_eq!(before, 2);

    driver.dispatch(Msg::BackToSelection);
    assert_eq!(driver.active_polls(), 0);
    assert_eq!(driver.view().session, None);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(relay.checks(), before);
}
