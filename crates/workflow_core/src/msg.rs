use crate::{Checkpoint, FeedbackData, FormData, PollId, WorkflowKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User picked a workflow from the selection screen.
    WorkflowSelected(WorkflowKind),
    /// Relay returned a resume handle for the selected workflow.
    WorkflowInitialized {
        kind: WorkflowKind,
        resume_handle: String,
    },
    WorkflowInitFailed {
        kind: WorkflowKind,
        message: String,
    },
    /// User submitted the workflow form.
    FormSubmitted(FormData),
    /// Forwarded request finished; a synchronous reply may carry content.
    SubmitSucceeded {
        poll_id: PollId,
        checkpoint: Option<Checkpoint>,
    },
    SubmitFailed {
        poll_id: PollId,
        failure: SubmitFailure,
    },
    /// A poll took content from the relay.
    PollResult {
        poll_id: PollId,
        checkpoint: Checkpoint,
    },
    /// A single poll failed; polling keeps going.
    PollFailed { poll_id: PollId, message: String },
    PollDeadlineElapsed { poll_id: PollId },
    /// User sent feedback on the outline or article, optionally with an edited copy.
    FeedbackSubmitted {
        feedback: String,
        edited: Option<String>,
    },
    /// User confirmed the feedback sheet is filled in.
    ContinueClicked,
    RetryClicked,
    BackToSelection,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitFailure {
    /// HTTP status from the relay; `None` when the relay was not reached.
    pub status: Option<u16>,
    pub message: String,
}

impl SubmitFailure {
    /// The relay rejected the request itself rather than the workflow failing.
    pub fn is_validation(&self) -> bool {
        self.status == Some(400)
    }
}
