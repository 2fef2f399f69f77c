use std::path::PathBuf;
use std::time::Duration;

use crate::{PollId, WorkflowKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    InitializeWorkflow {
        kind: WorkflowKind,
    },
    SubmitForm {
        poll_id: PollId,
        handle: String,
        form: FormData,
    },
    SubmitFeedback {
        poll_id: PollId,
        handle: String,
        feedback: FeedbackData,
    },
    /// Acknowledge an external feedback sheet so the workflow resumes.
    ContinueWorkflow {
        poll_id: PollId,
        handle: String,
    },
    StartPolling {
        poll_id: PollId,
        handle: String,
        interval: Duration,
        deadline: Duration,
    },
    CancelPolling {
        poll_id: PollId,
    },
}

/// Form fields as entered, plus an optional file to upload.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FormData {
    pub fields: Vec<(String, String)>,
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FeedbackData {
    pub feedback: String,
    pub edited_outline: Option<String>,
    pub edited_article: Option<String>,
}
