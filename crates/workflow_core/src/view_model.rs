use crate::{WorkflowKind, WorkflowPhase};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    /// `None` while the user is on the workflow selection screen.
    pub session: Option<SessionView>,
}

impl AppViewModel {
    pub fn phase(&self) -> Option<WorkflowPhase> {
        self.session.as_ref().map(|session| session.phase)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    pub kind: WorkflowKind,
    pub phase: WorkflowPhase,
    pub resume_handle: Option<String>,
    pub initializing: bool,
    pub polling: bool,
    pub outline: Option<String>,
    pub article: Option<String>,
    pub feedback_sheet_url: Option<String>,
    pub completion_url: Option<String>,
    pub error: Option<String>,
    pub last_poll_error: Option<String>,
}
