use std::time::Duration;

use crate::view_model::{AppViewModel, SessionView};
use crate::{Checkpoint, WorkflowKind, POLL_DEADLINE};

pub type PollId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkflowPhase {
    #[default]
    Form,
    Loading,
    Outline,
    Article,
    /// Waiting for the user to fill in an external feedback sheet.
    Feedback,
    /// Feedback sheet acknowledged; only completion ends this phase.
    FinalLoading,
    Complete,
    Error,
}

impl WorkflowPhase {
    pub fn is_loading(self) -> bool {
        matches!(self, WorkflowPhase::Loading | WorkflowPhase::FinalLoading)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct WorkflowSession {
    pub(crate) kind: WorkflowKind,
    pub(crate) resume_handle: Option<String>,
    pub(crate) initializing: bool,
    pub(crate) phase: WorkflowPhase,
    pub(crate) outline: Option<String>,
    pub(crate) article: Option<String>,
    pub(crate) feedback_sheet_url: Option<String>,
    pub(crate) completion_url: Option<String>,
    pub(crate) error: Option<String>,
    pub(crate) last_poll_error: Option<String>,
    pub(crate) active_poll: Option<PollId>,
}

impl WorkflowSession {
    pub(crate) fn new(kind: WorkflowKind) -> Self {
        Self {
            kind,
            resume_handle: None,
            initializing: true,
            phase: WorkflowPhase::Form,
            outline: None,
            article: None,
            feedback_sheet_url: None,
            completion_url: None,
            error: None,
            last_poll_error: None,
            active_poll: None,
        }
    }

    /// True when `poll_id` belongs to the run this session is waiting on.
    pub(crate) fn is_current_poll(&self, poll_id: PollId) -> bool {
        self.phase.is_loading() && self.active_poll == Some(poll_id)
    }

    /// Moves to the phase matching `checkpoint`. Returns false when the
    /// current phase does not accept it.
    pub(crate) fn apply_checkpoint(&mut self, checkpoint: Checkpoint) -> bool {
        match (self.phase, checkpoint) {
            (WorkflowPhase::Loading | WorkflowPhase::FinalLoading, Checkpoint::End(url)) => {
                self.completion_url = Some(url);
                self.phase = WorkflowPhase::Complete;
            }
            (WorkflowPhase::Loading, Checkpoint::Outline(text)) => {
                self.outline = Some(text);
                self.phase = WorkflowPhase::Outline;
            }
            (WorkflowPhase::Loading, Checkpoint::Article(text)) => {
                self.article = Some(text);
                self.phase = WorkflowPhase::Article;
            }
            (WorkflowPhase::Loading, Checkpoint::GetFeedback(url)) => {
                self.feedback_sheet_url = Some(url);
                self.phase = WorkflowPhase::Feedback;
            }
            _ => return false,
        }
        self.last_poll_error = None;
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    session: Option<WorkflowSession>,
    next_poll_id: PollId,
    poll_deadline: Duration,
    notice: Option<String>,
    dirty: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            session: None,
            next_poll_id: 1,
            poll_deadline: POLL_DEADLINE,
            notice: None,
            dirty: false,
        }
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_poll_deadline(mut self, deadline: Duration) -> Self {
        self.poll_deadline = deadline;
        self
    }

    pub fn poll_deadline(&self) -> Duration {
        self.poll_deadline
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel {
            session: self.session.as_ref().map(|session| SessionView {
                kind: session.kind,
                phase: session.phase,
                resume_handle: session.resume_handle.clone(),
                initializing: session.initializing,
                polling: session.active_poll.is_some(),
                outline: session.outline.clone(),
                article: session.article.clone(),
                feedback_sheet_url: session.feedback_sheet_url.clone(),
                completion_url: session.completion_url.clone(),
                error: session.error.clone(),
                last_poll_error: session.last_poll_error.clone(),
            }),
        }
    }

    /// Returns whether the view changed since the last call and resets the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// One-shot message for the user, cleared once read.
    pub fn take_notice(&mut self) -> Option<String> {
        self.notice.take()
    }

    pub(crate) fn session(&self) -> Option<&WorkflowSession> {
        self.session.as_ref()
    }

    pub(crate) fn session_mut(&mut self) -> Option<&mut WorkflowSession> {
        self.session.as_mut()
    }

    pub(crate) fn replace_session(
        &mut self,
        session: Option<WorkflowSession>,
    ) -> Option<WorkflowSession> {
        self.dirty = true;
        std::mem::replace(&mut self.session, session)
    }

    pub(crate) fn allocate_poll_id(&mut self) -> PollId {
        let id = self.next_poll_id;
        self.next_poll_id += 1;
        id
    }

    pub(crate) fn set_notice(&mut self, notice: impl Into<String>) {
        self.notice = Some(notice.into());
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }
}
