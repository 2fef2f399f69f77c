use crate::state::WorkflowSession;
use crate::{AppState, Checkpoint, Effect, FeedbackData, Msg, PollId, WorkflowPhase};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::WorkflowSelected(kind) => {
            let previous = state.replace_session(Some(WorkflowSession::new(kind)));
            let mut effects = cancel_effect(previous.and_then(|session| session.active_poll));
            effects.push(Effect::InitializeWorkflow { kind });
            effects
        }
        Msg::WorkflowInitialized {
            kind,
            resume_handle,
        } => {
            if let Some(session) = state
                .session_mut()
                .filter(|session| session.kind == kind && session.initializing)
            {
                session.initializing = false;
                session.resume_handle = Some(resume_handle);
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::WorkflowInitFailed { kind, message } => {
            if let Some(session) = state
                .session_mut()
                .filter(|session| session.kind == kind && session.initializing)
            {
                session.initializing = false;
                state.set_notice(format!(
                    "Could not initialize the {} workflow ({message}). You can still fill in the form.",
                    kind.label()
                ));
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::FormSubmitted(form) => {
            match state.session() {
                Some(session) if session.phase == WorkflowPhase::Form => {}
                _ => return (state, Vec::new()),
            }
            match begin_polling(&mut state, WorkflowPhase::Loading) {
                Some((poll_id, handle, start)) => vec![
                    Effect::SubmitForm {
                        poll_id,
                        handle,
                        form,
                    },
                    start,
                ],
                None => {
                    state.set_notice(
                        "The workflow is not initialized yet, so the form cannot be sent.",
                    );
                    state.mark_dirty();
                    Vec::new()
                }
            }
        }
        Msg::FeedbackSubmitted { feedback, edited } => {
            let Some(session) = state.session_mut() else {
                return (state, Vec::new());
            };
            let feedback = match session.phase {
                WorkflowPhase::Outline => {
                    if let Some(text) = &edited {
                        session.outline = Some(text.clone());
                    }
                    FeedbackData {
                        feedback,
                        edited_outline: edited,
                        edited_article: None,
                    }
                }
                WorkflowPhase::Article => {
                    if let Some(text) = &edited {
                        session.article = Some(text.clone());
                    }
                    FeedbackData {
                        feedback,
                        edited_outline: None,
                        edited_article: edited,
                    }
                }
                _ => return (state, Vec::new()),
            };
            begin_polling(&mut state, WorkflowPhase::Loading)
                .map(|(poll_id, handle, start)| {
                    vec![
                        Effect::SubmitFeedback {
                            poll_id,
                            handle,
                            feedback,
                        },
                        start,
                    ]
                })
                .unwrap_or_default()
        }
        Msg::ContinueClicked => {
            match state.session() {
                Some(session) if session.phase == WorkflowPhase::Feedback => {}
                _ => return (state, Vec::new()),
            }
            begin_polling(&mut state, WorkflowPhase::FinalLoading)
                .map(|(poll_id, handle, start)| {
                    vec![Effect::ContinueWorkflow { poll_id, handle }, start]
                })
                .unwrap_or_default()
        }
        Msg::SubmitSucceeded {
            poll_id,
            checkpoint,
        } => match checkpoint {
            Some(checkpoint) => accept_checkpoint(&mut state, poll_id, checkpoint),
            None => Vec::new(),
        },
        Msg::PollResult {
            poll_id,
            checkpoint,
        } => accept_checkpoint(&mut state, poll_id, checkpoint),
        Msg::SubmitFailed { poll_id, failure } => {
            let Some(session) = current_session(&mut state, poll_id) else {
                return (state, Vec::new());
            };
            session.active_poll = None;
            if failure.is_validation() {
                session.phase = WorkflowPhase::Form;
                state.set_notice(failure.message);
            } else {
                session.phase = WorkflowPhase::Error;
                session.error = Some(failure.message);
            }
            state.mark_dirty();
            vec![Effect::CancelPolling { poll_id }]
        }
        Msg::PollFailed { poll_id, message } => {
            if let Some(session) = current_session(&mut state, poll_id) {
                session.last_poll_error = Some(message);
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::PollDeadlineElapsed { poll_id } => {
            let minutes = state.poll_deadline().as_secs() / 60;
            let Some(session) = current_session(&mut state, poll_id) else {
                return (state, Vec::new());
            };
            session.active_poll = None;
            session.phase = WorkflowPhase::Error;
            session.error = Some(format!(
                "Timed out after {minutes} minutes without a response from the workflow"
            ));
            state.mark_dirty();
            vec![Effect::CancelPolling { poll_id }]
        }
        Msg::RetryClicked => {
            if let Some(session) = state
                .session_mut()
                .filter(|session| session.phase == WorkflowPhase::Error)
            {
                session.phase = WorkflowPhase::Form;
                session.error = None;
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::BackToSelection => {
            if state.session().is_none() {
                return (state, Vec::new());
            }
            let previous = state.replace_session(None);
            cancel_effect(previous.and_then(|session| session.active_poll))
        }
    };

    (state, effects)
}

/// Enters `phase` with a fresh polling run. Returns `None` without touching
/// state when the session has no resume handle yet.
fn begin_polling(
    state: &mut AppState,
    phase: WorkflowPhase,
) -> Option<(PollId, String, Effect)> {
    let (kind, handle) = {
        let session = state.session()?;
        (session.kind, session.resume_handle.clone()?)
    };
    let poll_id = state.allocate_poll_id();
    let deadline = state.poll_deadline();
    let session = state.session_mut()?;
    session.phase = phase;
    session.active_poll = Some(poll_id);
    session.error = None;
    session.last_poll_error = None;
    state.mark_dirty();

    let start = Effect::StartPolling {
        poll_id,
        handle: handle.clone(),
        interval: kind.poll_interval(),
        deadline,
    };
    Some((poll_id, handle, start))
}

/// The session, but only while it is still waiting on `poll_id`.
fn current_session(state: &mut AppState, poll_id: PollId) -> Option<&mut WorkflowSession> {
    state
        .session_mut()
        .filter(|session| session.is_current_poll(poll_id))
}

fn accept_checkpoint(
    state: &mut AppState,
    poll_id: PollId,
    checkpoint: Checkpoint,
) -> Vec<Effect> {
    let Some(session) = current_session(state, poll_id) else {
        return Vec::new();
    };
    if !session.apply_checkpoint(checkpoint) {
        return Vec::new();
    }
    session.active_poll = None;
    let notice = match session.phase {
        WorkflowPhase::Outline => "Outline ready for review",
        WorkflowPhase::Article => "Article ready for review",
        WorkflowPhase::Feedback => "Please fill in the feedback sheet, then continue",
        _ => "Workflow completed",
    };
    state.set_notice(notice);
    state.mark_dirty();
    vec![Effect::CancelPolling { poll_id }]
}

fn cancel_effect(active_poll: Option<PollId>) -> Vec<Effect> {
    active_poll
        .map(|poll_id| Effect::CancelPolling { poll_id })
        .into_iter()
        .collect()
}
