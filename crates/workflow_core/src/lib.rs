//! Workflow core: pure client state machine and view-model helpers.
mod effect;
mod kind;
mod msg;
mod state;
mod update;
mod view_model;

pub use effect::{Effect, FeedbackData, FormData};
pub use kind::{Checkpoint, WorkflowKind, POLL_DEADLINE};
pub use msg::{Msg, SubmitFailure};
pub use state::{AppState, PollId, WorkflowPhase};
pub use update::update;
pub use view_model::{AppViewModel, SessionView};
