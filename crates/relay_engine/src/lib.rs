//! Relay engine: result mailbox, workflow IO, and the relay operations.
mod error;
mod mailbox;
mod relay;
mod sanitize;
mod types;
mod upstream;

pub use error::RelayError;
pub use mailbox::Mailbox;
pub use relay::{Relay, WorkflowRoutes, SETUP_WITH_KEYWORDS};
pub use sanitize::{clean_json_text, decode_body, parse_workflow_body, SanitizeError};
pub use types::{
    CheckpointFields, FeedbackSubmission, FileUpload, FormSubmission, ResumeHandle, StoredResult,
};
pub use upstream::{
    FailureKind, ReqwestUpstream, Upstream, UpstreamError, UpstreamPayload, UpstreamReply,
    UpstreamSettings,
};
