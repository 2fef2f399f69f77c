use std::collections::HashMap;
use std::sync::Arc;

use relay_logging::{relay_info, relay_warn};
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use workflow_core::{Checkpoint, Effect, Msg, PollId, SubmitFailure};

use crate::client::{ClientError, RelayApi};
use crate::poller::{spawn_poller, PollRequest};

/// Executes core effects on tokio tasks; every outcome comes back as a `Msg`.
/// Must be used from within a tokio runtime.
pub struct EffectRunner {
    api: Arc<dyn RelayApi>,
    msg_tx: UnboundedSender<Msg>,
    pollers: HashMap<PollId, CancellationToken>,
}

impl EffectRunner {
    pub fn new(api: Arc<dyn RelayApi>, msg_tx: UnboundedSender<Msg>) -> Self {
        Self {
            api,
            msg_tx,
            pollers: HashMap::new(),
        }
    }

    /// Number of polling runs that have not been cancelled yet.
    pub fn active_polls(&self) -> usize {
        self.pollers.len()
    }

    pub fn enqueue(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::InitializeWorkflow { kind } => {
                    relay_info!("InitializeWorkflow kind={}", kind);
                    let api = self.api.clone();
                    let msg_tx = self.msg_tx.clone();
                    tokio::spawn(async move {
                        let msg = match api.init_workflow(kind).await {
                            Ok(resume_handle) => Msg::WorkflowInitialized {
                                kind,
                                resume_handle,
                            },
                            Err(err) => {
                                relay_warn!("Initializing {} failed: {}", kind, err);
                                Msg::WorkflowInitFailed {
                                    kind,
                                    message: err.user_message(),
                                }
                            }
                        };
                        let _ = msg_tx.send(msg);
                    });
                }
                Effect::SubmitForm {
                    poll_id,
                    handle,
                    form,
                } => {
                    relay_info!(
                        "SubmitForm poll_id={} fields={} handle={}",
                        poll_id,
                        form.fields.len(),
                        handle
                    );
                    let api = self.api.clone();
                    self.spawn_submission(poll_id, async move {
                        api.submit_form(&handle, &form).await
                    });
                }
                Effect::SubmitFeedback {
                    poll_id,
                    handle,
                    feedback,
                } => {
                    relay_info!("SubmitFeedback poll_id={} handle={}", poll_id, handle);
                    let api = self.api.clone();
                    self.spawn_submission(poll_id, async move {
                        api.submit_feedback(&handle, &feedback).await
                    });
                }
                Effect::ContinueWorkflow { poll_id, handle } => {
                    relay_info!("ContinueWorkflow poll_id={} handle={}", poll_id, handle);
                    let api = self.api.clone();
                    self.spawn_submission(poll_id, async move {
                        api.continue_workflow(&handle).await
                    });
                }
                Effect::StartPolling {
                    poll_id,
                    handle,
                    interval,
                    deadline,
                } => {
                    relay_info!(
                        "StartPolling poll_id={} interval={:?} deadline={:?}",
                        poll_id,
                        interval,
                        deadline
                    );
                    let cancel = CancellationToken::new();
                    if let Some(previous) = self.pollers.insert(poll_id, cancel.clone()) {
                        previous.cancel();
                    }
                    spawn_poller(
                        self.api.clone(),
                        PollRequest {
                            poll_id,
                            handle,
                            interval,
                            deadline,
                        },
                        cancel,
                        self.msg_tx.clone(),
                    );
                }
                Effect::CancelPolling { poll_id } => {
                    if let Some(cancel) = self.pollers.remove(&poll_id) {
                        relay_info!("CancelPolling poll_id={}", poll_id);
                        cancel.cancel();
                    }
                }
            }
        }
    }

    fn spawn_submission<F>(&self, poll_id: PollId, request: F)
    where
        F: std::future::Future<Output = Result<Option<Checkpoint>, ClientError>>
            + Send
            + 'static,
    {
        let msg_tx = self.msg_tx.clone();
        tokio::spawn(async move {
            let msg = match request.await {
                Ok(checkpoint) => Msg::SubmitSucceeded {
                    poll_id,
                    checkpoint,
                },
                Err(err) => {
                    relay_warn!("Submission for poll {} failed: {}", poll_id, err);
                    Msg::SubmitFailed {
                        poll_id,
                        failure: SubmitFailure {
                            status: err.status(),
                            message: err.user_message(),
                        },
                    }
                }
            };
            let _ = msg_tx.send(msg);
        });
    }
}

impl Drop for EffectRunner {
    fn drop(&mut self) {
        for (_, cancel) in self.pollers.drain() {
            cancel.cancel();
        }
    }
}
