use std::sync::Arc;
use std::time::Duration;

use relay_logging::{relay_debug, relay_trace, relay_warn};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use workflow_core::{Msg, PollId};

use crate::client::RelayApi;

/// One polling run: which handle to check, how often, and for how long.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollRequest {
    pub poll_id: PollId,
    pub handle: String,
    pub interval: Duration,
    pub deadline: Duration,
}

/// Spawns a task that checks the relay every `interval` until `cancel` fires
/// or the deadline passes. The first check happens one interval after start,
/// and a check that delivered content is followed by a full interval of quiet.
pub fn spawn_poller(
    api: Arc<dyn RelayApi>,
    request: PollRequest,
    cancel: CancellationToken,
    msg_tx: UnboundedSender<Msg>,
) -> JoinHandle<()> {
    tokio::spawn(run_poller(api, request, cancel, msg_tx))
}

async fn run_poller(
    api: Arc<dyn RelayApi>,
    request: PollRequest,
    cancel: CancellationToken,
    msg_tx: UnboundedSender<Msg>,
) {
    let PollRequest {
        poll_id,
        handle,
        interval,
        deadline,
    } = request;
    let mut ticker = interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let deadline_timer = sleep(deadline);
    tokio::pin!(deadline_timer);
    let mut checks = 0u32;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                relay_debug!("Poll {} cancelled after {} checks", poll_id, checks);
                return;
            }
            _ = &mut deadline_timer => {
                relay_warn!("Poll {} reached its deadline after {} checks", poll_id, checks);
                let _ = msg_tx.send(Msg::PollDeadlineElapsed { poll_id });
                return;
            }
            _ = ticker.tick() => {}
        }

        checks += 1;
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            result = api.check_result(&handle) => result,
        };

        let msg = match result {
            Ok(Some(checkpoint)) => {
                relay_debug!("Poll {} received content on check {}", poll_id, checks);
                // Checking again before the receiver cancels would consume the next entry.
                ticker.reset();
                Msg::PollResult {
                    poll_id,
                    checkpoint,
                }
            }
            Ok(None) => {
                relay_trace!("Poll {} check {}: nothing yet", poll_id, checks);
                continue;
            }
            Err(err) => {
                relay_warn!("Poll {} check {} failed: {}", poll_id, checks, err);
                Msg::PollFailed {
                    poll_id,
                    message: err.to_string(),
                }
            }
        };
        if cancel.is_cancelled() || msg_tx.send(msg).is_err() {
            return;
        }
    }
}
