use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use workflow_core::{update, AppState, AppViewModel, Msg};

use crate::client::RelayApi;
use crate::effects::EffectRunner;

/// Owns the state machine and feeds it messages from the user and from
/// running effects, one at a time.
pub struct Driver {
    state: AppState,
    runner: EffectRunner,
    msg_tx: UnboundedSender<Msg>,
    msg_rx: UnboundedReceiver<Msg>,
}

impl Driver {
    pub fn new(api: Arc<dyn RelayApi>, state: AppState) -> Self {
        let (msg_tx, msg_rx) = mpsc::unbounded_channel();
        Self {
            state,
            runner: EffectRunner::new(api, msg_tx.clone()),
            msg_tx,
            msg_rx,
        }
    }

    /// Sender for messages originating outside the driver.
    pub fn sender(&self) -> UnboundedSender<Msg> {
        self.msg_tx.clone()
    }

    pub fn view(&self) -> AppViewModel {
        self.state.view()
    }

    pub fn take_notice(&mut self) -> Option<String> {
        self.state.take_notice()
    }

    pub fn active_polls(&self) -> usize {
        self.runner.active_polls()
    }

    /// Applies `msg` and starts its effects. Returns the new view when it changed.
    pub fn dispatch(&mut self, msg: Msg) -> Option<AppViewModel> {
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        let was_dirty = state.consume_dirty();
        let view = state.view();
        self.state = state;
        self.runner.enqueue(effects);
        was_dirty.then_some(view)
    }

    /// Processes incoming messages until `done` holds for the current view.
    pub async fn run_until<F>(&mut self, mut done: F) -> AppViewModel
    where
        F: FnMut(&AppViewModel) -> bool,
    {
        loop {
            let view = self.state.view();
            if done(&view) {
                return view;
            }
            match self.msg_rx.recv().await {
                Some(msg) => {
                    self.dispatch(msg);
                }
                // Unreachable while `self.msg_tx` is alive.
                None => return view,
            }
        }
    }
}
