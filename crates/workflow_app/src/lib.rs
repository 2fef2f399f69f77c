//! Workflow app: runs the client state machine against a relay server.
mod client;
mod driver;
mod effects;
mod poller;

pub use client::{checkpoint_from_value, ClientError, HttpRelayClient, RelayApi};
pub use driver::Driver;
pub use effects::EffectRunner;
pub use poller::{spawn_poller, PollRequest};
