//! Polling of dispatched jobs

mod poller;

pub use poller::{PollOutcome, Poller, TIMEOUT_MESSAGE, poll_until_terminal};
