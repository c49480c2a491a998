//! Service layer
//!
//! Job dispatch and chat, built on top of the job store and the agent client.

mod chat;
mod dispatch;

pub use chat::ChatService;
pub use dispatch::{Dispatcher, Submission};
