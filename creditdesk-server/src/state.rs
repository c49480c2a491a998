//! Shared application state handed to every handler

use creditdesk_client::{AgentClient, IdentityProvider};
use creditdesk_dispatcher::{ChatService, Dispatcher, JobStore, PollConfig};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::repository::DirectoryStore;

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub chat: ChatService,
    pub directory: Arc<dyn DirectoryStore>,
    pub identity: Arc<dyn IdentityProvider>,
    /// Cancelled on shutdown; stops pollers started by requests
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        directory: Arc<dyn DirectoryStore>,
        agent: Arc<dyn AgentClient>,
        identity: Arc<dyn IdentityProvider>,
        poll: PollConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            dispatcher: Dispatcher::new(jobs, Arc::clone(&agent), poll, shutdown.clone()),
            chat: ChatService::new(agent, poll),
            directory,
            identity,
            shutdown,
        }
    }
}
