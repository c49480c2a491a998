//! CLI configuration

#[derive(Debug, Clone)]
pub struct Config {
    /// URL of the CreditDesk server
    pub server_url: String,

    /// Bearer token; only registration works without one
    pub token: Option<String>,
}
