//! API client module
//!
//! HTTP client for the CreditDesk server API.

use anyhow::{Context, Result};
use creditdesk_core::analytics::JobAnalytics;
use creditdesk_core::domain::job::Job;
use creditdesk_core::domain::schedule::Schedule;
use creditdesk_core::dto::chat::{ChatReply, ChatRequest};
use creditdesk_core::dto::job::SubmitJob;
use creditdesk_core::dto::organization::{RegisterOrganization, RegistrationReceipt};
use creditdesk_core::dto::schedule::CreateSchedule;
use reqwest::{Client, RequestBuilder};
use uuid::Uuid;

/// HTTP client for the CreditDesk server API
pub struct ApiClient {
    base_url: String,
    token: Option<String>,
    client: Client,
}

impl ApiClient {
    pub fn new(base_url: &str, token: Option<String>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            client: Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Submit a job; with `wait` the server answers once the job is terminal
    pub async fn submit_job(&self, req: &SubmitJob, wait: bool) -> Result<Job> {
        let response = self
            .authorized(self.client.post(self.url("/jobs")))
            .query(&[("wait", wait)])
            .json(req)
            .send()
            .await
            .context("Failed to send submit job request")?;

        handle_response(response).await
    }

    pub async fn list_jobs(&self) -> Result<Vec<Job>> {
        let response = self
            .authorized(self.client.get(self.url("/jobs")))
            .send()
            .await
            .context("Failed to send list jobs request")?;

        handle_response(response).await
    }

    pub async fn get_job(&self, id: Uuid) -> Result<Job> {
        let response = self
            .authorized(self.client.get(self.url(&format!("/jobs/{}", id))))
            .send()
            .await
            .context("Failed to send get job request")?;

        handle_response(response).await
    }

    /// Block until the job is terminal, polled by the server
    pub async fn await_job(&self, id: Uuid) -> Result<Job> {
        let response = self
            .authorized(self.client.post(self.url(&format!("/jobs/{}/await", id))))
            .send()
            .await
            .context("Failed to send await job request")?;

        handle_response(response).await
    }

    pub async fn job_analytics(&self, days: Option<u32>) -> Result<JobAnalytics> {
        let mut request = self.authorized(self.client.get(self.url("/jobs/analytics")));
        if let Some(days) = days {
            request = request.query(&[("days", days)]);
        }
        let response = request
            .send()
            .await
            .context("Failed to send analytics request")?;

        handle_response(response).await
    }

    pub async fn chat(&self, req: &ChatRequest) -> Result<ChatReply> {
        let response = self
            .authorized(self.client.post(self.url("/chat")))
            .json(req)
            .send()
            .await
            .context("Failed to send chat request")?;

        handle_response(response).await
    }

    pub async fn register_organization(
        &self,
        req: &RegisterOrganization,
    ) -> Result<RegistrationReceipt> {
        let response = self
            .client
            .post(self.url("/organizations/register"))
            .json(req)
            .send()
            .await
            .context("Failed to send registration request")?;

        handle_response(response).await
    }

    pub async fn create_schedule(&self, req: &CreateSchedule) -> Result<Schedule> {
        let response = self
            .authorized(self.client.post(self.url("/schedules")))
            .json(req)
            .send()
            .await
            .context("Failed to send create schedule request")?;

        handle_response(response).await
    }

    pub async fn list_schedules(&self) -> Result<Vec<Schedule>> {
        let response = self
            .authorized(self.client.get(self.url("/schedules")))
            .send()
            .await
            .context("Failed to send list schedules request")?;

        handle_response(response).await
    }
}

/// Deserialize a successful response, or fail with the server's error message
async fn handle_response<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    if !response.status().is_success() {
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        anyhow::bail!(
            "Request failed with status {}: {}",
            status,
            error_message(&error_text)
        );
    }

    response
        .json()
        .await
        .context("Failed to parse response JSON")
}

/// The `error` field of a JSON error body, or the raw body
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message() {
        assert_eq!(
            error_message(r#"{"error":"Authorization required"}"#),
            "Authorization required"
        );
        assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
    }
}
