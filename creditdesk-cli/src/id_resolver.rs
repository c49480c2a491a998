//! ID resolver module
//!
//! Resolves job ID prefixes to full UUIDs by listing the caller's jobs, so
//! short unambiguous prefixes can be typed instead of full UUIDs.

use anyhow::{Context, Result, anyhow};
use uuid::Uuid;

use crate::api::ApiClient;
use crate::types::IdOrPrefix;

/// Resolve a job ID or prefix to a full UUID
///
/// # Errors
/// Returns an error if no job or more than one job matches the prefix, or
/// if the jobs cannot be listed.
pub async fn resolve_job_id(client: &ApiClient, id_or_prefix: &IdOrPrefix) -> Result<Uuid> {
    // If it's already a full UUID, return it
    if let Some(uuid) = id_or_prefix.as_uuid() {
        return Ok(uuid);
    }

    let jobs = client
        .list_jobs()
        .await
        .context("Failed to fetch jobs for ID resolution")?;

    match_prefix(jobs.iter().map(|j| j.id), &id_or_prefix.to_string())
}

fn match_prefix(ids: impl Iterator<Item = Uuid>, prefix: &str) -> Result<Uuid> {
    let matches: Vec<Uuid> = ids
        .filter(|id| id.to_string().starts_with(prefix))
        .collect();

    match matches.as_slice() {
        [] => Err(anyhow!("No job found with ID starting with '{}'", prefix)),
        [id] => Ok(*id),
        _ => {
            let ids: Vec<String> = matches.iter().map(|id| id.to_string()).collect();
            Err(anyhow!(
                "Ambiguous prefix '{}' matches multiple jobs: {}",
                prefix,
                ids.join(", ")
            ))
        }
    }
}
