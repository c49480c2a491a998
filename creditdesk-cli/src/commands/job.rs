//! Job command handlers
//!
//! Submitting reports, listing and inspecting them, and dashboard analytics.

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use creditdesk_core::analytics::JobAnalytics;
use creditdesk_core::domain::job::{Job, JobSpec, JobStatus};
use creditdesk_core::dto::job::SubmitJob;

use crate::api::ApiClient;
use crate::config::Config;
use crate::id_resolver::resolve_job_id;
use crate::types::IdOrPrefix;

/// Job subcommands
#[derive(Subcommand)]
pub enum JobCommands {
    /// Submit a report job
    Submit {
        /// Report name
        #[arg(long)]
        name: String,

        /// Template identifier
        #[arg(long)]
        template: String,

        /// Free-text instructions for the agent
        #[arg(long)]
        instructions: Option<String>,

        /// Data source identifier (repeatable)
        #[arg(long = "source")]
        sources: Vec<String>,

        /// Wait for the job to finish
        #[arg(short, long)]
        wait: bool,
    },
    /// List the organization's jobs
    List,
    /// Get job details
    Get {
        /// Job ID or unambiguous prefix
        id: String,
    },
    /// Wait for a processing job to finish
    Wait {
        /// Job ID or unambiguous prefix
        id: String,
    },
    /// Show job analytics
    Analytics {
        /// Window in days (default: 7)
        #[arg(long)]
        days: Option<u32>,
    },
}

pub async fn handle_job_command(command: JobCommands, config: &Config) -> Result<()> {
    let client = ApiClient::new(&config.server_url, config.token.clone());

    match command {
        JobCommands::Submit {
            name,
            template,
            instructions,
            sources,
            wait,
        } => {
            let req = SubmitJob {
                organization_id: None,
                spec: JobSpec {
                    name,
                    template,
                    instructions,
                    data_sources: sources,
                },
            };
            submit_job(&client, req, wait).await
        }
        JobCommands::List => list_jobs(&client).await,
        JobCommands::Get { id } => get_job(&client, &id).await,
        JobCommands::Wait { id } => wait_job(&client, &id).await,
        JobCommands::Analytics { days } => show_analytics(&client, days).await,
    }
}

async fn submit_job(client: &ApiClient, req: SubmitJob, wait: bool) -> Result<()> {
    if wait {
        println!("{}", "Waiting for the agent to finish...".dimmed());
    }

    let job = client.submit_job(&req, wait).await?;

    match job.status {
        JobStatus::Failed => println!("{}", "✗ Job failed".red().bold()),
        _ => println!("{}", "✓ Job submitted".green().bold()),
    }
    println!();
    print_job_details(&job);

    Ok(())
}

async fn list_jobs(client: &ApiClient) -> Result<()> {
    let jobs = client.list_jobs().await?;

    if jobs.is_empty() {
        println!("{}", "No jobs found.".yellow());
    } else {
        println!("{}", format!("Found {} job(s):", jobs.len()).bold());
        println!();
        for job in jobs {
            print_job_summary(&job);
        }
    }

    Ok(())
}

async fn get_job(client: &ApiClient, id: &str) -> Result<()> {
    let uuid = resolve_job_id(client, &IdOrPrefix::parse(id)).await?;
    let job = client.get_job(uuid).await?;

    print_job_details(&job);

    Ok(())
}

async fn wait_job(client: &ApiClient, id: &str) -> Result<()> {
    let uuid = resolve_job_id(client, &IdOrPrefix::parse(id)).await?;

    println!("{}", format!("Waiting for job {}...", uuid).dimmed());
    let job = client.await_job(uuid).await?;

    print_job_details(&job);

    Ok(())
}

async fn show_analytics(client: &ApiClient, days: Option<u32>) -> Result<()> {
    let analytics = client.job_analytics(days).await?;
    print_analytics(&analytics);
    Ok(())
}

/// Print a job summary line block
fn print_job_summary(job: &Job) {
    println!("  {} {} {}", "▸".cyan(), job.name.bold(), job.id.to_string().dimmed());
    println!("    Template:  {}", job.template);
    println!("    Status:    {}", colorize_status(job.status));
    println!(
        "    Submitted: {}",
        job.submitted_at
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed()
    );
    println!();
}

/// Print detailed job information
fn print_job_details(job: &Job) {
    println!("{}", "Job Details:".bold());
    println!("  ID:        {}", job.id.to_string().cyan());
    println!("  Name:      {}", job.name);
    println!("  Template:  {}", job.template);
    println!("  Status:    {}", colorize_status(job.status));
    println!("  Submitted: {}", job.submitted_at.format("%Y-%m-%d %H:%M:%S"));

    if let Some(completed) = job.completed_at {
        println!("  Completed: {}", completed.format("%Y-%m-%d %H:%M:%S"));
    }
    if let Some(ms) = job.execution_time_ms {
        println!("  Duration:  {:.1}s", ms as f64 / 1000.0);
    }
    if let Some(instructions) = &job.instructions {
        println!("  Instructions: {}", instructions.dimmed());
    }
    if !job.data_sources.is_empty() {
        println!("  Sources:   {}", job.data_sources.join(", "));
    }

    if let Some(result) = &job.result {
        println!("\n{}", "Result:".bold());
        match result.get("response").and_then(|r| r.as_str()) {
            Some(text) => println!("{}", text),
            None => match serde_json::to_string_pretty(result) {
                Ok(pretty) => println!("{}", pretty),
                Err(_) => println!("{}", result),
            },
        }
    }

    if let Some(error) = &job.error_message {
        println!("\n{}", "Error:".bold());
        println!("{}", error.red());
    }
}

fn print_analytics(analytics: &JobAnalytics) {
    println!("{}", "Daily activity:".bold());
    for day in &analytics.activity {
        println!(
            "  {}  {:>4} {}",
            day.date.format("%Y-%m-%d").to_string().dimmed(),
            day.jobs,
            "■".repeat(day.jobs.min(40)).cyan()
        );
    }

    println!("\n{}", "Status:".bold());
    if analytics.status_counts.is_empty() {
        println!("  {}", "No jobs in this window.".yellow());
    }
    for entry in &analytics.status_counts {
        println!("  {:<12} {}", colorize_status(entry.status), entry.count);
    }

    if !analytics.templates.is_empty() {
        println!("\n{}", "Top templates:".bold());
        for entry in &analytics.templates {
            println!("  {:<32} {}", entry.template, entry.count);
        }
    }
}

/// Colorize job status for display
fn colorize_status(status: JobStatus) -> ColoredString {
    let status_str = status.as_str();
    match status {
        JobStatus::Pending => status_str.yellow(),
        JobStatus::Processing => status_str.cyan(),
        JobStatus::Completed => status_str.green(),
        JobStatus::Failed => status_str.red(),
    }
}
