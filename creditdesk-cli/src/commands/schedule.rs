//! Schedule command handlers

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use clap::Subcommand;
use colored::*;
use creditdesk_core::domain::schedule::{Recurrence, Schedule};
use creditdesk_core::dto::schedule::CreateSchedule;

use crate::api::ApiClient;
use crate::config::Config;

#[derive(Subcommand)]
pub enum ScheduleCommands {
    /// Schedule a recurring report
    Create {
        #[arg(long)]
        name: String,

        #[arg(long)]
        template: String,

        #[arg(long)]
        instructions: Option<String>,

        /// Data source identifier (repeatable)
        #[arg(long = "source")]
        sources: Vec<String>,

        /// one_time, daily, weekly, monthly or custom
        #[arg(long, default_value = "weekly")]
        recurrence: String,

        /// First run, RFC 3339 (e.g. 2030-01-01T08:00:00Z)
        #[arg(long)]
        next_run_at: String,

        #[arg(long, default_value = "UTC")]
        timezone: String,

        /// Output format (repeatable)
        #[arg(long = "format")]
        formats: Vec<String>,

        /// Recipient e-mail (repeatable)
        #[arg(long = "recipient")]
        recipients: Vec<String>,
    },
    /// List the organization's schedules
    List,
}

pub async fn handle_schedule_command(command: ScheduleCommands, config: &Config) -> Result<()> {
    let client = ApiClient::new(&config.server_url, config.token.clone());

    match command {
        ScheduleCommands::Create {
            name,
            template,
            instructions,
            sources,
            recurrence,
            next_run_at,
            timezone,
            formats,
            recipients,
        } => {
            let req = CreateSchedule {
                name,
                template,
                instructions,
                data_sources: sources,
                recurrence: parse_recurrence(&recurrence)?,
                next_run_at: parse_time(&next_run_at)?,
                timezone,
                output_formats: formats,
                recipients,
            };

            let schedule = client.create_schedule(&req).await?;
            println!("{}", "✓ Schedule created".green().bold());
            print_schedule(&schedule);
            Ok(())
        }
        ScheduleCommands::List => {
            let schedules = client.list_schedules().await?;
            if schedules.is_empty() {
                println!("{}", "No schedules found.".yellow());
            } else {
                println!("{}", format!("Found {} schedule(s):", schedules.len()).bold());
                println!();
                for schedule in &schedules {
                    print_schedule(schedule);
                }
            }
            Ok(())
        }
    }
}

fn parse_recurrence(input: &str) -> Result<Recurrence> {
    Recurrence::parse(&input.trim().to_lowercase().replace('-', "_")).ok_or_else(|| {
        anyhow!(
            "Unknown recurrence '{}' (expected one_time, daily, weekly, monthly or custom)",
            input
        )
    })
}

fn parse_time(input: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(input)
        .map(|t| t.with_timezone(&Utc))
        .with_context(|| format!("Invalid timestamp '{}'", input))
}

fn print_schedule(schedule: &Schedule) {
    let active = if schedule.is_active {
        "active".green()
    } else {
        "paused".dimmed()
    };
    println!("  {} {} {}", "▸".cyan(), schedule.name.bold(), schedule.id.to_string().dimmed());
    println!("    Template:   {}", schedule.template);
    println!("    Recurrence: {} ({})", schedule.recurrence.as_str(), active);
    println!(
        "    Next run:   {} {}",
        schedule.next_run_at.format("%Y-%m-%d %H:%M"),
        schedule.timezone.dimmed()
    );
    if !schedule.recipients.is_empty() {
        println!("    Recipients: {}", schedule.recipients.join(", "));
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_recurrence() {
        assert_eq!(parse_recurrence("one-time").unwrap(), Recurrence::OneTime);
        assert_eq!(parse_recurrence("Weekly").unwrap(), Recurrence::Weekly);
        assert!(parse_recurrence("hourly").is_err());
    }

    #[test]
    fn test_parse_time() {
        let t = parse_time("2030-01-01T09:00:00+01:00").unwrap();
        assert_eq!(t.to_rfc3339(), "2030-01-01T08:00:00+00:00");
        assert!(parse_time("tomorrow").is_err());
    }
}
