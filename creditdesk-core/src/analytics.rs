//! Dashboard analytics over an organization's jobs

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::job::{Job, JobStatus};

const TOP_TEMPLATES: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobAnalytics {
    /// One bucket per day, oldest first
    pub activity: Vec<DailyActivity>,
    pub status_counts: Vec<StatusCount>,
    /// Most used templates, most used first
    pub templates: Vec<TemplateCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyActivity {
    pub date: NaiveDate,
    pub jobs: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: JobStatus,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateCount {
    pub template: String,
    pub count: usize,
}

/// Summarizes the jobs submitted within the last `days` days (today included)
pub fn summarize(jobs: &[Job], now: DateTime<Utc>, days: u32) -> JobAnalytics {
    let days = days.max(1);
    let today = now.date_naive();
    let first_day = today - Duration::days(i64::from(days) - 1);

    let recent: Vec<&Job> = jobs
        .iter()
        .filter(|job| {
            let day = job.submitted_at.date_naive();
            day >= first_day && day <= today
        })
        .collect();

    let activity = (0..i64::from(days))
        .map(|offset| {
            let date = first_day + Duration::days(offset);
            let jobs = recent
                .iter()
                .filter(|job| job.submitted_at.date_naive() == date)
                .count();
            DailyActivity { date, jobs }
        })
        .collect();

    let status_counts = [
        JobStatus::Pending,
        JobStatus::Processing,
        JobStatus::Completed,
        JobStatus::Failed,
    ]
    .into_iter()
    .map(|status| StatusCount {
        status,
        count: recent.iter().filter(|job| job.status == status).count(),
    })
    .filter(|entry| entry.count > 0)
    .collect();

    let mut by_template: HashMap<String, usize> = HashMap::new();
    for job in &recent {
        *by_template.entry(template_key(&job.template)).or_default() += 1;
    }
    let mut templates: Vec<TemplateCount> = by_template
        .into_iter()
        .map(|(template, count)| TemplateCount { template, count })
        .collect();
    templates.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.template.cmp(&b.template)));
    templates.truncate(TOP_TEMPLATES);

    JobAnalytics {
        activity,
        status_counts,
        templates,
    }
}

/// Templates are grouped by their first two words
fn template_key(template: &str) -> String {
    template
        .split_whitespace()
        .take(2)
        .collect::<Vec<_>>()
        .join(" ")
}
