//! Task scheduler: courts × dates, scraped in fixed-size batches.
//!
//! Each batch runs its tasks concurrently on the shared browser and completes
//! fully before the next batch starts, so at most `concurrency` pages are open
//! at any time. A failed task never affects its siblings: it is recorded as
//! `TaskOutcome::Failed` and collapses to a null-date `ScrapeResult`.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};

use futures::future::join_all;
use futures::FutureExt;

use crate::config::ScrapeSettings;
use crate::courts::Court;
use crate::helpers::short_date;
use crate::models::ScrapeResult;
use crate::services::browser::{Browser, ScrapeError};
use crate::services::discovery::DiscoveredDate;
use crate::services::scraper::scrape_court_date;

/// One (court, date index) unit of work.
#[derive(Debug, Clone)]
pub struct ScrapeTask {
    pub court: Court,
    pub date: DiscoveredDate,
}

/// Result-or-failure of one task.
#[derive(Debug)]
pub enum TaskOutcome {
    Scraped(ScrapeResult),
    Failed {
        court: Court,
        date_index: usize,
        error: ScrapeError,
    },
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Scraped(result) if result.date.is_some())
    }

    /// Collapse to the shape the aggregator consumes.
    pub fn into_result(self) -> ScrapeResult {
        match self {
            TaskOutcome::Scraped(result) => result,
            TaskOutcome::Failed { court, .. } => ScrapeResult {
                court_id: court.id,
                court_name: court.name,
                date: None,
                slots: Vec::new(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    pub total_tasks: usize,
    pub successful: usize,
    pub elapsed: Duration,
}

#[derive(Debug)]
pub struct ScheduledRun {
    /// One result per task, in task order
    pub results: Vec<ScrapeResult>,
    pub stats: RunStats,
}

/// Cartesian product of courts and dates, court-major.
pub fn build_tasks(courts: &[Court], dates: &[DiscoveredDate]) -> Vec<ScrapeTask> {
    courts
        .iter()
        .flat_map(|court| {
            dates.iter().map(move |date| ScrapeTask {
                court: court.clone(),
                date: date.clone(),
            })
        })
        .collect()
}

/// Run every task in batches of `settings.concurrency`.
pub async fn run_tasks(
    browser: &dyn Browser,
    tasks: &[ScrapeTask],
    settings: &ScrapeSettings,
) -> ScheduledRun {
    let started = Instant::now();
    let batch_size = settings.concurrency.max(1);
    let total_batches = tasks.len().div_ceil(batch_size);

    let mut outcomes = Vec::with_capacity(tasks.len());
    for (batch_no, batch) in tasks.chunks(batch_size).enumerate() {
        tracing::info!("── Batch {}/{} ──", batch_no + 1, total_batches);
        let batch_outcomes =
            join_all(batch.iter().map(|task| run_task(browser, task, settings))).await;

        for outcome in &batch_outcomes {
            if let TaskOutcome::Failed {
                court,
                date_index,
                error,
            } = outcome
            {
                tracing::warn!(
                    "✗ {:<20} | Date {} | Error: {}",
                    court.name,
                    date_index + 1,
                    error
                );
            }
        }
        outcomes.extend(batch_outcomes);
    }

    let successful = outcomes.iter().filter(|o| o.is_success()).count();
    let results = outcomes.into_iter().map(TaskOutcome::into_result).collect();

    ScheduledRun {
        results,
        stats: RunStats {
            total_tasks: tasks.len(),
            successful,
            elapsed: started.elapsed(),
        },
    }
}

/// A panic inside the page sequence is contained here and becomes a failed
/// outcome like any other task error.
async fn run_task(browser: &dyn Browser, task: &ScrapeTask, settings: &ScrapeSettings) -> TaskOutcome {
    let scraped = AssertUnwindSafe(scrape_court_date(
        browser,
        &task.court,
        task.date.index,
        settings,
    ))
    .catch_unwind()
    .await
    .unwrap_or_else(|payload| Err(ScrapeError::Panicked(panic_message(payload.as_ref()))));

    match scraped {
        Ok(result) => {
            tracing::info!(
                "✓ {:<20} | {:<12} | {} slots",
                task.court.name,
                result.date.as_deref().map(short_date).unwrap_or_default(),
                result.slots.len()
            );
            TaskOutcome::Scraped(result)
        }
        Err(error) => TaskOutcome::Failed {
            court: task.court.clone(),
            date_index: task.date.index,
            error,
        },
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
