//! One availability run: discover dates, scrape every (court, date) pair,
//! aggregate, and always release the browser.

use std::panic::AssertUnwindSafe;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::Serialize;
use utoipa::ToSchema;

use crate::config::ScrapeSettings;
use crate::courts::{Court, CourtRegistry};
use crate::errors::AppError;
use crate::helpers::short_date;
use crate::models::{CourtAvailability, WeeklyView};
use crate::services::aggregate::{aggregate_results, aggregate_to_weekly_view};
use crate::services::browser::{Browser, BrowserLauncher, ScrapeError};
use crate::services::discovery::discover_dates;
use crate::services::scheduler::{build_tasks, panic_message, run_tasks, RunStats};

const BANNER: &str = "════════════════════════════════════════════════════════════════";
const RULE: &str = "────────────────────────────────────────────────────────────────";

/// Run statistics reported alongside the matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityStats {
    pub total_tasks: usize,
    /// Tasks that produced a dated result
    pub successful: usize,
    pub dates: usize,
    pub time_slots: usize,
}

/// Response body of `GET /availability`.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityResponse {
    pub sport: String,
    pub courts: Vec<CourtAvailability>,
    pub weekly_view: WeeklyView,
    /// When the run finished
    pub timestamp: DateTime<Utc>,
    /// Wall-clock run time, e.g. "42.7s"
    pub scrape_duration: String,
    pub stats: AvailabilityStats,
}

struct RunOutput {
    courts: Vec<CourtAvailability>,
    weekly_view: WeeklyView,
    stats: RunStats,
}

/// Scrape the current weekly availability of every court of `sport`.
///
/// Unknown sports are rejected before a browser is launched. Once launched, the
/// browser is closed on every path out of the run, including a panic inside it.
pub async fn fetch_availability(
    launcher: &dyn BrowserLauncher,
    registry: &CourtRegistry,
    settings: &ScrapeSettings,
    sport: &str,
) -> Result<AvailabilityResponse, AppError> {
    let config = registry
        .get(sport)
        .ok_or_else(|| AppError::BadRequest(format!("Unknown sport: {}", sport)))?;

    let started = Instant::now();
    tracing::info!("{}", BANNER);
    tracing::info!("Starting {} court availability scrape", sport.to_uppercase());
    tracing::info!("{}", BANNER);

    let browser = launcher.launch().await?;

    let outcome = AssertUnwindSafe(run_scrape(browser.as_ref(), &config.courts, settings))
        .catch_unwind()
        .await;

    if let Err(e) = browser.close().await {
        tracing::warn!("Failed to close browser: {}", e);
    }

    let run = match outcome {
        Ok(Ok(run)) => run,
        Ok(Err(e)) => {
            tracing::error!("{} scrape failed: {}", sport, e);
            return Err(e.into());
        }
        Err(payload) => {
            let e = ScrapeError::Panicked(panic_message(payload.as_ref()));
            tracing::error!("{} scrape failed: {}", sport, e);
            return Err(e.into());
        }
    };

    let elapsed = started.elapsed().as_secs_f64();
    let stats = AvailabilityStats {
        total_tasks: run.stats.total_tasks,
        successful: run.stats.successful,
        dates: run.weekly_view.dates.len(),
        time_slots: run.weekly_view.times.len(),
    };

    tracing::info!("Scrape complete!");
    tracing::info!("  Total time:  {:.1}s", elapsed);
    tracing::info!("  Successful:  {}/{} tasks", stats.successful, stats.total_tasks);
    tracing::info!("  Dates found: {}", stats.dates);
    tracing::info!("  Time slots:  {}", stats.time_slots);
    tracing::info!("{}", BANNER);

    Ok(AvailabilityResponse {
        sport: sport.to_string(),
        courts: run.courts,
        weekly_view: run.weekly_view,
        timestamp: Utc::now(),
        scrape_duration: format!("{:.1}s", elapsed),
        stats,
    })
}

async fn run_scrape(
    browser: &dyn Browser,
    courts: &[Court],
    settings: &ScrapeSettings,
) -> Result<RunOutput, ScrapeError> {
    let representative = courts.first().ok_or(ScrapeError::NoDates)?;

    tracing::info!("Discovering available dates...");
    let dates = discover_dates(browser, representative, settings).await;
    tracing::info!("Found {} dates:", dates.len());
    for (i, date) in dates.iter().enumerate() {
        tracing::info!("  {}. {}", i + 1, short_date(&date.label));
    }

    if dates.is_empty() {
        return Err(ScrapeError::NoDates);
    }

    let tasks = build_tasks(courts, &dates);
    tracing::info!(
        "Created {} scrape tasks ({} courts × {} dates)",
        tasks.len(),
        courts.len(),
        dates.len()
    );
    tracing::info!("{}", RULE);

    let run = run_tasks(browser, &tasks, settings).await;
    tracing::info!("{}", RULE);
    tracing::debug!(
        "Scraped {} tasks in {:.1}s",
        run.stats.total_tasks,
        run.stats.elapsed.as_secs_f64()
    );

    let courts = aggregate_results(&run.results);
    let weekly_view = aggregate_to_weekly_view(&courts);

    Ok(RunOutput {
        courts,
        weekly_view,
        stats: run.stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tokio_test::{assert_err, assert_ok};

    use crate::services::fake_browser::{test_settings, FakeLauncher, FakePortal};

    const WEEK: [&str; 5] = [
        "Monday, January 5, 2026",
        "Tuesday, January 6, 2026",
        "Wednesday, January 7, 2026",
        "Thursday, January 8, 2026",
        "Friday, January 9, 2026",
    ];

    fn squash_registry() -> CourtRegistry {
        CourtRegistry::new().with_sport(
            "squash",
            "Squash",
            vec![
                Court::new("s12", "Court 12"),
                Court::new("s13", "Court 13"),
                Court::new("s14", "Court 14"),
            ],
        )
    }

    fn squash_portal() -> FakePortal {
        FakePortal::new()
            .court("s12", &WEEK)
            .court("s13", &WEEK)
            .court("s14", &WEEK)
            .body("s12", 0, "7:00 AM - 8:00 AM\n2 Spots Left")
            .body("s13", 0, "7:00 AM - 8:00 AM\n1 Spot Left\n\n\n\n8:00 AM - 9:00 AM\nFull")
            .body("s14", 4, "6:00 PM - 7:00 PM\n3 Spots Left")
    }

    #[tokio::test]
    async fn test_fetch_availability_squash_end_to_end() {
        let launcher = FakeLauncher::new(squash_portal());
        let stats = launcher.stats();

        let response = assert_ok!(
            fetch_availability(&launcher, &squash_registry(), &test_settings(4), "squash").await
        );

        assert_eq!(response.sport, "squash");
        assert_eq!(response.stats.total_tasks, 15);
        assert_eq!(response.stats.successful, 15);
        assert_eq!(response.stats.dates, 5);
        assert_eq!(response.stats.time_slots, 3);
        assert_eq!(response.courts.len(), 3);
        assert_eq!(response.weekly_view.dates[0], "MONDAY JANUARY 5 2026");

        let seven = &response.weekly_view.matrix["7:00 AM - 8:00 AM"]["MONDAY JANUARY 5 2026"];
        assert_eq!(seven.spots, 3);
        assert_eq!(seven.courts_available, 2);

        assert!(response.scrape_duration.ends_with('s'));

        assert_eq!(stats.launches(), 1);
        assert!(stats.peak() <= 4);
        // 1 discovery page + 15 task pages
        assert_eq!(stats.opened(), 16);
        assert_eq!(stats.closed(), 16);
        assert!(stats.browser_closed());
    }

    #[tokio::test]
    async fn test_fetch_availability_serializes_response_shape() {
        let launcher = FakeLauncher::new(squash_portal());
        let response = assert_ok!(
            fetch_availability(&launcher, &squash_registry(), &test_settings(8), "squash").await
        );

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["stats"]["totalTasks"], 15);
        assert_eq!(json["stats"]["timeSlots"], 3);
        assert!(json["weeklyView"]["matrix"].is_object());
        assert!(json["scrapeDuration"].is_string());
        assert!(json["timestamp"].as_str().unwrap().ends_with('Z'));
        assert_eq!(json["courts"][0]["courtId"], "s12");
    }

    #[tokio::test]
    async fn test_fetch_availability_partial_failure_still_succeeds() {
        let portal = FakePortal::new()
            .court("s12", &WEEK)
            .broken("s13")
            .court("s14", &WEEK[..2]);
        let launcher = FakeLauncher::new(portal);

        let response = assert_ok!(
            fetch_availability(&launcher, &squash_registry(), &test_settings(8), "squash").await
        );

        assert_eq!(response.stats.total_tasks, 15);
        // s12: 5, s13: 0, s14: 2
        assert_eq!(response.stats.successful, 7);
        let ids: Vec<&str> = response.courts.iter().map(|c| c.court_id.as_str()).collect();
        assert_eq!(ids, vec!["s12", "s14"]);
    }

    #[tokio::test]
    async fn test_fetch_availability_unknown_sport_never_launches() {
        let launcher = FakeLauncher::new(squash_portal());

        let err = assert_err!(
            fetch_availability(&launcher, &squash_registry(), &test_settings(8), "golf").await
        );

        assert!(matches!(err, AppError::BadRequest(ref msg) if msg == "Unknown sport: golf"));
        assert_eq!(launcher.stats().launches(), 0);
    }

    #[tokio::test]
    async fn test_fetch_availability_no_dates_releases_browser() {
        let launcher = FakeLauncher::new(FakePortal::new());

        let err = assert_err!(
            fetch_availability(&launcher, &squash_registry(), &test_settings(8), "squash").await
        );

        assert!(matches!(err, AppError::ExternalServiceError(_)));
        let stats = launcher.stats();
        assert!(stats.browser_closed());
        assert_eq!(stats.opened(), 1);
        assert_eq!(stats.closed(), 1);
    }

    #[tokio::test]
    async fn test_fetch_availability_panicking_court_is_partial_success() {
        let portal = FakePortal::new()
            .court("s12", &WEEK)
            .panicking("s13")
            .court("s14", &WEEK)
            .body("s14", 4, "6:00 PM - 7:00 PM\n3 Spots Left");
        let launcher = FakeLauncher::new(portal);

        let response = assert_ok!(
            fetch_availability(&launcher, &squash_registry(), &test_settings(8), "squash").await
        );

        assert_eq!(response.stats.total_tasks, 15);
        assert_eq!(response.stats.successful, 10);
        let ids: Vec<&str> = response.courts.iter().map(|c| c.court_id.as_str()).collect();
        assert_eq!(ids, vec!["s12", "s14"]);
        assert_eq!(
            response.weekly_view.matrix["6:00 PM - 7:00 PM"]["FRIDAY JANUARY 9 2026"].spots,
            3
        );
        assert!(launcher.stats().browser_closed());
    }

    #[tokio::test]
    async fn test_fetch_availability_panic_outside_tasks_releases_browser() {
        // s12 is the court dates are discovered from
        let portal = FakePortal::new()
            .panicking("s12")
            .court("s13", &WEEK)
            .court("s14", &WEEK);
        let launcher = FakeLauncher::new(portal);

        let err = assert_err!(
            fetch_availability(&launcher, &squash_registry(), &test_settings(8), "squash").await
        );

        match err {
            AppError::InternalError(msg) => assert!(msg.contains("renderer crashed on s12")),
            other => panic!("expected InternalError, got {:?}", other),
        }
        assert!(launcher.stats().browser_closed());
    }

    struct UnreachableLauncher;

    #[async_trait]
    impl BrowserLauncher for UnreachableLauncher {
        async fn launch(&self) -> Result<Box<dyn Browser>, ScrapeError> {
            Err(ScrapeError::Launch("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn test_fetch_availability_launch_failure_is_bad_gateway() {
        let err = assert_err!(
            fetch_availability(&UnreachableLauncher, &squash_registry(), &test_settings(8), "squash")
                .await
        );
        assert!(matches!(err, AppError::ExternalServiceError(_)));
    }
}
