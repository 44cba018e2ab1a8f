//! GET /availability?sport=<key>

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::config::ScrapeSettings;
use crate::courts::CourtRegistry;
use crate::errors::{AppError, ErrorResponse};
use crate::services::availability::{fetch_availability, AvailabilityResponse};
use crate::services::browser::BrowserLauncher;

/// Sport scraped when the request names none.
const DEFAULT_SPORT: &str = "tennis";

/// Shared application state.
#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) launcher: Arc<dyn BrowserLauncher>,
    pub(crate) registry: Arc<CourtRegistry>,
    pub(crate) settings: Arc<ScrapeSettings>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct AvailabilityQuery {
    /// Sport key, e.g. "tennis" or "squash" (default "tennis")
    pub sport: Option<String>,
}

/// Scrape the portal and return this week's availability for one sport.
///
/// Runs a full scrape on every call; expect tens of seconds per request.
#[utoipa::path(
    get,
    path = "/availability",
    tag = "Availability",
    params(AvailabilityQuery),
    responses(
        (status = 200, description = "Per-court availability and weekly matrix", body = AvailabilityResponse),
        (status = 400, description = "Unknown sport", body = ErrorResponse),
        (status = 502, description = "Portal unreachable or no dates offered", body = ErrorResponse),
        (status = 500, description = "Scrape run failed", body = ErrorResponse),
    )
)]
pub(crate) async fn get_availability(
    State(state): State<AppState>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let sport = query.sport.as_deref().unwrap_or(DEFAULT_SPORT);
    let response = fetch_availability(
        state.launcher.as_ref(),
        &state.registry,
        &state.settings,
        sport,
    )
    .await?;
    Ok(Json(response))
}
