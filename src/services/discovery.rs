//! Date discovery: which dates the portal currently offers for booking.
//!
//! One representative court's picker defines the date index used by every task
//! of the run, so discovery keeps each label's button position.

use crate::config::ScrapeSettings;
use crate::courts::Court;
use crate::helpers::canonical_date_label;
use crate::services::browser::{Browser, Page, ScrapeError};
use crate::services::scraper::{open_date_picker, DATE_BUTTON_SELECTOR};

/// A bookable date and its position in the picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredDate {
    /// Zero-based button index in the date picker
    pub index: usize,
    /// Canonical label, e.g. "MONDAY JANUARY 5 2026"
    pub label: String,
}

/// Read the picker of `court` and return its dates in picker order.
///
/// Returns an empty list when the picker never renders or shows no date-like
/// buttons; the caller treats that as fatal for the run.
pub async fn discover_dates(
    browser: &dyn Browser,
    court: &Court,
    settings: &ScrapeSettings,
) -> Vec<DiscoveredDate> {
    let page = match browser.new_page().await {
        Ok(page) => page,
        Err(e) => {
            tracing::warn!("Could not open page to discover dates: {}", e);
            return Vec::new();
        }
    };

    let result = read_picker_dates(page.as_ref(), court, settings).await;

    if let Err(e) = page.close().await {
        tracing::warn!("Failed to close discovery page: {}", e);
    }

    match result {
        Ok(dates) => dates,
        Err(e) => {
            tracing::warn!("Could not discover dates from {}: {}", court.name, e);
            Vec::new()
        }
    }
}

async fn read_picker_dates(
    page: &dyn Page,
    court: &Court,
    settings: &ScrapeSettings,
) -> Result<Vec<DiscoveredDate>, ScrapeError> {
    open_date_picker(page, court, settings).await?;

    let buttons = page.texts(DATE_BUTTON_SELECTOR).await?;
    let dates = buttons
        .iter()
        .enumerate()
        .filter_map(|(index, text)| {
            let label = canonical_date_label(text);
            if label.is_none() {
                tracing::debug!("Skipping picker button {} ({:?})", index, text);
            }
            label.map(|label| DiscoveredDate { index, label })
        })
        .collect();
    Ok(dates)
}
