//! Slot scraper: one court, one date index, one page.
//!
//! Loads the court's detail page, activates the requested button in the date
//! picker and reads the time-slot rows out of the rendered body text. A row is
//! a line `"<H:MM AM/PM> - <H:MM AM/PM>"`; its remaining capacity is read from
//! the few lines that follow it.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::ScrapeSettings;
use crate::courts::{reservation_url, Court};
use crate::helpers::canonical_date_label;
use crate::models::{ScrapeResult, TimeSlot};
use crate::services::browser::{Browser, Page, ScrapeError};

/// Container the portal renders once the date picker is ready.
pub(crate) const DATE_PICKER_SELECTOR: &str = ".single-date-select-one-click";

/// One selectable date in the picker.
pub(crate) const DATE_BUTTON_SELECTOR: &str =
    ".single-date-select-one-click.single-date-select-button";

/// Lines after a time row searched for its capacity phrase.
const CAPACITY_LOOKAHEAD_LINES: usize = 4;

const FULL_MARKERS: [&str; 2] = ["No Spots Left", "Full"];

static RE_TIME_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d{1,2}:\d{2}\s*(?:AM|PM))\s*-\s*(\d{1,2}:\d{2}\s*(?:AM|PM))$").unwrap()
});

static RE_SPOTS_LEFT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*Spots?\s*Left").unwrap());

/// Extract every time-slot row from rendered page text.
pub fn parse_slots(text: &str) -> Vec<TimeSlot> {
    let lines: Vec<&str> = text.lines().collect();

    lines
        .iter()
        .enumerate()
        .filter_map(|(i, line)| {
            let caps = RE_TIME_RANGE.captures(line.trim())?;
            let end = (i + 1 + CAPACITY_LOOKAHEAD_LINES).min(lines.len());
            let following = lines[i + 1..end].join(" ");
            Some(TimeSlot::new(&caps[1], &caps[2], parse_capacity(&following)))
        })
        .collect()
}

/// Remaining spots from the text following a time row.
///
/// A full marker wins; otherwise `"<N> Spot(s) Left"`; anything else counts as
/// zero. Unknown wording is therefore reported as unavailable.
fn parse_capacity(following: &str) -> u32 {
    if FULL_MARKERS.iter().any(|m| following.contains(m)) {
        return 0;
    }
    RE_SPOTS_LEFT
        .captures(following)
        .and_then(|caps| caps[1].parse().ok())
        .unwrap_or(0)
}

/// Scrape one (court, date index) pair on a fresh page.
///
/// The page is closed before returning, on success and on failure.
pub async fn scrape_court_date(
    browser: &dyn Browser,
    court: &Court,
    date_index: usize,
    settings: &ScrapeSettings,
) -> Result<ScrapeResult, ScrapeError> {
    let page = browser.new_page().await?;
    let result = scrape_on_page(page.as_ref(), court, date_index, settings).await;

    if let Err(e) = page.close().await {
        tracing::warn!("Failed to close page for {}: {}", court.name, e);
    }

    result
}

async fn scrape_on_page(
    page: &dyn Page,
    court: &Court,
    date_index: usize,
    settings: &ScrapeSettings,
) -> Result<ScrapeResult, ScrapeError> {
    open_date_picker(page, court, settings).await?;

    let buttons = page.texts(DATE_BUTTON_SELECTOR).await?;
    let button_text = buttons.get(date_index).ok_or(ScrapeError::DateOutOfRange {
        index: date_index,
        available: buttons.len(),
    })?;
    let date = canonical_date_label(button_text)
        .ok_or_else(|| ScrapeError::UnrecognisedDate(button_text.clone()))?;

    page.click(DATE_BUTTON_SELECTOR, date_index).await?;

    // No element signals that the slot list has re-rendered for the new date.
    tokio::time::sleep(settings.slot_settle).await;

    let text = page.inner_text().await?;

    Ok(ScrapeResult {
        court_id: court.id.clone(),
        court_name: court.name.clone(),
        date: Some(date),
        slots: parse_slots(&text),
    })
}

/// Navigate to a court's detail page and wait for its date picker.
pub(crate) async fn open_date_picker(
    page: &dyn Page,
    court: &Court,
    settings: &ScrapeSettings,
) -> Result<(), ScrapeError> {
    page.goto(&reservation_url(&settings.base_url, &court.id)).await?;
    page.wait_for(DATE_PICKER_SELECTOR, settings.picker_timeout).await?;
    tokio::time::sleep(settings.picker_settle).await;
    Ok(())
}
