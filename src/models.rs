//! Scrape and aggregation data model.
//!
//! Everything here is built fresh for one request and serialized with the
//! camelCase field names the viewer consumes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One bookable time range on one court on one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    /// Combined range label, e.g. "9:00 AM - 10:00 AM"
    pub time: String,
    pub start_time: String,
    pub end_time: String,
    /// Remaining capacity
    pub spots: u32,
    /// Always `spots > 0`
    pub available: bool,
}

impl TimeSlot {
    pub fn new(start_time: &str, end_time: &str, spots: u32) -> Self {
        Self {
            time: format!("{} - {}", start_time, end_time),
            start_time: start_time.to_string(),
            end_time: end_time.to_string(),
            spots,
            available: spots > 0,
        }
    }
}

/// Raw output of one (court, date index) task. `date: None` marks a failed or
/// out-of-range scrape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeResult {
    pub court_id: String,
    pub court_name: String,
    pub date: Option<String>,
    pub slots: Vec<TimeSlot>,
}

/// Slots per date label for one court.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourtAvailability {
    pub court_id: String,
    pub court_name: String,
    /// Date label → slots scraped for that date
    pub availability: BTreeMap<String, Vec<TimeSlot>>,
}

/// One cell of the weekly matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SlotSummary {
    /// Sum of remaining spots over all courts offering this slot
    pub spots: u32,
    /// Number of courts offering this slot
    pub courts_available: u32,
    pub available: bool,
}

/// Cross-court summary keyed by time label, then date label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyView {
    /// Date labels in chronological order
    pub dates: Vec<String>,
    /// Time labels ordered by time of day
    pub times: Vec<String>,
    /// `matrix[time][date]`, present only where at least one court has the slot
    pub matrix: BTreeMap<String, BTreeMap<String, SlotSummary>>,
}
