//! Aggregation of raw scrape results into per-court availability and the
//! cross-court weekly matrix. Pure and synchronous.

use std::collections::{BTreeMap, BTreeSet};

use crate::helpers::{date_sort_key, time_label_minutes};
use crate::models::{CourtAvailability, ScrapeResult, SlotSummary, TimeSlot, WeeklyView};

/// Group raw results by court, dropping failed (null-date) results.
///
/// Courts appear in order of first successful result. A repeated
/// (court, date) pair keeps the later result.
pub fn aggregate_results(results: &[ScrapeResult]) -> Vec<CourtAvailability> {
    let mut courts: Vec<CourtAvailability> = Vec::new();

    for result in results {
        let Some(date) = &result.date else {
            continue;
        };

        let position = match courts.iter().position(|c| c.court_id == result.court_id) {
            Some(position) => position,
            None => {
                courts.push(CourtAvailability {
                    court_id: result.court_id.clone(),
                    court_name: result.court_name.clone(),
                    availability: BTreeMap::new(),
                });
                courts.len() - 1
            }
        };

        courts[position]
            .availability
            .insert(date.clone(), result.slots.clone());
    }

    courts
}

/// Build the weekly matrix over every date and time label seen.
pub fn aggregate_to_weekly_view(courts: &[CourtAvailability]) -> WeeklyView {
    let mut dates = BTreeSet::new();
    let mut times = BTreeSet::new();
    for court in courts {
        for (date, slots) in &court.availability {
            dates.insert(date.clone());
            times.extend(slots.iter().map(|slot| slot.time.clone()));
        }
    }

    let mut dates: Vec<String> = dates.into_iter().collect();
    dates.sort_by_cached_key(|label| (date_sort_key(label), label.clone()));

    let mut times: Vec<String> = times.into_iter().collect();
    times.sort_by_cached_key(|label| (time_label_minutes(label), label.clone()));

    let mut matrix = BTreeMap::new();
    for time in &times {
        let row: BTreeMap<String, SlotSummary> = dates
            .iter()
            .filter_map(|date| summarize(courts, date, time).map(|cell| (date.clone(), cell)))
            .collect();
        matrix.insert(time.clone(), row);
    }

    WeeklyView {
        dates,
        times,
        matrix,
    }
}

/// Sum one (date, time) cell across courts; `None` when no court has the slot.
fn summarize(courts: &[CourtAvailability], date: &str, time: &str) -> Option<SlotSummary> {
    let matching: Vec<&TimeSlot> = courts
        .iter()
        .filter_map(|court| court.availability.get(date))
        .filter_map(|slots| slots.iter().find(|slot| slot.time == time))
        .collect();

    if matching.is_empty() {
        return None;
    }

    let spots = matching
        .iter()
        .fold(0u32, |total, slot| total.saturating_add(slot.spots));
    Some(SlotSummary {
        spots,
        courts_available: matching.len() as u32,
        available: spots > 0,
    })
}
