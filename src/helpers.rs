//! Label parsing shared by the scraper and the aggregator.
//!
//! The portal renders dates as `"Monday, January 5, 2026"` on picker buttons and
//! times as 12-hour clock strings (`"9:00 AM"`). Everything downstream keys on
//! the canonical date label `"MONDAY JANUARY 5 2026"` and the raw time range
//! label `"9:00 AM - 10:00 AM"`.

use std::sync::LazyLock;

use chrono::Month;
use regex::Regex;

/// Year used when a date label carries no parsable year.
///
/// Sorting across a year boundary breaks for labels that hit this fallback.
pub(crate) const FALLBACK_YEAR: i32 = 2026;

static RE_DATE_BUTTON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(Monday|Tuesday|Wednesday|Thursday|Friday|Saturday|Sunday),\s*(January|February|March|April|May|June|July|August|September|October|November|December)\s*(\d{1,2}),\s*(\d{4})",
    )
    .unwrap()
});

static RE_CLOCK_TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d{1,2}):(\d{2})\s*(AM|PM)").unwrap());

/// Extract the canonical uppercase date label from picker button text.
///
/// `"Monday, January 5, 2026"` → `"MONDAY JANUARY 5 2026"`.
pub(crate) fn canonical_date_label(button_text: &str) -> Option<String> {
    let caps = RE_DATE_BUTTON.captures(button_text)?;
    Some(format!(
        "{} {} {} {}",
        caps[1].to_uppercase(),
        caps[2].to_uppercase(),
        &caps[3],
        &caps[4]
    ))
}

/// Chronological sort key `(year, month, day)` for a date label.
///
/// Month names are matched case-insensitively. Unparsable components fall back
/// to January, day 1 and [`FALLBACK_YEAR`] instead of failing.
pub(crate) fn date_sort_key(label: &str) -> (i32, u32, u32) {
    let parts: Vec<&str> = label.split_whitespace().collect();
    let month = parts
        .get(1)
        .and_then(|m| m.parse::<Month>().ok())
        .map(|m| m.number_from_month())
        .unwrap_or(1);
    let day = parts
        .get(2)
        .and_then(|d| d.parse::<u32>().ok())
        .filter(|d| *d > 0)
        .unwrap_or(1);
    let year = parts
        .get(3)
        .and_then(|y| y.parse::<i32>().ok())
        .unwrap_or(FALLBACK_YEAR);
    (year, month, day)
}

/// Minutes since midnight of the first clock time in `label`.
///
/// 12 AM maps to 0, 12 PM to noon. Labels without a clock time sort first (0).
pub(crate) fn time_label_minutes(label: &str) -> u32 {
    let Some(caps) = RE_CLOCK_TIME.captures(label) else {
        return 0;
    };
    let hours: u32 = caps[1].parse().unwrap_or(0);
    let minutes: u32 = caps[2].parse().unwrap_or(0);
    let pm = caps[3].eq_ignore_ascii_case("PM");

    let hours = match (hours, pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, true) => h + 12,
        (h, false) => h,
    };
    hours * 60 + minutes
}

/// Compact form for log lines: `"MONDAY JANUARY 5 2026"` → `"Mon Jan 5"`.
pub(crate) fn short_date(label: &str) -> String {
    let abbreviate = |word: &str| -> String {
        let mut chars = word.chars();
        match chars.next() {
            Some(first) => first
                .to_uppercase()
                .chain(chars.take(2).flat_map(|c| c.to_lowercase()))
                .collect(),
            None => String::new(),
        }
    };
    let parts: Vec<&str> = label.split_whitespace().collect();
    match parts.as_slice() {
        [weekday, month, day, ..] => {
            format!("{} {} {}", abbreviate(weekday), abbreviate(month), day)
        }
        _ => label.to_string(),
    }
}
