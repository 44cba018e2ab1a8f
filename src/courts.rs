//! Court registry: which portal courses make up each sport.

use std::collections::BTreeMap;

/// A bookable court on the reservation portal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Court {
    /// Portal course id
    pub id: String,
    /// Display name (e.g. "Court 12")
    pub name: String,
}

impl Court {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SportConfig {
    pub display_name: String,
    pub courts: Vec<Court>,
}

/// Read-only sport → courts mapping, shared across requests.
#[derive(Debug, Clone, Default)]
pub struct CourtRegistry {
    sports: BTreeMap<String, SportConfig>,
}

impl CourtRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sport(mut self, key: &str, display_name: &str, courts: Vec<Court>) -> Self {
        self.sports.insert(
            key.to_string(),
            SportConfig {
                display_name: display_name.to_string(),
                courts,
            },
        );
        self
    }

    /// The courts currently offered on the portal.
    pub fn builtin() -> Self {
        Self::new()
            .with_sport(
                "tennis",
                "Tennis",
                vec![
                    Court::new("3b92dfe2-3eb0-4860-b07f-f058e0e18019", "Court 1"),
                    Court::new("58d5f7ab-8c69-41e7-bc50-a1ccbe58459a", "Court 2"),
                    Court::new("02868885-c471-42d4-a03d-9e3cbe889bed", "Court 3"),
                    Court::new("1b4679e7-5fa4-4b05-a16c-4dc892974716", "Court 4"),
                    Court::new("442d6bde-6c26-46cd-bec8-9e1d7047e7b9", "Court 5"),
                    Court::new("e11bd3c1-4e58-4b8d-98c7-9fbc1838216e", "Court 6 (1.5 Hours)"),
                ],
            )
            .with_sport(
                "squash",
                "Squash",
                vec![
                    Court::new("2e05bf1d-aa72-42c7-8f38-0619503add42", "Court 12"),
                    Court::new("79af72b2-fa7c-45a0-af13-ba38ddac2903", "Court 13"),
                    Court::new("ecfb57a5-0dcf-4f63-97ef-e9e2a017347f", "Court 14"),
                ],
            )
    }

    pub fn get(&self, sport: &str) -> Option<&SportConfig> {
        self.sports.get(sport)
    }

    /// All sports, ordered by key.
    pub fn sports(&self) -> impl Iterator<Item = (&str, &SportConfig)> {
        self.sports.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Detail page for one court: `<base>?courseId=<id>`.
pub fn reservation_url(base_url: &str, court_id: &str) -> String {
    format!("{}?courseId={}", base_url, court_id)
}
