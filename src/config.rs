use std::str::FromStr;
use std::time::Duration;

/// Default detail-page base of the reservation portal.
const DEFAULT_PORTAL_BASE_URL: &str = "https://membership.gocrimson.com/Program/GetProgramDetails";

/// Application configuration, parsed from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    /// WebDriver endpoint (chromedriver or a Selenium server).
    pub webdriver_url: String,
    /// Launch Chrome with `--headless`.
    pub headless: bool,
    pub scrape: ScrapeSettings,
}

/// Knobs for one scrape run. Passed by reference into discovery, scraper and scheduler.
#[derive(Debug, Clone)]
pub struct ScrapeSettings {
    /// Court detail page base; each court is `<base>?courseId=<id>`.
    pub base_url: String,
    /// Batch size, i.e. the maximum number of pages open at once.
    pub concurrency: usize,
    pub navigation_timeout: Duration,
    /// Bounded wait for the date picker to render.
    pub picker_timeout: Duration,
    /// Settle delay once the picker is visible.
    pub picker_settle: Duration,
    /// Settle delay after activating a date. The portal exposes no readiness
    /// signal for the slot list, so this is a fixed delay.
    pub slot_settle: Duration,
    pub poll_interval: Duration,
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_PORTAL_BASE_URL.to_string(),
            concurrency: 8,
            navigation_timeout: Duration::from_millis(30_000),
            picker_timeout: Duration::from_millis(10_000),
            picker_settle: Duration::from_millis(300),
            slot_settle: Duration::from_millis(1_000),
            poll_interval: Duration::from_millis(250),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = ScrapeSettings::default();
        Self {
            port: env_or("PORT", 8080),
            webdriver_url: std::env::var("WEBDRIVER_URL")
                .unwrap_or_else(|_| "http://localhost:9515".to_string()),
            headless: env_or("BROWSER_HEADLESS", true),
            scrape: ScrapeSettings {
                base_url: std::env::var("PORTAL_BASE_URL").unwrap_or(defaults.base_url),
                concurrency: env_or("SCRAPE_CONCURRENCY", defaults.concurrency).max(1),
                navigation_timeout: env_millis("NAVIGATION_TIMEOUT_MS", defaults.navigation_timeout),
                picker_timeout: env_millis("PICKER_TIMEOUT_MS", defaults.picker_timeout),
                picker_settle: env_millis("PICKER_SETTLE_MS", defaults.picker_settle),
                slot_settle: env_millis("SLOT_SETTLE_MS", defaults.slot_settle),
                poll_interval: env_millis("ELEMENT_POLL_MS", defaults.poll_interval),
            },
        }
    }
}

/// Read and parse an env var, falling back to `default` when unset.
/// Panics on a value that is set but malformed.
fn env_or<T: FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|_| panic!("{} has an invalid value: {:?}", name, raw)),
        Err(_) => default,
    }
}

fn env_millis(name: &str, default: Duration) -> Duration {
    Duration::from_millis(env_or(name, default.as_millis() as u64))
}
