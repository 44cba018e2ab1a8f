pub mod aggregate;
pub mod availability;
pub mod browser;
pub mod discovery;
pub mod scheduler;
pub mod scraper;

#[cfg(test)]
pub(crate) mod fake_browser;
