//! Browser seam.
//!
//! Scrape code talks to `Browser` / `Page` only. The production implementation
//! drives Chrome through a WebDriver endpoint with thirtyfour. WebDriver sends
//! every command to one window per session, so each `Page` is its own session;
//! the `WebDriverBrowser` keeps a handle to every open session and quits
//! leftovers when the run closes the browser.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use thirtyfour::prelude::*;
use thirtyfour::ChromeCapabilities;

use crate::config::{AppConfig, ScrapeSettings};

/// Errors raised while driving the browser.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("WebDriver error: {0}")]
    WebDriver(#[from] WebDriverError),

    #[error("Timed out waiting for '{0}'")]
    Timeout(String),

    #[error("Date index {index} out of range ({available} dates on page)")]
    DateOutOfRange { index: usize, available: usize },

    #[error("Unrecognised date button text: {0:?}")]
    UnrecognisedDate(String),

    #[error("Page error: {0}")]
    Page(String),

    #[error("Failed to launch browser: {0}")]
    Launch(String),

    #[error("No dates found on the page")]
    NoDates,

    #[error("Scrape run panicked: {0}")]
    Panicked(String),
}

/// Starts one browser per scrape run.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn Browser>, ScrapeError>;
}

/// A browser shared by every task of one run.
#[async_trait]
pub trait Browser: Send + Sync {
    async fn new_page(&self) -> Result<Box<dyn Page>, ScrapeError>;

    /// Release the browser and anything still open on it.
    async fn close(&self) -> Result<(), ScrapeError>;
}

/// One page session, owned by a single task.
#[async_trait]
pub trait Page: Send + Sync {
    async fn goto(&self, url: &str) -> Result<(), ScrapeError>;

    /// Wait until an element matching `selector` is displayed, up to `timeout`.
    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<(), ScrapeError>;

    /// Text of every element matching `selector`, in document order.
    async fn texts(&self, selector: &str) -> Result<Vec<String>, ScrapeError>;

    /// Click the `index`-th element matching `selector`.
    async fn click(&self, selector: &str, index: usize) -> Result<(), ScrapeError>;

    /// Rendered text of the whole document body.
    async fn inner_text(&self) -> Result<String, ScrapeError>;

    async fn close(self: Box<Self>) -> Result<(), ScrapeError>;
}

// ---------------------------------------------------------------------------
// WebDriver implementation
// ---------------------------------------------------------------------------

/// Launches Chrome sessions against a WebDriver endpoint.
#[derive(Debug, Clone)]
pub struct WebDriverLauncher {
    server_url: String,
    headless: bool,
    navigation_timeout: Duration,
    poll_interval: Duration,
}

impl WebDriverLauncher {
    pub fn new(server_url: &str, headless: bool, settings: &ScrapeSettings) -> Self {
        Self {
            server_url: server_url.to_string(),
            headless,
            navigation_timeout: settings.navigation_timeout,
            poll_interval: settings.poll_interval,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.webdriver_url, config.headless, &config.scrape)
    }

    fn capabilities(&self) -> WebDriverResult<ChromeCapabilities> {
        let mut caps = DesiredCapabilities::chrome();
        if self.headless {
            caps.add_arg("--headless")?;
        }
        caps.add_arg("--no-sandbox")?;
        caps.add_arg("--disable-setuid-sandbox")?;
        caps.add_arg("--disable-dev-shm-usage")?;
        Ok(caps)
    }
}

#[async_trait]
impl BrowserLauncher for WebDriverLauncher {
    async fn launch(&self) -> Result<Box<dyn Browser>, ScrapeError> {
        let caps = self
            .capabilities()
            .map_err(|e| ScrapeError::Launch(format!("invalid Chrome capabilities: {}", e)))?;

        // One throwaway session, so an unreachable endpoint fails the run here
        // instead of surfacing later as an empty date picker.
        let check = WebDriver::new(self.server_url.as_str(), caps.clone())
            .await
            .map_err(|e| {
                ScrapeError::Launch(format!("WebDriver at {} unavailable: {}", self.server_url, e))
            })?;
        if let Err(e) = check.quit().await {
            tracing::warn!("Failed to quit WebDriver startup session: {}", e);
        }

        tracing::debug!("Browser ready (WebDriver at {})", self.server_url);

        Ok(Box::new(WebDriverBrowser {
            server_url: self.server_url.clone(),
            caps,
            navigation_timeout: self.navigation_timeout,
            poll_interval: self.poll_interval,
            sessions: Arc::new(Mutex::new(HashMap::new())),
            next_session: AtomicU64::new(0),
        }))
    }
}

type SessionMap = Arc<Mutex<HashMap<u64, WebDriver>>>;

pub struct WebDriverBrowser {
    server_url: String,
    caps: ChromeCapabilities,
    navigation_timeout: Duration,
    poll_interval: Duration,
    sessions: SessionMap,
    next_session: AtomicU64,
}

#[async_trait]
impl Browser for WebDriverBrowser {
    async fn new_page(&self) -> Result<Box<dyn Page>, ScrapeError> {
        let driver = WebDriver::new(self.server_url.as_str(), self.caps.clone()).await?;
        let id = self.next_session.fetch_add(1, Ordering::Relaxed);
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, driver.clone());

        let page = WebDriverPage {
            id,
            driver,
            sessions: Arc::clone(&self.sessions),
            poll_interval: self.poll_interval,
        };

        // Already registered, so a failed timeout setup is reaped by `close`.
        page.driver
            .set_page_load_timeout(self.navigation_timeout)
            .await?;

        Ok(Box::new(page))
    }

    async fn close(&self) -> Result<(), ScrapeError> {
        let leftovers: Vec<WebDriver> = self
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .map(|(_, driver)| driver)
            .collect();

        if !leftovers.is_empty() {
            tracing::warn!("Closing browser with {} page(s) still open", leftovers.len());
        }

        let mut first_error = None;
        for driver in leftovers {
            if let Err(e) = driver.quit().await {
                tracing::warn!("Failed to quit WebDriver session: {}", e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}

pub struct WebDriverPage {
    id: u64,
    driver: WebDriver,
    sessions: SessionMap,
    poll_interval: Duration,
}

#[async_trait]
impl Page for WebDriverPage {
    async fn goto(&self, url: &str) -> Result<(), ScrapeError> {
        self.driver.goto(url).await?;
        Ok(())
    }

    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<(), ScrapeError> {
        let element = self
            .driver
            .query(By::Css(selector))
            .wait(timeout, self.poll_interval)
            .first()
            .await
            .map_err(|_| ScrapeError::Timeout(selector.to_string()))?;
        element
            .wait_until()
            .wait(timeout, self.poll_interval)
            .displayed()
            .await
            .map_err(|_| ScrapeError::Timeout(selector.to_string()))?;
        Ok(())
    }

    async fn texts(&self, selector: &str) -> Result<Vec<String>, ScrapeError> {
        let elements = self.driver.find_all(By::Css(selector)).await?;
        let mut texts = Vec::with_capacity(elements.len());
        for element in elements {
            texts.push(element.text().await?);
        }
        Ok(texts)
    }

    async fn click(&self, selector: &str, index: usize) -> Result<(), ScrapeError> {
        let elements = self.driver.find_all(By::Css(selector)).await?;
        let available = elements.len();
        let element = elements
            .into_iter()
            .nth(index)
            .ok_or(ScrapeError::DateOutOfRange { index, available })?;
        element.click().await?;
        Ok(())
    }

    async fn inner_text(&self) -> Result<String, ScrapeError> {
        let ret = self
            .driver
            .execute("return document.body.innerText;", Vec::new())
            .await?;
        ret.json()
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ScrapeError::Page("document body has no innerText".to_string()))
    }

    async fn close(self: Box<Self>) -> Result<(), ScrapeError> {
        let WebDriverPage {
            id,
            driver,
            sessions,
            ..
        } = *self;
        sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        driver.quit().await?;
        Ok(())
    }
}
