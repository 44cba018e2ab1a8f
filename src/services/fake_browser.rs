//! In-memory portal for exercising the scrape pipeline without Chrome.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::config::ScrapeSettings;
use crate::services::browser::{Browser, BrowserLauncher, Page, ScrapeError};

/// Scrape settings with millisecond settle delays.
pub(crate) fn test_settings(concurrency: usize) -> ScrapeSettings {
    ScrapeSettings {
        base_url: "https://portal.test/Program/GetProgramDetails".to_string(),
        concurrency,
        navigation_timeout: Duration::from_millis(50),
        picker_timeout: Duration::from_millis(50),
        picker_settle: Duration::from_millis(1),
        slot_settle: Duration::from_millis(1),
        poll_interval: Duration::from_millis(1),
    }
}

/// Picker buttons and post-click page text per court.
#[derive(Debug, Default)]
pub(crate) struct FakePortal {
    pickers: HashMap<String, Vec<String>>,
    bodies: HashMap<(String, usize), String>,
    broken: HashSet<String>,
    panicking: HashSet<String>,
}

impl FakePortal {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn court(mut self, court_id: &str, buttons: &[&str]) -> Self {
        self.pickers.insert(
            court_id.to_string(),
            buttons.iter().map(|b| b.to_string()).collect(),
        );
        self
    }

    pub(crate) fn body(mut self, court_id: &str, index: usize, text: &str) -> Self {
        self.bodies
            .insert((court_id.to_string(), index), text.to_string());
        self
    }

    /// Navigation to this court fails.
    pub(crate) fn broken(mut self, court_id: &str) -> Self {
        self.broken.insert(court_id.to_string());
        self
    }

    /// Navigation to this court panics.
    pub(crate) fn panicking(mut self, court_id: &str) -> Self {
        self.panicking.insert(court_id.to_string());
        self
    }
}

#[derive(Debug, Default)]
pub(crate) struct PageStats {
    opened: AtomicUsize,
    closed: AtomicUsize,
    open_now: AtomicUsize,
    peak: AtomicUsize,
    launches: AtomicUsize,
    browser_closed: AtomicBool,
}

impl PageStats {
    pub(crate) fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub(crate) fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// Most pages open at the same time.
    pub(crate) fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub(crate) fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub(crate) fn browser_closed(&self) -> bool {
        self.browser_closed.load(Ordering::SeqCst)
    }
}

pub(crate) struct FakeLauncher {
    portal: Arc<FakePortal>,
    stats: Arc<PageStats>,
}

impl FakeLauncher {
    pub(crate) fn new(portal: FakePortal) -> Self {
        Self {
            portal: Arc::new(portal),
            stats: Arc::new(PageStats::default()),
        }
    }

    pub(crate) fn stats(&self) -> Arc<PageStats> {
        Arc::clone(&self.stats)
    }
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn launch(&self) -> Result<Box<dyn Browser>, ScrapeError> {
        self.stats.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeBrowser::with_stats(
            Arc::clone(&self.portal),
            Arc::clone(&self.stats),
        )))
    }
}

pub(crate) struct FakeBrowser {
    portal: Arc<FakePortal>,
    stats: Arc<PageStats>,
}

impl FakeBrowser {
    pub(crate) fn new(portal: FakePortal) -> Self {
        Self::with_stats(Arc::new(portal), Arc::new(PageStats::default()))
    }

    fn with_stats(portal: Arc<FakePortal>, stats: Arc<PageStats>) -> Self {
        Self { portal, stats }
    }

    pub(crate) fn stats(&self) -> Arc<PageStats> {
        Arc::clone(&self.stats)
    }
}

#[async_trait]
impl Browser for FakeBrowser {
    async fn new_page(&self) -> Result<Box<dyn Page>, ScrapeError> {
        self.stats.opened.fetch_add(1, Ordering::SeqCst);
        let now = self.stats.open_now.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.peak.fetch_max(now, Ordering::SeqCst);
        Ok(Box::new(FakePage {
            portal: Arc::clone(&self.portal),
            stats: Arc::clone(&self.stats),
            court: Mutex::new(None),
            clicked: Mutex::new(None),
        }))
    }

    async fn close(&self) -> Result<(), ScrapeError> {
        self.stats.browser_closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

struct FakePage {
    portal: Arc<FakePortal>,
    stats: Arc<PageStats>,
    court: Mutex<Option<String>>,
    clicked: Mutex<Option<usize>>,
}

impl FakePage {
    fn court(&self) -> Option<String> {
        self.court.lock().unwrap().clone()
    }

    fn buttons(&self) -> Vec<String> {
        self.court()
            .and_then(|id| self.portal.pickers.get(&id).cloned())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Page for FakePage {
    async fn goto(&self, url: &str) -> Result<(), ScrapeError> {
        // Let sibling tasks run, as a real navigation would.
        tokio::task::yield_now().await;

        let court_id = url.split("courseId=").nth(1).unwrap_or_default().to_string();
        if self.portal.panicking.contains(&court_id) {
            panic!("renderer crashed on {}", court_id);
        }
        if self.portal.broken.contains(&court_id) {
            return Err(ScrapeError::Page(format!("navigation timeout: {}", url)));
        }
        *self.court.lock().unwrap() = Some(court_id);
        Ok(())
    }

    async fn wait_for(&self, selector: &str, _timeout: Duration) -> Result<(), ScrapeError> {
        if self.buttons().is_empty() {
            return Err(ScrapeError::Timeout(selector.to_string()));
        }
        Ok(())
    }

    async fn texts(&self, _selector: &str) -> Result<Vec<String>, ScrapeError> {
        Ok(self.buttons())
    }

    async fn click(&self, _selector: &str, index: usize) -> Result<(), ScrapeError> {
        let available = self.buttons().len();
        if index >= available {
            return Err(ScrapeError::DateOutOfRange { index, available });
        }
        *self.clicked.lock().unwrap() = Some(index);
        Ok(())
    }

    async fn inner_text(&self) -> Result<String, ScrapeError> {
        let key = match (self.court(), *self.clicked.lock().unwrap()) {
            (Some(court), Some(index)) => (court, index),
            _ => return Ok(String::new()),
        };
        Ok(self.portal.bodies.get(&key).cloned().unwrap_or_default())
    }

    async fn close(self: Box<Self>) -> Result<(), ScrapeError> {
        self.stats.closed.fetch_add(1, Ordering::SeqCst);
        self.stats.open_now.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}
