use serde::{Deserialize, Serialize};
use std::time::Duration;

const TRENDING_URL: &str = "https://trends.google.com/trending";
const EXPLORE_URL: &str = "https://trends.google.com/trends/explore";

/// Which trending page to scrape
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TrendsQuery {
    /// Geography code, e.g. `KR`
    pub geo: String,
    /// Trending category id
    pub category: String,
    /// UI language
    pub hl: String,
}

impl Default for TrendsQuery {
    fn default() -> Self {
        Self {
            geo: "KR".to_string(),
            category: "17".to_string(),
            hl: "en".to_string(),
        }
    }
}

impl TrendsQuery {
    /// URL of the first trending page. Later pages are reached through the in-page control.
    pub fn trending_url(&self) -> String {
        format!(
            "{}?geo={}&category={}&hl={}",
            TRENDING_URL,
            urlencoding::encode(&self.geo),
            urlencoding::encode(&self.category),
            urlencoding::encode(&self.hl),
        )
    }

    /// Explore link for a trend title over the last day. Always synthesized, never scraped.
    pub fn explore_url(&self, title: &str) -> String {
        format!(
            "{}?q={}&date=now%201-d&geo={}&hl={}",
            EXPLORE_URL,
            urlencoding::encode(title),
            self.geo,
            self.hl,
        )
    }
}

/// Selectors for the table layout. Field positions are `td` indices.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TableSelectors {
    pub row: String,
    pub cell: String,
    pub min_cells: usize,
    pub title_cell: usize,
    pub volume_cell: usize,
    pub time_cell: usize,
    pub breakdown_cell: usize,
}

impl Default for TableSelectors {
    fn default() -> Self {
        Self {
            row: "table tbody tr".to_string(),
            cell: "td".to_string(),
            min_cells: 5,
            title_cell: 1,
            volume_cell: 2,
            time_cell: 3,
            breakdown_cell: 4,
        }
    }
}

/// Selectors for the card grid layout, relative to each card.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CardSelectors {
    pub card: String,
    pub title: String,
    pub volume: String,
    pub time: String,
    pub breakdown: String,
}

impl Default for CardSelectors {
    fn default() -> Self {
        Self {
            card: "div.trend-card".to_string(),
            title: ".trend-title".to_string(),
            volume: ".search-count".to_string(),
            time: ".trend-time".to_string(),
            breakdown: ".trend-breakdown".to_string(),
        }
    }
}

/// Everything the scraper needs to find on the trending page
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Selectors {
    pub table: TableSelectors,
    pub card: CardSelectors,
    /// Toggle inside the time cell that flips relative/absolute dates
    pub toggle: String,
    /// Breakdown chips inside the breakdown cell or element
    pub breakdown_item: String,
    /// Lines leaking from icon ligatures into the time cell text
    pub marker_lines: Vec<String>,
    pub cookie_labels: Vec<String>,
    pub next_css: String,
    pub next_labels: Vec<String>,
    pub buttons: String,
    /// Related-topic entries on an explore page
    pub related_item: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            table: TableSelectors::default(),
            card: CardSelectors::default(),
            toggle: "div.vdw3Ld".to_string(),
            breakdown_item: "span.mUIrbf-vQzf8d, span.Gwdjic".to_string(),
            marker_lines: vec!["trending_up".to_string(), "timelapse".to_string()],
            cookie_labels: vec![
                "Accept all".to_string(),
                "I agree".to_string(),
                "AGREE".to_string(),
            ],
            next_css: "button[aria-label='Go to next page']".to_string(),
            next_labels: vec!["Go to next page".to_string(), "Next page".to_string()],
            buttons: "button, [role='button']".to_string(),
            related_item: "div.feed-item".to_string(),
        }
    }
}

/// Waits and pauses, in milliseconds so they read well from JSON config
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Timing {
    pub initial_wait_ms: u64,
    pub layout_wait_ms: u64,
    pub cookie_settle_ms: u64,
    pub toggle_timeout_ms: u64,
    pub restore_pause_ms: u64,
    pub page_settle_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub related_wait_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            initial_wait_ms: 20_000,
            layout_wait_ms: 5_000,
            cookie_settle_ms: 800,
            toggle_timeout_ms: 300,
            restore_pause_ms: 100,
            page_settle_timeout_ms: 5_000,
            poll_interval_ms: 50,
            related_wait_ms: 5_000,
        }
    }
}

impl Timing {
    pub fn initial_wait(&self) -> Duration {
        Duration::from_millis(self.initial_wait_ms)
    }

    pub fn layout_wait(&self) -> Duration {
        Duration::from_millis(self.layout_wait_ms)
    }

    pub fn cookie_settle(&self) -> Duration {
        Duration::from_millis(self.cookie_settle_ms)
    }

    pub fn toggle_timeout(&self) -> Duration {
        Duration::from_millis(self.toggle_timeout_ms)
    }

    pub fn restore_pause(&self) -> Duration {
        Duration::from_millis(self.restore_pause_ms)
    }

    pub fn page_settle_timeout(&self) -> Duration {
        Duration::from_millis(self.page_settle_timeout_ms)
    }

    pub fn related_wait(&self) -> Duration {
        Duration::from_millis(self.related_wait_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// Per-target extraction settings
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub query: TrendsQuery,
    pub selectors: Selectors,
    pub timing: Timing,
    /// Drop the first row of each page. Some targets render a header-like row there.
    pub skip_first: bool,
    /// Upper bound on pages visited, in case the next control never disables
    pub max_pages: usize,
}

impl ExtractOptions {
    pub fn new(query: TrendsQuery, skip_first: bool) -> Self {
        Self {
            query,
            selectors: Selectors::default(),
            timing: Timing::default(),
            skip_first,
            max_pages: 50,
        }
    }
}
