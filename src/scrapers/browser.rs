use crate::scrapers::traits::PageAdapter;
use anyhow::{Context, Result};
use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::{Browser, Element, LaunchOptions, Tab};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

const IS_VISIBLE_JS: &str = r#"function() {
    const rect = this.getBoundingClientRect();
    const style = window.getComputedStyle(this);
    return rect.width > 0 && rect.height > 0
        && style.visibility !== 'hidden' && style.display !== 'none';
}"#;

const GET_ATTRIBUTE_JS: &str = "function(name) { return this.getAttribute(name); }";

/// Headless Chrome session the scraper opens pages in
pub struct TrendsBrowser {
    browser: Browser,
}

impl TrendsBrowser {
    /// Launch Chrome
    pub fn launch(headless: bool) -> Result<Self> {
        info!("Launching headless Chrome...");

        let options = LaunchOptions::default_builder()
            .headless(headless)
            .sandbox(false)
            .window_size(Some((1920, 1080)))
            .idle_browser_timeout(Duration::from_secs(600))
            .build()
            .context("Failed to build launch options")?;

        let browser = Browser::new(options).context("Failed to launch Chrome browser")?;

        Ok(Self { browser })
    }

    /// Open a fresh tab
    pub fn new_page(&self) -> Result<ChromePage> {
        let tab = self.browser.new_tab().context("Failed to open browser tab")?;
        Ok(ChromePage { tab })
    }
}

/// One Chrome tab
pub struct ChromePage {
    tab: Arc<Tab>,
}

impl Drop for ChromePage {
    fn drop(&mut self) {
        if let Err(e) = self.tab.close(true) {
            debug!(error = %e, "Failed to close tab");
        }
    }
}

impl ChromePage {
    /// Save the page HTML and a screenshot under `dir` for selector debugging
    pub fn dump_debug(&self, dir: &Path, name: &str) -> Result<()> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;

        let html = self.content()?;
        let html_path = dir.join(format!("{}.html", name));
        std::fs::write(&html_path, &html)?;
        info!("Saved page HTML to {} ({} bytes)", html_path.display(), html.len());

        let screenshot = self
            .tab
            .capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, true)
            .context("Failed to capture screenshot")?;
        let png_path = dir.join(format!("{}.png", name));
        std::fs::write(&png_path, screenshot)?;
        info!("Saved screenshot to {}", png_path.display());

        Ok(())
    }
}

impl PageAdapter for ChromePage {
    type Element<'a> = Element<'a>;

    fn navigate(&self, url: &str) -> Result<()> {
        self.tab.navigate_to(url)?;
        self.tab.wait_until_navigated()?;
        Ok(())
    }

    fn query_all(&self, selector: &str) -> Result<Vec<Element<'_>>> {
        // headless_chrome reports "nothing matched" as an error
        match self.tab.find_elements(selector) {
            Ok(found) => Ok(found),
            Err(e) => {
                debug!(selector, error = %e, "No elements matched");
                Ok(Vec::new())
            }
        }
    }

    fn query_within<'a>(&'a self, parent: &Element<'a>, selector: &str) -> Result<Vec<Element<'a>>> {
        match parent.find_elements(selector) {
            Ok(found) => Ok(found),
            Err(e) => {
                debug!(selector, error = %e, "No child elements matched");
                Ok(Vec::new())
            }
        }
    }

    fn inner_text(&self, element: &Element<'_>) -> Result<String> {
        element.get_inner_text()
    }

    fn is_visible(&self, element: &Element<'_>) -> Result<bool> {
        let result = element.call_js_fn(IS_VISIBLE_JS, vec![], false)?;
        Ok(result.value.and_then(|v| v.as_bool()).unwrap_or(false))
    }

    fn attribute(&self, element: &Element<'_>, name: &str) -> Result<Option<String>> {
        let result = element.call_js_fn(GET_ATTRIBUTE_JS, vec![json!(name)], false)?;
        Ok(result
            .value
            .and_then(|v| v.as_str().map(str::to_string)))
    }

    fn click(&self, element: &Element<'_>) -> Result<()> {
        element.click()?;
        Ok(())
    }

    fn scroll_into_view(&self, element: &Element<'_>) -> Result<()> {
        element.scroll_into_view()?;
        Ok(())
    }

    fn wait_for(&self, selector: &str, timeout: Duration) -> bool {
        self.tab
            .wait_for_element_with_custom_timeout(selector, timeout)
            .is_ok()
    }

    fn content(&self) -> Result<String> {
        let html = self
            .tab
            .evaluate("document.documentElement.outerHTML", false)?;
        Ok(html
            .value
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default())
    }

    fn pause(&self, duration: Duration) {
        thread::sleep(duration);
    }
}
