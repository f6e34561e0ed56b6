use anyhow::Result;
use std::time::Duration;

/// Live, rendered page the scraper drives.
///
/// Element handles borrow the page they were found on. A selector that matches nothing
/// yields an empty `Vec`, and a wait that runs out yields `false`; neither is an error.
pub trait PageAdapter {
    type Element<'a>
    where
        Self: 'a;

    /// Load `url` and block until navigation finishes
    fn navigate(&self, url: &str) -> Result<()>;

    fn query_all(&self, selector: &str) -> Result<Vec<Self::Element<'_>>>;

    fn query_within<'a>(
        &'a self,
        parent: &Self::Element<'a>,
        selector: &str,
    ) -> Result<Vec<Self::Element<'a>>>;

    /// Rendered text, lines separated by `\n`
    fn inner_text(&self, element: &Self::Element<'_>) -> Result<String>;

    fn is_visible(&self, element: &Self::Element<'_>) -> Result<bool>;

    fn attribute(&self, element: &Self::Element<'_>, name: &str) -> Result<Option<String>>;

    fn click(&self, element: &Self::Element<'_>) -> Result<()>;

    fn scroll_into_view(&self, element: &Self::Element<'_>) -> Result<()>;

    /// Wait until `selector` matches at least one element
    fn wait_for(&self, selector: &str, timeout: Duration) -> bool;

    /// Full document HTML
    fn content(&self) -> Result<String>;

    fn pause(&self, duration: Duration);
}

/// Poll `condition` every `interval` until it holds or `timeout` has been spent pausing.
/// The budget is counted in pauses, not wall-clock time.
pub fn wait_until<P, F>(page: &P, timeout: Duration, interval: Duration, mut condition: F) -> bool
where
    P: PageAdapter,
    F: FnMut() -> bool,
{
    let interval = interval.max(Duration::from_millis(1));
    let checks = (timeout.as_millis() / interval.as_millis()).max(1);
    for _ in 0..checks {
        if condition() {
            return true;
        }
        page.pause(interval);
    }
    condition()
}
