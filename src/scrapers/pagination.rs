use crate::models::TrendRow;
use crate::scrapers::extract::extract;
use crate::scrapers::layout::{any_layout_selector, detect, Detection, LayoutKind};
use crate::scrapers::traits::{wait_until, PageAdapter};
use crate::scrapers::types::ExtractOptions;
use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Walks the trending list page by page through the in-page "next" control
pub struct PaginationDriver<'a, P: PageAdapter> {
    page: &'a P,
    opts: &'a ExtractOptions,
}

impl<'a, P: PageAdapter> PaginationDriver<'a, P> {
    pub fn new(page: &'a P, opts: &'a ExtractOptions) -> Self {
        Self { page, opts }
    }

    /// Load the trending page and collect rows from every page until the next
    /// control is missing or disabled, or `max_pages` is reached.
    pub fn scrape_all_pages(&self) -> Result<Vec<TrendRow>> {
        let url = self.opts.query.trending_url();
        info!("Opening trending page {}", url);
        self.page
            .navigate(&url)
            .with_context(|| format!("Failed to open {}", url))?;

        let selectors = &self.opts.selectors;
        let timing = &self.opts.timing;
        if !self
            .page
            .wait_for(&any_layout_selector(selectors), timing.initial_wait())
        {
            warn!("No trend list appeared, continuing anyway");
        }
        dismiss_cookie_banner(self.page, &self.opts.selectors, timing.cookie_settle());

        let layout = match detect(self.page, self.opts) {
            Detection::Found(kind) => kind,
            Detection::Empty => return Ok(Vec::new()),
        };

        let mut rows = Vec::new();
        let mut page_no = 1;
        loop {
            let batch = extract(self.page, layout, self.opts)?;
            info!(page = page_no, rows = batch.len(), "Extracted page");
            rows.extend(batch);

            let Some(next) = self.find_next()? else {
                break;
            };
            if page_no >= self.opts.max_pages {
                warn!(
                    max_pages = self.opts.max_pages,
                    "Stopping at page limit while a next page is still offered"
                );
                break;
            }

            let before = self.snapshot(layout);
            if let Err(e) = self.page.scroll_into_view(&next) {
                debug!(error = %e, "Could not scroll next control into view");
            }
            if let Err(e) = self.page.click(&next) {
                warn!(page = page_no, error = %e, "Failed to click next page, keeping rows so far");
                break;
            }
            page_no += 1;

            let changed = wait_until(
                self.page,
                timing.page_settle_timeout(),
                timing.poll_interval(),
                || self.snapshot(layout) != before,
            );
            if !changed {
                warn!(page = page_no, "Page content did not change after clicking next");
            }
        }

        info!(pages = page_no, rows = rows.len(), "Finished paging");
        Ok(rows)
    }

    /// Enabled next-page control, if any
    fn find_next(&self) -> Result<Option<P::Element<'a>>> {
        let selectors = &self.opts.selectors;
        let mut candidates = self.page.query_all(&selectors.next_css)?;
        if candidates.is_empty() {
            candidates = find_buttons_by_label(self.page, &selectors.buttons, &selectors.next_labels);
        }
        let Some(next) = candidates.into_iter().next() else {
            debug!("No next-page control on page");
            return Ok(None);
        };
        if is_disabled(self.page, &next)? {
            info!("Next-page control is disabled, last page reached");
            return Ok(None);
        }
        Ok(Some(next))
    }

    /// Item count and first data item's text, to notice when the list is replaced
    fn snapshot(&self, layout: LayoutKind) -> (usize, String) {
        let items = match self.page.query_all(layout.item_selector(&self.opts.selectors)) {
            Ok(items) => items,
            Err(_) => return (0, String::new()),
        };
        let first = items
            .get(usize::from(self.opts.skip_first))
            .and_then(|item| self.page.inner_text(item).ok())
            .unwrap_or_default();
        (items.len(), first)
    }
}

/// Disabled either through the `disabled` attribute or `aria-disabled="true"`
pub fn is_disabled<'p, P: PageAdapter>(page: &'p P, element: &P::Element<'p>) -> Result<bool> {
    if page.attribute(element, "disabled")?.is_some() {
        return Ok(true);
    }
    Ok(page
        .attribute(element, "aria-disabled")?
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("true")))
}

/// Buttons whose trimmed text equals one of `labels`, or whose accessible name
/// contains one, ignoring case. Buttons that fail to report are passed over.
pub fn find_buttons_by_label<'p, P: PageAdapter>(
    page: &'p P,
    buttons: &str,
    labels: &[String],
) -> Vec<P::Element<'p>> {
    let candidates = match page.query_all(buttons) {
        Ok(found) => found,
        Err(e) => {
            debug!(error = %e, "Button lookup failed");
            return Vec::new();
        }
    };
    let labels: Vec<String> = labels.iter().map(|l| l.to_lowercase()).collect();

    candidates
        .into_iter()
        .filter(|button| {
            let text = page.inner_text(button).unwrap_or_default().to_lowercase();
            let name = page
                .attribute(button, "aria-label")
                .ok()
                .flatten()
                .unwrap_or_default()
                .to_lowercase();
            labels
                .iter()
                .any(|label| text.trim() == label.as_str() || name.contains(label.as_str()))
        })
        .collect()
}

/// Click the first cookie-consent button found. Never fails the run.
pub fn dismiss_cookie_banner<P: PageAdapter>(
    page: &P,
    selectors: &crate::scrapers::types::Selectors,
    settle: Duration,
) -> bool {
    for label in &selectors.cookie_labels {
        let found = find_buttons_by_label(page, &selectors.buttons, std::slice::from_ref(label));
        let Some(button) = found.into_iter().next() else {
            continue;
        };
        match page.click(&button) {
            Ok(()) => {
                page.pause(settle);
                info!("🛡️ Dismissed cookie banner ({})", label);
                return true;
            }
            Err(e) => debug!(label = %label, error = %e, "Cookie button click failed"),
        }
    }
    false
}
