use crate::models::TrendRow;
use crate::scrapers::pagination::dismiss_cookie_banner;
use crate::scrapers::traits::PageAdapter;
use crate::scrapers::types::ExtractOptions;
use anyhow::{bail, Result};
use scraper::{Html, Selector};
use tracing::{debug, warn};

/// Topics kept per trend
pub const RELATED_LIMIT: usize = 10;

/// Related topics listed on a trend's explore page. Any failure gives an empty list.
pub fn related_topics<P: PageAdapter>(page: &P, url: &str, opts: &ExtractOptions) -> Vec<String> {
    match load_related(page, url, opts) {
        Ok(topics) => {
            debug!(url, count = topics.len(), "Loaded related topics");
            topics
        }
        Err(e) => {
            warn!(url, error = %e, "Failed to load related topics");
            Vec::new()
        }
    }
}

/// Related topics for every row, each explore page in a page of its own from
/// `open_page`. A page that cannot be opened gives that row an empty list.
pub fn related_for_rows<P, F>(rows: &[TrendRow], opts: &ExtractOptions, mut open_page: F) -> Vec<Vec<String>>
where
    P: PageAdapter,
    F: FnMut() -> Result<P>,
{
    let mut topics = Vec::with_capacity(rows.len());
    for row in rows {
        let found = match open_page() {
            Ok(page) => related_topics(&page, &row.explore_url, opts),
            Err(e) => {
                warn!(title = %row.title, error = %e, "Could not open page for related topics");
                Vec::new()
            }
        };
        debug!(title = %row.title, count = found.len(), "Related topics");
        topics.push(found);
    }
    topics
}

fn load_related<P: PageAdapter>(page: &P, url: &str, opts: &ExtractOptions) -> Result<Vec<String>> {
    let selectors = &opts.selectors;
    let timing = &opts.timing;

    page.navigate(url)?;
    dismiss_cookie_banner(page, selectors, timing.cookie_settle());
    if !page.wait_for(&selectors.related_item, timing.related_wait()) {
        bail!("no related topics after {:?}", timing.related_wait());
    }
    let html = page.content()?;
    Ok(parse_related_topics(&html, &selectors.related_item, RELATED_LIMIT))
}

/// Text of each element matching `selector`, one line per text node, empties dropped.
pub fn parse_related_topics(html: &str, selector: &str, limit: usize) -> Vec<String> {
    let selector = match Selector::parse(selector) {
        Ok(selector) => selector,
        Err(e) => {
            warn!(selector, error = %e, "Invalid related-topic selector");
            return Vec::new();
        }
    };
    let document = Html::parse_document(html);

    document
        .select(&selector)
        .map(|item| {
            item.text()
                .map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
                .filter(|line| !line.is_empty())
                .collect::<Vec<_>>()
                .join("\n")
        })
        .filter(|text| !text.is_empty())
        .take(limit)
        .collect()
}
