use crate::scrapers::traits::PageAdapter;
use crate::scrapers::types::{ExtractOptions, Selectors};
use tracing::{debug, info};

/// DOM shape the trending list is rendered in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutKind {
    Table,
    Card,
}

impl LayoutKind {
    /// Strategies in the order they are tried
    pub const ORDER: [LayoutKind; 2] = [LayoutKind::Table, LayoutKind::Card];

    pub fn item_selector(self, selectors: &Selectors) -> &str {
        match self {
            LayoutKind::Table => &selectors.table.row,
            LayoutKind::Card => &selectors.card.card,
        }
    }
}

/// Outcome of layout detection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection {
    Found(LayoutKind),
    /// Neither layout has any items; the page has no trends
    Empty,
}

/// Selector list matching the items of any known layout
pub fn any_layout_selector(selectors: &Selectors) -> String {
    LayoutKind::ORDER
        .iter()
        .map(|kind| kind.item_selector(selectors))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Try each layout in order and return the first one with items on the page.
pub fn detect<P: PageAdapter>(page: &P, opts: &ExtractOptions) -> Detection {
    for kind in LayoutKind::ORDER {
        if let Some(count) = probe(page, kind, opts) {
            info!(layout = ?kind, items = count, "Detected trend layout");
            return Detection::Found(kind);
        }
    }
    info!("No trend layout found on page");
    Detection::Empty
}

fn probe<P: PageAdapter>(page: &P, kind: LayoutKind, opts: &ExtractOptions) -> Option<usize> {
    let selector = kind.item_selector(&opts.selectors);
    if !page.wait_for(selector, opts.timing.layout_wait()) {
        debug!(layout = ?kind, selector, "Layout selector did not appear");
        return None;
    }
    match page.query_all(selector) {
        Ok(items) if !items.is_empty() => Some(items.len()),
        Ok(_) => None,
        Err(e) => {
            debug!(layout = ?kind, error = %e, "Layout probe failed");
            None
        }
    }
}
