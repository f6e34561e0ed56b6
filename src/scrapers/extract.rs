use crate::models::TrendRow;
use crate::scrapers::layout::LayoutKind;
use crate::scrapers::traits::{wait_until, PageAdapter};
use crate::scrapers::types::ExtractOptions;
use anyhow::Result;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Field elements located inside one row or card
struct Fields<E> {
    title: E,
    volume: E,
    time: E,
    breakdown: Option<E>,
}

/// Extract every visible trend on the current page, in DOM order.
///
/// A row that cannot be read is logged and skipped; only a failure to list the rows
/// themselves is returned as an error.
pub fn extract<P: PageAdapter>(
    page: &P,
    layout: LayoutKind,
    opts: &ExtractOptions,
) -> Result<Vec<TrendRow>> {
    let items = page.query_all(layout.item_selector(&opts.selectors))?;
    let skip = usize::from(opts.skip_first);
    info!(layout = ?layout, found = items.len(), skip, "Extracting trends");

    let mut rows = Vec::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate().skip(skip) {
        match extract_item(page, layout, item, opts) {
            Ok(Some(row)) => {
                debug!(idx, title = %row.title, "Extracted trend");
                rows.push(row);
            }
            Ok(None) => debug!(idx, "Skipped hidden or incomplete item"),
            Err(e) => warn!(idx, error = %e, "Failed to extract trend, skipping"),
        }
    }
    Ok(rows)
}

fn extract_item<'p, P: PageAdapter>(
    page: &'p P,
    layout: LayoutKind,
    item: &P::Element<'p>,
    opts: &ExtractOptions,
) -> Result<Option<TrendRow>> {
    if !page.is_visible(item)? {
        return Ok(None);
    }
    let Some(fields) = locate_fields(page, layout, item, opts)? else {
        return Ok(None);
    };

    let title = first_line(&page.inner_text(&fields.title)?);
    let volume = first_line(&page.inner_text(&fields.volume)?);

    let markers = &opts.selectors.marker_lines;
    let (started, ended) = split_time_lines(&page.inner_text(&fields.time)?, markers);
    let target_publish =
        read_absolute_time(page, &fields.time, opts).unwrap_or_else(|| ended.clone());

    let breakdown = match &fields.breakdown {
        Some(el) => join_breakdown(page, el, &opts.selectors.breakdown_item)?,
        None => String::new(),
    };
    let explore_url = opts.query.explore_url(&title);

    Ok(Some(TrendRow {
        title,
        volume,
        started,
        ended,
        explore_url,
        target_publish,
        breakdown,
        sport: None,
        league: None,
    }))
}

fn locate_fields<'p, P: PageAdapter>(
    page: &'p P,
    layout: LayoutKind,
    item: &P::Element<'p>,
    opts: &ExtractOptions,
) -> Result<Option<Fields<P::Element<'p>>>> {
    match layout {
        LayoutKind::Table => {
            let t = &opts.selectors.table;
            let cells = page.query_within(item, &t.cell)?;
            if cells.len() < t.min_cells {
                debug!(cells = cells.len(), min = t.min_cells, "Row has too few cells");
                return Ok(None);
            }
            let mut cells: Vec<Option<_>> = cells.into_iter().map(Some).collect();
            let mut take = |idx: usize| cells.get_mut(idx).and_then(Option::take);
            let (Some(title), Some(volume), Some(time)) =
                (take(t.title_cell), take(t.volume_cell), take(t.time_cell))
            else {
                return Ok(None);
            };
            let breakdown = take(t.breakdown_cell);
            Ok(Some(Fields {
                title,
                volume,
                time,
                breakdown,
            }))
        }
        LayoutKind::Card => {
            let c = &opts.selectors.card;
            let first = |selector: &str| -> Result<Option<P::Element<'p>>> {
                Ok(page.query_within(item, selector)?.into_iter().next())
            };
            let (Some(title), Some(volume), Some(time)) =
                (first(&c.title)?, first(&c.volume)?, first(&c.time)?)
            else {
                return Ok(None);
            };
            let breakdown = first(&c.breakdown)?;
            Ok(Some(Fields {
                title,
                volume,
                time,
                breakdown,
            }))
        }
    }
}

fn first_line(text: &str) -> String {
    text.lines().next().unwrap_or_default().trim().to_string()
}

fn data_lines<'a>(raw: &'a str, markers: &'a [String]) -> impl Iterator<Item = &'a str> + 'a {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(move |line| !markers.iter().any(|m| m.eq_ignore_ascii_case(line)))
}

/// Split a time cell into `(started, ended)`, dropping icon ligature lines.
/// Missing lines come back empty.
pub fn split_time_lines(raw: &str, markers: &[String]) -> (String, String) {
    let mut lines = data_lines(raw, markers);
    let started = lines.next().unwrap_or_default().to_string();
    let ended = lines.next().unwrap_or_default().to_string();
    (started, ended)
}

/// Clicks the toggle back when dropped, so the cell returns to relative times
/// whatever happens while it is flipped.
struct RestoreToggle<'a, 'p, P: PageAdapter>
where
    P: 'p,
{
    page: &'p P,
    toggle: &'a P::Element<'p>,
    pause: Duration,
}

impl<'a, 'p, P: PageAdapter> Drop for RestoreToggle<'a, 'p, P>
where
    P: 'p,
{
    fn drop(&mut self) {
        match self.page.click(self.toggle) {
            Ok(()) => self.page.pause(self.pause),
            Err(e) => warn!(error = %e, "Failed to restore time toggle"),
        }
    }
}

/// Flip the time cell to absolute dates and read its first line.
/// `None` when there is no toggle or the cell does not change.
fn read_absolute_time<'p, P: PageAdapter>(
    page: &'p P,
    time_cell: &P::Element<'p>,
    opts: &ExtractOptions,
) -> Option<String> {
    let toggle = match page.query_within(time_cell, &opts.selectors.toggle) {
        Ok(found) => found.into_iter().next()?,
        Err(e) => {
            debug!(error = %e, "Toggle lookup failed");
            return None;
        }
    };
    let before = page.inner_text(time_cell).ok()?;

    if let Err(e) = page.click(&toggle) {
        debug!(error = %e, "Toggle click failed");
        return None;
    }
    let _restore = RestoreToggle {
        page,
        toggle: &toggle,
        pause: opts.timing.restore_pause(),
    };

    let timing = &opts.timing;
    let flipped = wait_until(page, timing.toggle_timeout(), timing.poll_interval(), || {
        page.inner_text(time_cell)
            .map(|text| text != before)
            .unwrap_or(false)
    });
    if !flipped {
        debug!("Toggle had no visible effect");
        return None;
    }

    let text = page.inner_text(time_cell).ok()?;
    let absolute = data_lines(&text, &opts.selectors.marker_lines)
        .next()
        .map(str::to_string);
    absolute
}

fn join_breakdown<'p, P: PageAdapter>(
    page: &'p P,
    cell: &P::Element<'p>,
    selector: &str,
) -> Result<String> {
    let mut parts = Vec::new();
    for span in page.query_within(cell, selector)? {
        let text = page.inner_text(&span)?;
        let text = text.trim();
        if !text.is_empty() {
            parts.push(text.to_string());
        }
    }
    Ok(parts.join(", "))
}
