//! In-memory page for driving the scraper in tests.
//!
//! Selectors are looked up verbatim (after splitting selector lists on `,`), so a test
//! registers exactly the selectors the code under test asks for.

use super::traits::PageAdapter;
use anyhow::{bail, Result};
use std::cell::RefCell;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnClick {
    Nothing,
    /// Flip the display state of another node
    Toggle(usize),
    /// Replace the page content with the next registered page
    NextPage,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub text: String,
    /// Text shown while the node is toggled
    pub alt_text: Option<String>,
    pub toggled: bool,
    pub visible: bool,
    pub attrs: HashMap<String, String>,
    pub children: HashMap<String, Vec<usize>>,
    pub on_click: OnClick,
    /// 1-based click numbers on this node that fail
    pub failing_clicks: Vec<usize>,
    pub clicks: usize,
}

impl Node {
    pub fn text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            alt_text: None,
            toggled: false,
            visible: true,
            attrs: HashMap::new(),
            children: HashMap::new(),
            on_click: OnClick::Nothing,
            failing_clicks: Vec::new(),
            clicks: 0,
        }
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn on_click(mut self, action: OnClick) -> Self {
        self.on_click = action;
        self
    }
}

/// Texts for one table row
pub struct TableRowSpec<'a> {
    pub title: &'a str,
    pub volume: &'a str,
    pub time: &'a str,
    pub absolute_time: Option<&'a str>,
    pub breakdown: &'a [&'a str],
}

#[derive(Default)]
struct State {
    nodes: Vec<Node>,
    pages: Vec<HashMap<String, Vec<usize>>>,
    page_html: Vec<String>,
    global: HashMap<String, Vec<usize>>,
    url_html: HashMap<String, String>,
    current: usize,
    navigations: Vec<String>,
    clicked: Vec<usize>,
    scrolled: Vec<usize>,
    paused: Duration,
}

pub struct FakePage {
    state: RefCell<State>,
}

impl FakePage {
    /// A page with `pages` pagination states, all empty
    pub fn new(pages: usize) -> Self {
        let state = State {
            pages: vec![HashMap::new(); pages.max(1)],
            page_html: vec![String::new(); pages.max(1)],
            ..Default::default()
        };
        Self {
            state: RefCell::new(state),
        }
    }

    pub fn add(&self, node: Node) -> usize {
        let mut state = self.state.borrow_mut();
        state.nodes.push(node);
        state.nodes.len() - 1
    }

    pub fn child(&self, parent: usize, selector: &str, node: Node) -> usize {
        let id = self.add(node);
        self.state.borrow_mut().nodes[parent]
            .children
            .entry(selector.to_string())
            .or_default()
            .push(id);
        id
    }

    pub fn on_page(&self, page: usize, selector: &str, id: usize) {
        self.state.borrow_mut().pages[page]
            .entry(selector.to_string())
            .or_default()
            .push(id);
    }

    pub fn everywhere(&self, selector: &str, id: usize) {
        self.state
            .borrow_mut()
            .global
            .entry(selector.to_string())
            .or_default()
            .push(id);
    }

    pub fn set_url_html(&self, url: &str, html: &str) {
        self.state
            .borrow_mut()
            .url_html
            .insert(url.to_string(), html.to_string());
    }

    pub fn fail_click(&self, id: usize, click_number: usize) {
        self.state.borrow_mut().nodes[id]
            .failing_clicks
            .push(click_number);
    }

    pub fn set_attr(&self, id: usize, name: &str, value: &str) {
        self.state.borrow_mut().nodes[id]
            .attrs
            .insert(name.to_string(), value.to_string());
    }

    pub fn node(&self, id: usize) -> Node {
        self.state.borrow().nodes[id].clone()
    }

    pub fn current_page(&self) -> usize {
        self.state.borrow().current
    }

    pub fn clicked(&self) -> Vec<usize> {
        self.state.borrow().clicked.clone()
    }

    pub fn scrolled(&self) -> Vec<usize> {
        self.state.borrow().scrolled.clone()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.state.borrow().navigations.clone()
    }

    /// Register a table row under the default table selectors on `page`.
    /// Returns the row id and the id of its time cell.
    pub fn table_row(&self, page: usize, spec: TableRowSpec<'_>) -> (usize, usize) {
        let row = self.add(Node::text(&format!("{}\n{}", spec.title, spec.volume)));
        self.on_page(page, "table tbody tr", row);

        self.child(row, "td", Node::text(""));
        self.child(row, "td", Node::text(&format!("{}\n{} searches", spec.title, spec.volume)));
        self.child(row, "td", Node::text(&format!("{}\narrow_upward\n1,000%", spec.volume)));

        let mut time = Node::text(spec.time);
        time.alt_text = spec.absolute_time.map(str::to_string);
        let time_cell = self.child(row, "td", time);
        self.child(
            time_cell,
            "div.vdw3Ld",
            Node::text("").on_click(OnClick::Toggle(time_cell)),
        );

        let breakdown_cell = self.child(row, "td", Node::text(&spec.breakdown.join("\n")));
        for item in spec.breakdown {
            self.child(breakdown_cell, "span.mUIrbf-vQzf8d", Node::text(item));
        }
        (row, time_cell)
    }

    fn lookup(map: &HashMap<String, Vec<usize>>, selector: &str, out: &mut Vec<usize>) {
        for part in selector.split(',').map(str::trim) {
            if let Some(ids) = map.get(part) {
                out.extend(ids.iter().copied());
            }
        }
    }
}

impl PageAdapter for FakePage {
    type Element<'a> = usize;

    fn navigate(&self, url: &str) -> Result<()> {
        self.state.borrow_mut().navigations.push(url.to_string());
        Ok(())
    }

    fn query_all(&self, selector: &str) -> Result<Vec<usize>> {
        let state = self.state.borrow();
        let mut out = Vec::new();
        Self::lookup(&state.pages[state.current], selector, &mut out);
        Self::lookup(&state.global, selector, &mut out);
        Ok(out)
    }

    fn query_within<'a>(&'a self, parent: &usize, selector: &str) -> Result<Vec<usize>> {
        let state = self.state.borrow();
        let mut out = Vec::new();
        Self::lookup(&state.nodes[*parent].children, selector, &mut out);
        Ok(out)
    }

    fn inner_text(&self, element: &usize) -> Result<String> {
        let state = self.state.borrow();
        let node = &state.nodes[*element];
        Ok(match (&node.alt_text, node.toggled) {
            (Some(alt), true) => alt.clone(),
            _ => node.text.clone(),
        })
    }

    fn is_visible(&self, element: &usize) -> Result<bool> {
        Ok(self.state.borrow().nodes[*element].visible)
    }

    fn attribute(&self, element: &usize, name: &str) -> Result<Option<String>> {
        Ok(self.state.borrow().nodes[*element].attrs.get(name).cloned())
    }

    fn click(&self, element: &usize) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let node = &mut state.nodes[*element];
        node.clicks += 1;
        if node.failing_clicks.contains(&node.clicks) {
            bail!("element {} detached", element);
        }
        let action = node.on_click;
        state.clicked.push(*element);
        match action {
            OnClick::Nothing => {}
            OnClick::Toggle(target) => {
                let target = &mut state.nodes[target];
                target.toggled = !target.toggled;
            }
            OnClick::NextPage => {
                if state.current + 1 < state.pages.len() {
                    state.current += 1;
                }
            }
        }
        Ok(())
    }

    fn scroll_into_view(&self, element: &usize) -> Result<()> {
        self.state.borrow_mut().scrolled.push(*element);
        Ok(())
    }

    fn wait_for(&self, selector: &str, _timeout: Duration) -> bool {
        self.query_all(selector).map(|v| !v.is_empty()).unwrap_or(false)
    }

    fn content(&self) -> Result<String> {
        let state = self.state.borrow();
        if let Some(html) = state
            .navigations
            .last()
            .and_then(|url| state.url_html.get(url))
        {
            return Ok(html.clone());
        }
        Ok(state.page_html[state.current].clone())
    }

    fn pause(&self, duration: Duration) {
        self.state.borrow_mut().paused += duration;
    }
}
