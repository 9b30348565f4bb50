//! Source-page transport: fetching encyclopedia pages and lifting their
//! wikitables into plain string grids.
//!
//! Everything downstream works on [`RawTable`]; only this module knows
//! about HTML. Rowspans are expanded so every logical row carries a full
//! set of cells.

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;

use crate::models::RawTable;

/// Decade-partitioned source pages, oldest first. `harvest_latest` only
/// looks at the last one.
pub const SOURCE_PAGES: &[&str] = &[
    "https://en.wikipedia.org/wiki/List_of_UK_Singles_Chart_number_ones_of_the_1990s",
    "https://en.wikipedia.org/wiki/List_of_UK_Singles_Chart_number_ones_of_the_2000s",
    "https://en.wikipedia.org/wiki/List_of_UK_Singles_Chart_number_ones_of_the_2010s",
    "https://en.wikipedia.org/wiki/List_of_UK_Singles_Chart_number_ones_of_the_2020s",
];

const USER_AGENT: &str = "chartsync/0.1 (playlist sync; contact: see repository)";

static TABLE: Lazy<Selector> = Lazy::new(|| Selector::parse("table.wikitable").unwrap());
static CAPTION: Lazy<Selector> = Lazy::new(|| Selector::parse("caption").unwrap());
static ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").unwrap());
static CELL: Lazy<Selector> = Lazy::new(|| Selector::parse("th, td").unwrap());
static HEADING: Lazy<Selector> = Lazy::new(|| Selector::parse("h2, h3, h4").unwrap());

/// Fetches one source page as raw HTML.
pub trait PageFetcher {
    fn fetch(&self, url: &str) -> Result<String>;
}

/// Blocking HTTP fetcher with bounded timeouts.
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    pub fn new() -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(10))
            .timeout_read(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build();
        Self { agent }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl PageFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<String> {
        self.agent
            .get(url)
            .call()
            .with_context(|| format!("fetching {url}"))?
            .into_string()
            .with_context(|| format!("reading body of {url}"))
    }
}

fn element_text(el: &ElementRef) -> String {
    let joined: String = el.text().collect();
    joined.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Nearest section heading before the table, for base-year inference.
fn preceding_heading(table: &ElementRef) -> Option<String> {
    for sibling in table.prev_siblings() {
        let Some(el) = ElementRef::wrap(sibling) else {
            continue;
        };
        if matches!(el.value().name(), "h2" | "h3" | "h4") {
            return Some(element_text(&el));
        }
        // Headings are often wrapped (e.g. <div class="mw-heading"><h2>…)
        if let Some(h) = el.select(&HEADING).last() {
            return Some(element_text(&h));
        }
    }
    None
}

/// Expand one table's rows into a rectangular grid, carrying rowspanned
/// cells down into the rows they cover.
fn grid_rows(table: &ElementRef) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut pending: FxHashMap<usize, (String, usize)> = FxHashMap::default();
    for tr in table.select(&ROW) {
        let mut cells = Vec::new();
        let mut cell_iter = tr.select(&CELL);
        let mut next_cell = cell_iter.next();
        let mut col = 0usize;
        while next_cell.is_some() || pending.contains_key(&col) {
            if let Some((text, remaining)) = pending.remove(&col) {
                cells.push(text.clone());
                if remaining > 1 {
                    pending.insert(col, (text, remaining - 1));
                }
            } else if let Some(cell) = next_cell.take() {
                let text = element_text(&cell);
                let rowspan = cell
                    .value()
                    .attr("rowspan")
                    .and_then(|r| r.parse::<usize>().ok())
                    .unwrap_or(1);
                if rowspan > 1 {
                    pending.insert(col, (text.clone(), rowspan - 1));
                }
                cells.push(text);
                next_cell = cell_iter.next();
            }
            col += 1;
        }
        if !cells.is_empty() {
            rows.push(cells);
        }
    }
    rows
}

/// Lift every wikitable in the document into a [`RawTable`]. The first
/// grid row becomes the header row.
pub fn parse_tables(html: &str) -> Vec<RawTable> {
    let document = Html::parse_document(html);
    let mut tables = Vec::new();
    for table_el in document.select(&TABLE) {
        let mut grid = grid_rows(&table_el);
        if grid.is_empty() {
            continue;
        }
        let headers = grid.remove(0);
        tables.push(RawTable {
            caption: table_el.select(&CAPTION).next().map(|c| element_text(&c)),
            heading: preceding_heading(&table_el),
            headers,
            rows: grid,
        });
    }
    tables
}
