//! Result Reconciler
//!
//! Turns the row sets of one dispatch into what the table displays: rows,
//! headers, the optional totals row and the page navigation state.

use crate::engine::Row;
use crate::query::{PagingState, QueryObject};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// What the view should show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewStatus {
    /// The primary query returned no rows
    NoData,
    Ready,
}

/// A reconciled table page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableView {
    pub status: ViewStatus,
    /// Keys of the first row, empty when there are no rows
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub totals: Option<Row>,
    pub total_records: usize,
    pub current_page: usize,
    pub page_size: usize,
    /// Never less than 1
    pub page_count: usize,
    pub has_previous: bool,
    pub has_next: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header_text: Option<String>,
}

impl TableView {
    /// Human-readable "Page x of y" label (1-based)
    pub fn page_label(&self) -> String {
        format!("Page {} of {}", self.current_page as u128 + 1, self.page_count)
    }
}

/// `max(1, ceil(total_records / page_size))`
pub fn page_count(total_records: usize, page_size: usize) -> usize {
    total_records.div_ceil(page_size.max(1)).max(1)
}

/// Combine the results of a dispatch, aligned index-wise with `queries`
pub fn reconcile(queries: &[QueryObject], mut results: Vec<Vec<Row>>, paging: PagingState) -> TableView {
    let find = |pred: fn(&QueryObject) -> bool| queries.iter().position(pred);
    let row_count_at = find(|q| q.is_rowcount);
    let totals_at = find(|q| q.is_totals);

    let total_from_count = row_count_at
        .and_then(|i| results.get(i))
        .and_then(|rows| rows.first())
        .and_then(|row| row.values().next())
        .and_then(as_count);

    let totals = totals_at
        .and_then(|i| results.get_mut(i))
        .and_then(|rows| (!rows.is_empty()).then(|| rows.swap_remove(0)));

    let rows = if results.is_empty() {
        Vec::new()
    } else {
        results.swap_remove(0)
    };

    let total_records = total_from_count.unwrap_or(rows.len());
    let page_count = page_count(total_records, paging.page_size);

    let (status, headers, totals) = match rows.first() {
        Some(first) => (ViewStatus::Ready, first.keys().cloned().collect(), totals),
        None => (ViewStatus::NoData, Vec::new(), None),
    };

    TableView {
        status,
        headers,
        rows,
        totals,
        total_records,
        current_page: paging.current_page,
        page_size: paging.page_size,
        page_count,
        has_previous: paging.current_page > 0,
        has_next: paging.current_page < page_count.saturating_sub(1),
        header_text: None,
    }
}

fn as_count(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .map(|n| n as usize),
        _ => None,
    }
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

impl fmt::Display for TableView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(text) = &self.header_text {
            writeln!(f, "{}", text)?;
        }
        if self.status == ViewStatus::NoData {
            return writeln!(f, "No data");
        }

        let mut body: Vec<Vec<String>> = self
            .rows
            .iter()
            .chain(self.totals.iter())
            .map(|row| self.headers.iter().map(|h| cell(row.get(h))).collect())
            .collect();

        // the totals row carries no dimension values; label it instead
        if self.totals.is_some() {
            if let Some(first) = body.last_mut().and_then(|cells| cells.first_mut()) {
                if first.is_empty() {
                    *first = "Total".to_string();
                }
            }
        }

        let widths: Vec<usize> = self
            .headers
            .iter()
            .enumerate()
            .map(|(i, h)| {
                body.iter()
                    .map(|r| r[i].chars().count())
                    .chain(std::iter::once(h.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let line = |f: &mut fmt::Formatter<'_>, cells: &[String]| -> fmt::Result {
            let padded: Vec<String> = cells
                .iter()
                .zip(&widths)
                .map(|(c, w)| format!("{:<width$}", c, width = *w))
                .collect();
            writeln!(f, "{}", padded.join(" | ").trim_end())
        };

        line(f, &self.headers)?;
        writeln!(
            f,
            "{}",
            widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("-+-")
        )?;
        for (i, cells) in body.iter().enumerate() {
            if i == self.rows.len() {
                writeln!(f, "{}", "=".repeat(widths.iter().sum::<usize>() + 3 * widths.len().saturating_sub(1)))?;
            }
            line(f, cells)?;
        }

        write!(f, "{} ({} records)", self.page_label(), self.total_records)?;
        if self.has_previous {
            write!(f, " [prev]")?;
        }
        if self.has_next {
            write!(f, " [next]")?;
        }
        writeln!(f)
    }
}
