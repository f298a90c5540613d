use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::error::ScrapeError;
use crate::row::TrendRow;

static TABLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("table").expect("static table selector"));

/// Parses `html` and extracts the first table. Blank input gives no rows.
pub fn extract_rows_from_html(html: &str) -> Result<Vec<TrendRow>, ScrapeError> {
    if html.trim().is_empty() {
        return Ok(Vec::new());
    }
    let document = Html::parse_document(html);
    extract_rows(&document)
}

/// Turns the first `<table>` of `document` into one [`TrendRow`] per data row,
/// in document order.
pub fn extract_rows(document: &Html) -> Result<Vec<TrendRow>, ScrapeError> {
    let table = document
        .select(&TABLE)
        .next()
        .ok_or(ScrapeError::NoTableFound)?;

    let rows = table_rows(table);
    let Some(header_idx) = header_row_index(&rows) else {
        return Ok(Vec::new());
    };

    let headers = header_labels(rows[header_idx].element);
    let mut out = Vec::new();
    for (offset, row) in rows.iter().enumerate().skip(header_idx + 1) {
        let values = child_cells(row.element, "td")
            .map(cell_text)
            .collect::<Vec<_>>();
        if is_separator_row(&values) {
            continue;
        }
        if headers.is_empty() {
            return Err(ScrapeError::UnresolvableHeaders);
        }
        if values.len() != headers.len() {
            debug!(
                row = offset,
                headers = headers.len(),
                cells = values.len(),
                "column count mismatch, truncating to shorter"
            );
        }
        out.push(zip_truncated(&headers, values));
    }
    Ok(out)
}

/// Rows without any `<td>` are visual separators, not data.
pub fn is_separator_row(values: &[String]) -> bool {
    values.is_empty()
}

/// Pairs labels with values positionally, stopping at the shorter side.
pub fn zip_truncated(headers: &[String], values: Vec<String>) -> TrendRow {
    headers.iter().cloned().zip(values).collect()
}

/// Makes header labels non-empty and unique: blanks become `column_<n>`
/// (1-based position), repeats get a `_<k>` suffix.
pub fn assign_labels(raw: Vec<String>) -> Vec<String> {
    let mut labels: Vec<String> = Vec::with_capacity(raw.len());
    for (idx, text) in raw.into_iter().enumerate() {
        let base = if text.is_empty() {
            format!("column_{}", idx + 1)
        } else {
            text
        };
        let mut label = base.clone();
        let mut k = 2;
        while labels.contains(&label) {
            label = format!("{base}_{k}");
            k += 1;
        }
        labels.push(label);
    }
    labels
}

struct TableRow<'a> {
    element: ElementRef<'a>,
    in_thead: bool,
}

// Direct rows of this table only; rows of nested tables are not ours.
fn table_rows(table: ElementRef<'_>) -> Vec<TableRow<'_>> {
    let mut rows = Vec::new();
    for child in table.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "tr" => rows.push(TableRow {
                element: child,
                in_thead: false,
            }),
            section @ ("thead" | "tbody" | "tfoot") => {
                for tr in child_cells(child, "tr") {
                    rows.push(TableRow {
                        element: tr,
                        in_thead: section == "thead",
                    });
                }
            }
            _ => {}
        }
    }
    rows
}

fn header_row_index(rows: &[TableRow<'_>]) -> Option<usize> {
    if rows.is_empty() {
        return None;
    }
    Some(rows.iter().position(|r| r.in_thead).unwrap_or(0))
}

fn header_labels(row: ElementRef<'_>) -> Vec<String> {
    let mut raw = child_cells(row, "th").map(cell_text).collect::<Vec<_>>();
    if raw.is_empty() {
        raw = child_cells(row, "td").map(cell_text).collect();
    }
    assign_labels(raw)
}

fn child_cells<'a>(parent: ElementRef<'a>, name: &'a str) -> impl Iterator<Item = ElementRef<'a>> {
    parent
        .children()
        .filter_map(ElementRef::wrap)
        .filter(move |el| el.value().name() == name)
}

fn cell_text(cell: ElementRef<'_>) -> String {
    let raw = cell.text().collect::<String>();
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}
