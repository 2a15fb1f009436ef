use std::fmt::Write;

use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;

/// Column order shared by the insert statement and the console preview.
pub const COLUMNS: [&str; 5] = [
    "currency",
    "rate",
    "reference_date",
    "created_at",
    "created_at_converted",
];

#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeRateRow {
    pub currency: String,
    pub rate: f64,
    pub reference_date: NaiveDate,
    pub created_at: DateTime<Tz>,
    pub created_at_converted: DateTime<Tz>,
}

impl ExchangeRateRow {
    fn cells(&self) -> [String; 5] {
        [
            self.currency.clone(),
            self.rate.to_string(),
            self.reference_date.to_string(),
            self.created_at.to_rfc3339(),
            self.created_at_converted.to_rfc3339(),
        ]
    }
}

/// Plain-text table of the first `limit` rows.
pub fn render_preview(rows: &[ExchangeRateRow], limit: usize) -> String {
    let body: Vec<[String; 5]> = rows.iter().take(limit).map(ExchangeRateRow::cells).collect();

    let mut widths = COLUMNS.map(str::len);
    for cells in &body {
        for (width, cell) in widths.iter_mut().zip(cells) {
            *width = (*width).max(cell.len());
        }
    }

    let mut out = String::new();
    write_line(&mut out, &COLUMNS.map(String::from), &widths);
    for cells in &body {
        write_line(&mut out, cells, &widths);
    }
    if rows.len() > limit {
        let _ = writeln!(out, "... {} more rows", rows.len() - limit);
    }

    out
}

fn write_line(out: &mut String, cells: &[String; 5], widths: &[usize; 5]) {
    let line: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
        .collect();
    let _ = writeln!(out, "{}", line.join("  ").trim_end());
}
