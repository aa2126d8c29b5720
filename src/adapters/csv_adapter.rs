//! CSV file data adapter.
//!
//! Reads one headered CSV (plain exports or DataGuide-style sheets with an
//! `Item` code row) into a [`DailyTable`].

use crate::domain::daily::{DailyBar, DailyTable};
use crate::domain::error::GaptraderError;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, info, warn};

const DATE_CANDIDATES: [&str; 4] = ["date", "날짜", "일자", "거래일"];

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%Y%m%d"];

/// DataGuide item codes shipped with the terminal's daily index export.
const ITEM_CODES: [(&str, &str); 8] = [
    ("I31000010F", "open"),
    ("I31000020F", "high"),
    ("I31000030F", "low"),
    ("I31000040F", "close"),
    ("I31000050F", "volume"),
    ("I310000600", "turnover"),
    ("I310021132", "foreign_net"),
    ("I310021232", "inst_net"),
];

const PRICE_COLUMNS: [&str; 4] = ["open", "high", "low", "close"];

/// Header normalization: drops NBSP and whitespace, a trailing `.0` on a
/// numeric label, and every non-alphanumeric character, then lowercases.
pub fn normalize_identifier(raw: &str) -> String {
    let text: String = raw
        .chars()
        .filter(|c| *c != '\u{00A0}' && !c.is_whitespace())
        .collect();
    let text = match text.strip_suffix(".0") {
        Some(stem) if !stem.is_empty() && stem.chars().all(|c| c.is_ascii_digit() || c == '.') => {
            stem.to_string()
        }
        _ => text,
    };
    text.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Parse a date cell, tolerating a trailing time of day.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }
    DATE_FORMATS.iter().find_map(|fmt| {
        NaiveDate::parse_from_str(text, fmt).ok().or_else(|| {
            NaiveDateTime::parse_from_str(text, &format!("{fmt} %H:%M:%S"))
                .ok()
                .map(|dt| dt.date())
        })
    })
}

/// Parse a numeric cell; thousands separators are accepted, empty is missing.
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| *c != ',' && *c != '\u{00A0}' && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// How headers and rows are interpreted.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvOptions {
    /// Explicit date header; otherwise a known candidate or the first column.
    pub date_column: Option<String>,
    /// Flow columns to carry into the table, in order.
    pub flow_columns: Vec<String>,
    /// `(header identifier, canonical name)` pairs, applied over the
    /// built-in item codes.
    pub aliases: Vec<(String, String)>,
    pub drop_weekends: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        CsvOptions {
            date_column: None,
            flow_columns: vec![
                "foreign_net".to_string(),
                "inst_net".to_string(),
                "priv_fund_net".to_string(),
            ],
            aliases: Vec::new(),
            drop_weekends: true,
        }
    }
}

impl CsvOptions {
    /// Read `[data]` and `[columns]`; the traded flow column and the
    /// required flow columns are always loaded when present in the file.
    pub fn from_config(config: &dyn ConfigPort) -> Self {
        let defaults = CsvOptions::default();
        let mut flow_columns = config
            .get_list("data", "flow_columns")
            .unwrap_or(defaults.flow_columns);
        let extra = config
            .get_string("flow", "column")
            .map(|c| vec![c.trim().to_string()])
            .into_iter()
            .chain(config.get_list("params", "required_flow_columns"))
            .flatten();
        for name in extra {
            if !name.is_empty() && !flow_columns.contains(&name) {
                flow_columns.push(name);
            }
        }

        CsvOptions {
            date_column: config
                .get_string("data", "date_column")
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            flow_columns,
            aliases: config.get_section("columns"),
            drop_weekends: config.get_bool("data", "drop_weekends", defaults.drop_weekends),
        }
    }
}

/// Column positions resolved from the header row.
#[derive(Debug)]
struct ColumnMap {
    date: usize,
    prices: [Option<usize>; 4],
    volume: Option<usize>,
    turnover: Option<usize>,
    /// `(configured flow name, column index)` for flows found in the header.
    flows: Vec<(String, usize)>,
}

impl ColumnMap {
    fn resolve(headers: &[String], options: &CsvOptions) -> Result<Self, GaptraderError> {
        let identifiers: Vec<String> = headers.iter().map(|h| normalize_identifier(h)).collect();

        let mut aliases: HashMap<String, String> = ITEM_CODES
            .iter()
            .map(|(code, name)| (normalize_identifier(code), name.to_string()))
            .collect();
        for (identifier, canonical) in &options.aliases {
            aliases.insert(
                normalize_identifier(identifier),
                canonical.trim().to_lowercase(),
            );
        }

        let date = match &options.date_column {
            Some(name) => {
                let wanted = normalize_identifier(name);
                identifiers
                    .iter()
                    .position(|id| *id == wanted)
                    .ok_or_else(|| GaptraderError::MalformedDate {
                        reason: format!("date column '{name}' not found"),
                    })?
            }
            None => DATE_CANDIDATES
                .iter()
                .find_map(|c| identifiers.iter().position(|id| id == c))
                .unwrap_or(0),
        };

        // canonical names compare in normalized form so `foreign_net`
        // matches a `Foreign Net` header
        let canonical: Vec<String> = identifiers
            .iter()
            .map(|id| normalize_identifier(aliases.get(id).map_or(id.as_str(), String::as_str)))
            .collect();
        let find = |name: &str| {
            let wanted = normalize_identifier(name);
            canonical
                .iter()
                .enumerate()
                .find(|(i, c)| *i != date && **c == wanted)
                .map(|(i, _)| i)
        };

        let prices = PRICE_COLUMNS.map(|name| find(name));
        let missing: Vec<String> = PRICE_COLUMNS
            .iter()
            .zip(&prices)
            .filter(|(_, idx)| idx.is_none())
            .map(|(name, _)| name.to_string())
            .collect();
        if !missing.is_empty() {
            let mut available: Vec<String> =
                identifiers.iter().filter(|id| !id.is_empty()).cloned().collect();
            available.sort();
            available.dedup();
            return Err(GaptraderError::MissingColumns { missing, available });
        }

        let flows = options
            .flow_columns
            .iter()
            .filter_map(|name| find(name).map(|idx| (name.clone(), idx)))
            .collect();

        Ok(ColumnMap {
            date,
            prices,
            volume: find("volume"),
            turnover: find("turnover"),
            flows,
        })
    }
}

fn cell(row: &[String], idx: usize) -> &str {
    row.get(idx).map_or("", String::as_str)
}

/// Counters for rows that never reach the table.
#[derive(Debug, Default)]
struct DropCounts {
    bad_date: usize,
    weekend: usize,
    bad_price: usize,
}

pub struct CsvAdapter {
    path: PathBuf,
    options: CsvOptions,
}

impl CsvAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self::with_options(path, CsvOptions::default())
    }

    pub fn with_options(path: PathBuf, options: CsvOptions) -> Self {
        Self { path, options }
    }

    fn read_records(&self) -> Result<Vec<Vec<String>>, GaptraderError> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&self.path)
            .map_err(|e| GaptraderError::Data {
                reason: format!("failed to read {}: {}", self.path.display(), e),
            })?;

        let mut records = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| GaptraderError::Data {
                reason: format!("CSV parse error in {}: {}", self.path.display(), e),
            })?;
            records.push(record.iter().map(str::to_string).collect());
        }
        Ok(records)
    }
}

/// Index of the header row and of the first data row.
///
/// DataGuide exports put a metadata preamble above an `Item` row of codes,
/// followed by an optional `Frequency` row. Plain CSVs start at row 0.
fn locate_header(records: &[Vec<String>]) -> (usize, usize) {
    let is_item_code = |cell: &String| {
        let id = normalize_identifier(cell);
        let mut chars = id.chars();
        chars.next() == Some('i') && chars.take(7).filter(char::is_ascii_digit).count() == 7
    };

    let header = records
        .iter()
        .enumerate()
        .filter(|(_, row)| row.iter().any(|c| normalize_identifier(c) == "item"))
        .max_by_key(|(idx, row)| {
            (
                row.iter().filter(|c| is_item_code(c)).count(),
                std::cmp::Reverse(*idx),
            )
        })
        .map_or(0, |(idx, _)| idx);

    let frequency_row = records.get(header + 1).is_some_and(|row| {
        row.iter()
            .any(|c| normalize_identifier(c) == "frequency")
    });
    (header, if frequency_row { header + 2 } else { header + 1 })
}

impl DataPort for CsvAdapter {
    fn load_daily(&self) -> Result<DailyTable, GaptraderError> {
        let records = self.read_records()?;
        if records.is_empty() {
            return DailyTable::new(Vec::new(), Vec::new());
        }

        let (header_row, data_start) = locate_header(&records);
        let columns = ColumnMap::resolve(&records[header_row], &self.options)?;

        let mut drops = DropCounts::default();
        let mut bars = Vec::new();
        let mut data_rows = 0usize;

        for row in records.iter().skip(data_start) {
            if row.iter().all(|c| c.trim().is_empty()) {
                continue;
            }
            data_rows += 1;

            let Some(date) = parse_date(cell(row, columns.date)) else {
                drops.bad_date += 1;
                continue;
            };
            if self.options.drop_weekends && matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
            {
                drops.weekend += 1;
                continue;
            }

            let prices = columns
                .prices
                .map(|idx| idx.and_then(|i| parse_number(cell(row, i))));
            let [Some(open), Some(high), Some(low), Some(close)] = prices else {
                drops.bad_price += 1;
                continue;
            };

            let mut bar = DailyBar::new(date, open, high, low, close);
            bar.turnover = match (columns.turnover, columns.volume) {
                (Some(t), _) => parse_number(cell(row, t)),
                (None, Some(v)) => parse_number(cell(row, v)).map(|vol| close * vol),
                (None, None) => None,
            };
            bar.flows = columns
                .flows
                .iter()
                .map(|(_, idx)| parse_number(cell(row, *idx)))
                .collect();
            bars.push(bar);
        }

        if data_rows > 0 && drops.bad_date == data_rows {
            return Err(GaptraderError::MalformedDate {
                reason: format!(
                    "no parsable dates in column {} of {}",
                    columns.date + 1,
                    self.path.display()
                ),
            });
        }
        if drops.bad_date > 0 {
            warn!(rows = drops.bad_date, "dropped rows with unparsable dates");
        }
        if drops.bad_price > 0 {
            warn!(rows = drops.bad_price, "dropped rows with unparsable OHLC values");
        }
        if drops.weekend > 0 {
            debug!(rows = drops.weekend, "dropped weekend rows");
        }
        if columns.turnover.is_none() && columns.volume.is_some() {
            debug!("turnover column absent, approximating as close x volume");
        }

        bars.sort_by_key(|b| b.date);
        let flow_names: Vec<String> = columns.flows.into_iter().map(|(name, _)| name).collect();
        let table = DailyTable::new(bars, flow_names)?;
        info!(
            path = %self.path.display(),
            bars = table.len(),
            flows = ?table.flow_names(),
            "loaded daily table"
        );
        Ok(table)
    }
}
