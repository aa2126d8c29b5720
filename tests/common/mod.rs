#![allow(dead_code)]

use chrono::NaiveDate;
use gaptrader::domain::daily::{DailyBar, DailyTable};
use gaptrader::domain::error::GaptraderError;
use gaptrader::domain::params::{ParamSettings, Params, PathDependencyMode};
use gaptrader::ports::data_port::DataPort;

pub struct MockDataPort {
    pub bars: Vec<DailyBar>,
    pub flow_names: Vec<String>,
    pub error: Option<String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            bars: Vec::new(),
            flow_names: Vec::new(),
            error: None,
        }
    }

    pub fn with_bars(mut self, bars: Vec<DailyBar>) -> Self {
        self.bars = bars;
        self
    }

    pub fn with_flows(mut self, names: &[&str]) -> Self {
        self.flow_names = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn with_error(mut self, reason: &str) -> Self {
        self.error = Some(reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn load_daily(&self) -> Result<DailyTable, GaptraderError> {
        if let Some(reason) = &self.error {
            return Err(GaptraderError::Data {
                reason: reason.clone(),
            });
        }
        DailyTable::new(self.bars.clone(), self.flow_names.clone())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn day(i: usize) -> NaiveDate {
    date(2024, 1, 1) + chrono::Duration::days(i as i64)
}

pub fn make_bar(i: usize, open: f64, high: f64, low: f64, close: f64) -> DailyBar {
    DailyBar::new(day(i), open, high, low, close)
}

pub fn table_from_ohlc(ohlc: &[(f64, f64, f64, f64)]) -> DailyTable {
    let bars = ohlc
        .iter()
        .enumerate()
        .map(|(i, &(o, h, l, c))| make_bar(i, o, h, l, c))
        .collect();
    DailyTable::from_bars(bars).unwrap()
}

/// Bars carrying one flow column and constant turnover.
pub fn flow_table(name: &str, flows: &[f64], turnover: f64) -> DailyTable {
    let bars = flows
        .iter()
        .enumerate()
        .map(|(i, &f)| {
            let price = 100.0 + (i % 5) as f64 * 0.1;
            let mut bar = make_bar(i, price, price + 0.5, price - 0.5, price + 0.05);
            bar.turnover = Some(turnover);
            bar.flows = vec![Some(f)];
            bar
        })
        .collect();
    DailyTable::new(bars, vec![name.to_string()]).unwrap()
}

pub fn params_with_mode(mode: PathDependencyMode) -> Params {
    ParamSettings {
        path_dependency_mode: Some(mode.to_string()),
        ..ParamSettings::default()
    }
    .resolve()
    .unwrap()
}

pub fn default_params() -> Params {
    ParamSettings::default().resolve().unwrap()
}
