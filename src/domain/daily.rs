//! Daily bar table consumed by the pipeline.

use crate::domain::error::GaptraderError;
use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub turnover: Option<f64>,
    /// Net-flow amounts, indexed like [`DailyTable::flow_names`].
    pub flows: Vec<Option<f64>>,
}

impl DailyBar {
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64) -> Self {
        DailyBar {
            date,
            open,
            high,
            low,
            close,
            turnover: None,
            flows: Vec::new(),
        }
    }

    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }

    pub fn range(&self) -> f64 {
        self.high - self.low
    }
}

/// Ascending, duplicate-free sequence of daily bars.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyTable {
    bars: Vec<DailyBar>,
    flow_names: Vec<String>,
}

impl DailyTable {
    /// Build a table, rejecting out-of-order or duplicate dates.
    ///
    /// Bars whose flow vector is shorter than `flow_names` are padded with
    /// missing values.
    pub fn new(mut bars: Vec<DailyBar>, flow_names: Vec<String>) -> Result<Self, GaptraderError> {
        for pair in bars.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(GaptraderError::UnorderedDates {
                    previous: pair[0].date,
                    date: pair[1].date,
                });
            }
        }
        for bar in &mut bars {
            if bar.flows.len() < flow_names.len() {
                bar.flows.resize(flow_names.len(), None);
            }
        }
        Ok(DailyTable { bars, flow_names })
    }

    pub fn from_bars(bars: Vec<DailyBar>) -> Result<Self, GaptraderError> {
        Self::new(bars, Vec::new())
    }

    pub fn bars(&self) -> &[DailyBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn flow_names(&self) -> &[String] {
        &self.flow_names
    }

    pub fn has_flow(&self, name: &str) -> bool {
        self.flow_index(name).is_some()
    }

    fn flow_index(&self, name: &str) -> Option<usize> {
        self.flow_names.iter().position(|n| n == name)
    }

    /// Values of one flow column, aligned with the bars.
    pub fn flow_series(&self, name: &str) -> Option<Vec<Option<f64>>> {
        let idx = self.flow_index(name)?;
        Some(
            self.bars
                .iter()
                .map(|b| b.flows.get(idx).copied().flatten())
                .collect(),
        )
    }

    pub fn turnover_series(&self) -> Vec<Option<f64>> {
        self.bars.iter().map(|b| b.turnover).collect()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.bars.first().map(|b| b.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }
}
