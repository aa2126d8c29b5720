//! Per-day price-action features.
//!
//! Pure function of the daily table. Values that cannot be computed (first
//! row, zero-range days, warm-up windows) are `None`.

use crate::domain::daily::DailyTable;
use crate::domain::rolling::{rolling_mean, rolling_pct_rank};
use chrono::NaiveDate;
use tracing::debug;

pub const ATR_WINDOW: usize = 20;
pub const VOL_REGIME_WINDOW: usize = 20;

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub date: NaiveDate,
    /// (open - prev_close) / prev_close
    pub gap: Option<f64>,
    /// close-to-close return
    pub ret_1d: Option<f64>,
    pub open_to_high: f64,
    pub open_to_low: f64,
    /// (high - open) / (high - low)
    pub dir_ratio_long: Option<f64>,
    /// (open - low) / (high - low)
    pub dir_ratio_short: Option<f64>,
    pub true_range: f64,
    pub atr20: Option<f64>,
    /// Trailing percentile rank of atr20 / close.
    pub vol_regime: Option<f64>,
}

pub fn compute_features(table: &DailyTable) -> Vec<FeatureRow> {
    let bars = table.bars();
    let mut rows = Vec::with_capacity(bars.len());
    let mut zero_range_days = 0usize;

    for (i, bar) in bars.iter().enumerate() {
        let prev_close = if i > 0 { Some(bars[i - 1].close) } else { None };

        let range = bar.range();
        let (dir_ratio_long, dir_ratio_short) = if range == 0.0 {
            zero_range_days += 1;
            (None, None)
        } else {
            (
                Some((bar.high - bar.open) / range),
                Some((bar.open - bar.low) / range),
            )
        };

        rows.push(FeatureRow {
            date: bar.date,
            gap: prev_close.map(|pc| (bar.open - pc) / pc),
            ret_1d: prev_close.map(|pc| bar.close / pc - 1.0),
            open_to_high: (bar.high - bar.open) / bar.open,
            open_to_low: (bar.low - bar.open) / bar.open,
            dir_ratio_long,
            dir_ratio_short,
            true_range: prev_close.map_or(range, |pc| bar.true_range(pc)),
            atr20: None,
            vol_regime: None,
        });
    }

    let tr: Vec<Option<f64>> = rows.iter().map(|r| Some(r.true_range)).collect();
    let atr = rolling_mean(&tr, ATR_WINDOW);
    let normalized: Vec<Option<f64>> = atr
        .iter()
        .zip(bars)
        .map(|(a, bar)| a.map(|a| a / bar.close))
        .collect();
    let regime = rolling_pct_rank(&normalized, VOL_REGIME_WINDOW);

    for ((row, a), r) in rows.iter_mut().zip(atr).zip(regime) {
        row.atr20 = a;
        row.vol_regime = r;
    }

    if zero_range_days > 0 {
        debug!(zero_range_days, "directional ratios undefined on zero-range days");
    }

    rows
}
