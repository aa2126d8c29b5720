//! Research diagnostics: feature correlations and flow information coefficients.
//!
//! Nothing here feeds the trading signal; the information coefficient uses
//! the next day's gap and is look-ahead by construction.

use crate::domain::daily::DailyTable;
use crate::domain::features::FeatureRow;
use crate::domain::flow_factor::flow_ratio;

pub const CORRELATED_FEATURES: [&str; 4] = ["gap", "open_to_high", "open_to_low", "dir_ratio_long"];

#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    pub labels: Vec<String>,
    /// Row-major; `None` where fewer than two complete pairs exist or a
    /// column has no variance.
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.labels.iter().position(|l| l == a)?;
        let j = self.labels.iter().position(|l| l == b)?;
        self.values[i][j]
    }
}

/// Pearson correlation over pairwise-complete observations.
pub fn pearson(x: &[Option<f64>], y: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y)
        .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
        .filter(|(a, b)| a.is_finite() && b.is_finite())
        .collect();
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (a, b) in &pairs {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some(cov / (var_x.sqrt() * var_y.sqrt()))
}

fn feature_column(features: &[FeatureRow], name: &str) -> Vec<Option<f64>> {
    features
        .iter()
        .map(|r| match name {
            "gap" => r.gap,
            "open_to_high" => Some(r.open_to_high),
            "open_to_low" => Some(r.open_to_low),
            "dir_ratio_long" => r.dir_ratio_long,
            _ => None,
        })
        .collect()
}

pub fn feature_correlation(features: &[FeatureRow]) -> CorrelationMatrix {
    let columns: Vec<Vec<Option<f64>>> = CORRELATED_FEATURES
        .iter()
        .map(|name| feature_column(features, name))
        .collect();
    let values = columns
        .iter()
        .map(|a| columns.iter().map(|b| pearson(a, b)).collect())
        .collect();
    CorrelationMatrix {
        labels: CORRELATED_FEATURES.iter().map(|s| s.to_string()).collect(),
        values,
    }
}

/// Gap from today's close to tomorrow's open, aligned on today.
pub fn next_gap(table: &DailyTable) -> Vec<Option<f64>> {
    let bars = table.bars();
    (0..bars.len())
        .map(|i| {
            bars.get(i + 1)
                .map(|next| (next.open - bars[i].close) / bars[i].close)
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct InformationCoefficient {
    pub column: String,
    pub ic: Option<f64>,
    pub observations: usize,
}

/// Correlation of each normalized flow with the next day's gap, strongest first.
pub fn flow_information_coefficients(
    table: &DailyTable,
    turnover_window: usize,
) -> Vec<InformationCoefficient> {
    let target = next_gap(table);
    let mut out: Vec<InformationCoefficient> = table
        .flow_names()
        .iter()
        .filter_map(|name| {
            let ratio = flow_ratio(table, name, turnover_window).ok()?;
            let observations = ratio
                .iter()
                .zip(&target)
                .filter(|(r, t)| r.is_some() && t.is_some())
                .count();
            Some(InformationCoefficient {
                column: name.clone(),
                ic: pearson(&ratio, &target),
                observations,
            })
        })
        .collect();

    out.sort_by(|a, b| {
        let ka = a.ic.map_or(-1.0, f64::abs);
        let kb = b.ic.map_or(-1.0, f64::abs);
        kb.total_cmp(&ka)
    });
    out
}
