//! Position generation.
//!
//! Every rule here evaluates a condition on information dated `t` and then
//! lags it one day, so the position held on day `t + 1` never sees that
//! day's prices. Days where the condition is not computable are flat.

use crate::domain::daily::DailyTable;
use crate::domain::features::FeatureRow;
use crate::domain::params::{FlowParams, Params};
use crate::domain::rolling::lag;
use std::fmt;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    Short,
    #[default]
    Flat,
    Long,
}

impl Direction {
    pub fn as_i8(self) -> i8 {
        match self {
            Direction::Short => -1,
            Direction::Flat => 0,
            Direction::Long => 1,
        }
    }

    pub fn sign(self) -> f64 {
        f64::from(self.as_i8())
    }

    pub fn is_flat(self) -> bool {
        self == Direction::Flat
    }
}

impl From<i8> for Direction {
    fn from(value: i8) -> Self {
        match value.signum() {
            1 => Direction::Long,
            -1 => Direction::Short,
            _ => Direction::Flat,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_i8())
    }
}

/// Price-action opportunity on day `t`: the open expanded to the take-profit,
/// the downside stayed within the stop, the range was directional, and the
/// overnight gap was small.
pub fn is_opportunity(row: &FeatureRow, params: &Params) -> bool {
    let directional = row
        .dir_ratio_long
        .is_some_and(|r| r >= params.dir_ratio_thresh);
    let small_gap = row.gap.is_some_and(|g| g.abs() <= params.gap_abs_max);

    row.open_to_high >= params.take_profit_opening
        && row.open_to_low >= -params.stop_opening
        && directional
        && small_gap
}

/// Long-only positions from yesterday's opportunity condition.
pub fn opportunity_signal(features: &[FeatureRow], params: &Params) -> Vec<Direction> {
    let raw: Vec<Direction> = features
        .iter()
        .map(|row| {
            if is_opportunity(row, params) {
                Direction::Long
            } else {
                Direction::Flat
            }
        })
        .collect();
    lag(&raw, Direction::Flat)
}

/// Map one factor rank to a same-day position (before lagging).
///
/// Both comparisons are strict: a rank sitting exactly on a threshold is flat.
pub fn rank_to_direction(rank: Option<f64>, flow: &FlowParams) -> Direction {
    match rank {
        Some(r) if r < flow.buy_threshold => Direction::Long,
        Some(r) if r > flow.sell_threshold => Direction::Short,
        _ => Direction::Flat,
    }
}

/// Positions from yesterday's factor rank.
pub fn rank_signal(ranks: &[Option<f64>], flow: &FlowParams) -> Vec<Direction> {
    let raw: Vec<Direction> = ranks
        .iter()
        .map(|&r| rank_to_direction(r, flow))
        .collect();
    lag(&raw, Direction::Flat)
}

/// Flatten every position when mandatory flow columns are absent.
pub fn apply_flow_requirement(
    directions: Vec<Direction>,
    table: &DailyTable,
    params: &Params,
) -> Vec<Direction> {
    if !params.require_flow_data {
        return directions;
    }
    let missing: Vec<&str> = params
        .required_flow_columns
        .iter()
        .filter(|c| !table.has_flow(c))
        .map(String::as_str)
        .collect();
    if missing.is_empty() {
        return directions;
    }
    warn!(
        missing = %missing.join(", "),
        "required flow columns absent; all positions forced flat"
    );
    vec![Direction::Flat; directions.len()]
}
