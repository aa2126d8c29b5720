//! Run configuration shared by the signal and path stages.
//!
//! [`ParamSettings`] mirrors the raw configuration surface, including the
//! legacy `optimistic_fill` flag. [`ParamSettings::resolve`] turns it into
//! the immutable [`Params`] exactly once, so an unknown mode string fails
//! before any row is touched.

use crate::domain::error::GaptraderError;
use std::fmt;
use std::str::FromStr;

/// How a day whose range reaches both the take-profit and the stop is settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathDependencyMode {
    /// Take-profit is assumed to trade first.
    Optimistic,
    /// Stop is assumed to trade first.
    Conservative,
    /// Levels are ignored; the position is closed at the day's close.
    Trend,
}

impl PathDependencyMode {
    /// Explicit mode wins; otherwise the legacy boolean picks between
    /// optimistic and conservative.
    pub fn resolve(mode: Option<&str>, optimistic_fill: bool) -> Result<Self, GaptraderError> {
        match mode.map(str::trim).filter(|m| !m.is_empty()) {
            Some(m) => m.parse(),
            None if optimistic_fill => Ok(PathDependencyMode::Optimistic),
            None => Ok(PathDependencyMode::Conservative),
        }
    }
}

impl FromStr for PathDependencyMode {
    type Err = GaptraderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "optimistic" => Ok(PathDependencyMode::Optimistic),
            "conservative" => Ok(PathDependencyMode::Conservative),
            "trend" => Ok(PathDependencyMode::Trend),
            other => Err(GaptraderError::UnsupportedMode {
                mode: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for PathDependencyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathDependencyMode::Optimistic => write!(f, "optimistic"),
            PathDependencyMode::Conservative => write!(f, "conservative"),
            PathDependencyMode::Trend => write!(f, "trend"),
        }
    }
}

/// Which signal/simulation pair a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyVariant {
    /// Price-action opportunity signal settled through the opening session.
    OpeningProxy,
    /// Flow-factor rank signal held overnight only.
    FlowRank,
}

impl FromStr for StrategyVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "opening_proxy" | "opening" => Ok(StrategyVariant::OpeningProxy),
            "flow_rank" | "flow" => Ok(StrategyVariant::FlowRank),
            other => Err(format!(
                "unknown variant '{other}' (expected opening_proxy or flow_rank)"
            )),
        }
    }
}

impl fmt::Display for StrategyVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyVariant::OpeningProxy => write!(f, "opening_proxy"),
            StrategyVariant::FlowRank => write!(f, "flow_rank"),
        }
    }
}

/// Settings for the flow-factor rank variant.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowParams {
    /// Flow column whose normalized ratio is ranked.
    pub column: String,
    pub rolling_window: usize,
    pub buy_threshold: f64,
    pub sell_threshold: f64,
    /// Trailing window of the turnover mean used to normalize flows.
    pub turnover_window: usize,
}

impl Default for FlowParams {
    fn default() -> Self {
        FlowParams {
            column: "priv_fund_net".to_string(),
            rolling_window: 60,
            buy_threshold: 0.10,
            sell_threshold: 0.90,
            turnover_window: 5,
        }
    }
}

/// Raw configuration as read from a config file or built in code.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSettings {
    pub gap_abs_max: f64,
    pub take_profit_opening: f64,
    pub stop_opening: f64,
    pub dir_ratio_thresh: f64,
    pub cost: f64,
    /// Deprecated: consulted only when `path_dependency_mode` is unset.
    pub optimistic_fill: bool,
    pub path_dependency_mode: Option<String>,
    pub require_flow_data: bool,
    pub required_flow_columns: Vec<String>,
    pub variant: StrategyVariant,
    pub flow: FlowParams,
}

impl Default for ParamSettings {
    fn default() -> Self {
        ParamSettings {
            gap_abs_max: 0.01,
            take_profit_opening: 0.003,
            stop_opening: 0.0015,
            dir_ratio_thresh: 0.60,
            cost: 0.0002,
            optimistic_fill: true,
            path_dependency_mode: None,
            require_flow_data: false,
            required_flow_columns: vec!["foreign_net".to_string(), "inst_net".to_string()],
            variant: StrategyVariant::OpeningProxy,
            flow: FlowParams::default(),
        }
    }
}

impl ParamSettings {
    pub fn resolve(self) -> Result<Params, GaptraderError> {
        let path_mode =
            PathDependencyMode::resolve(self.path_dependency_mode.as_deref(), self.optimistic_fill)?;

        check_non_negative("gap_abs_max", self.gap_abs_max)?;
        check_positive("take_profit_opening", self.take_profit_opening)?;
        check_positive("stop_opening", self.stop_opening)?;
        check_non_negative("cost", self.cost)?;
        if !self.dir_ratio_thresh.is_finite() {
            return Err(invalid("params", "dir_ratio_thresh", "must be a finite number"));
        }

        let flow = &self.flow;
        if flow.rolling_window < 2 {
            return Err(invalid("flow", "rolling_window", "must be at least 2"));
        }
        if flow.turnover_window == 0 {
            return Err(invalid("flow", "turnover_window", "must be at least 1"));
        }
        if !(0.0..=1.0).contains(&flow.buy_threshold) || !(0.0..=1.0).contains(&flow.sell_threshold)
        {
            return Err(invalid("flow", "buy_threshold", "thresholds must lie in [0, 1]"));
        }
        if flow.buy_threshold >= flow.sell_threshold {
            return Err(invalid(
                "flow",
                "buy_threshold",
                "buy_threshold must be below sell_threshold",
            ));
        }

        Ok(Params {
            gap_abs_max: self.gap_abs_max,
            take_profit_opening: self.take_profit_opening,
            stop_opening: self.stop_opening,
            dir_ratio_thresh: self.dir_ratio_thresh,
            cost: self.cost,
            path_mode,
            require_flow_data: self.require_flow_data,
            required_flow_columns: self.required_flow_columns,
            variant: self.variant,
            flow: self.flow,
        })
    }
}

/// Validated, immutable run configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Params {
    pub gap_abs_max: f64,
    pub take_profit_opening: f64,
    pub stop_opening: f64,
    pub dir_ratio_thresh: f64,
    pub cost: f64,
    pub path_mode: PathDependencyMode,
    pub require_flow_data: bool,
    pub required_flow_columns: Vec<String>,
    pub variant: StrategyVariant,
    pub flow: FlowParams,
}

fn check_positive(key: &str, value: f64) -> Result<(), GaptraderError> {
    if !(value.is_finite() && value > 0.0) {
        return Err(invalid("params", key, "must be positive"));
    }
    Ok(())
}

fn check_non_negative(key: &str, value: f64) -> Result<(), GaptraderError> {
    if !(value.is_finite() && value >= 0.0) {
        return Err(invalid("params", key, "must be non-negative"));
    }
    Ok(())
}

fn invalid(section: &str, key: &str, reason: &str) -> GaptraderError {
    GaptraderError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}
