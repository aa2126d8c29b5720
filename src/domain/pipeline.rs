//! End-to-end runs: features → signal → simulation → summary.
//!
//! Each stage returns a fresh table; the input table and `Params` are only
//! ever borrowed.

use crate::domain::analysis::{feature_correlation, CorrelationMatrix};
use crate::domain::daily::DailyTable;
use crate::domain::error::GaptraderError;
use crate::domain::features::{compute_features, FeatureRow};
use crate::domain::flow_factor::{run_flow_backtest, trim_warmup, FlowBacktestRow};
use crate::domain::metrics::Summary;
use crate::domain::params::{Params, StrategyVariant};
use crate::domain::path::{BacktestRow, PathSimulator};
use crate::domain::signal::{apply_flow_requirement, opportunity_signal, Direction};
use tracing::info;

/// Feature row plus the position it produced.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRecord {
    pub features: FeatureRow,
    pub direction: Direction,
}

#[derive(Debug, Clone)]
pub struct OpeningProxyRun {
    pub features: Vec<FeatureRecord>,
    pub backtest: Vec<BacktestRow>,
    pub feature_corr: CorrelationMatrix,
    pub summary: Summary,
}

#[derive(Debug, Clone)]
pub struct FlowRankRun {
    pub backtest: Vec<FlowBacktestRow>,
    /// Statistics over the span after the factor-rank warm-up.
    pub summary: Summary,
}

#[derive(Debug, Clone)]
pub enum RunOutput {
    OpeningProxy(OpeningProxyRun),
    FlowRank(FlowRankRun),
}

impl RunOutput {
    pub fn summary(&self) -> &Summary {
        match self {
            RunOutput::OpeningProxy(run) => &run.summary,
            RunOutput::FlowRank(run) => &run.summary,
        }
    }
}

/// Price-action signal settled through the opening session.
pub fn run_opening_proxy(
    table: &DailyTable,
    params: &Params,
) -> Result<OpeningProxyRun, GaptraderError> {
    let features = compute_features(table);
    let directions = opportunity_signal(&features, params);
    let directions = apply_flow_requirement(directions, table, params);

    let simulator = PathSimulator::new(params);
    let backtest = simulator.simulate(table, &directions)?;
    let summary = Summary::compute(&backtest);
    let feature_corr = feature_correlation(&features);

    info!(
        days = backtest.len(),
        trade_days = summary.trade_days,
        mode = %simulator.mode(),
        "opening proxy backtest complete"
    );

    let features = features
        .into_iter()
        .zip(directions)
        .map(|(features, direction)| FeatureRecord {
            features,
            direction,
        })
        .collect();

    Ok(OpeningProxyRun {
        features,
        backtest,
        feature_corr,
        summary,
    })
}

/// Flow-factor rank signal held overnight.
pub fn run_flow_rank(table: &DailyTable, params: &Params) -> Result<FlowRankRun, GaptraderError> {
    let backtest = run_flow_backtest(table, params)?;
    let summary = Summary::compute(&trim_warmup(&backtest));

    info!(
        days = backtest.len(),
        trade_days = summary.trade_days,
        column = %params.flow.column,
        "flow rank backtest complete"
    );

    Ok(FlowRankRun { backtest, summary })
}

pub fn run(table: &DailyTable, params: &Params) -> Result<RunOutput, GaptraderError> {
    match params.variant {
        StrategyVariant::OpeningProxy => run_opening_proxy(table, params).map(RunOutput::OpeningProxy),
        StrategyVariant::FlowRank => run_flow_rank(table, params).map(RunOutput::FlowRank),
    }
}
