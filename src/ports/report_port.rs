//! Result persistence port trait.

use crate::domain::analysis::CorrelationMatrix;
use crate::domain::error::GaptraderError;
use crate::domain::flow_factor::FlowBacktestRow;
use crate::domain::path::BacktestRow;
use crate::domain::pipeline::{FeatureRecord, RunOutput};

pub trait ReportPort {
    fn write_features(&self, rows: &[FeatureRecord]) -> Result<(), GaptraderError>;
    fn write_backtest(&self, rows: &[BacktestRow]) -> Result<(), GaptraderError>;
    fn write_flow_backtest(&self, rows: &[FlowBacktestRow]) -> Result<(), GaptraderError>;
    fn write_correlation(&self, matrix: &CorrelationMatrix) -> Result<(), GaptraderError>;

    /// Default implementation: writes every table the run produced.
    fn write_run(&self, output: &RunOutput) -> Result<(), GaptraderError> {
        match output {
            RunOutput::OpeningProxy(run) => {
                self.write_features(&run.features)?;
                self.write_backtest(&run.backtest)?;
                self.write_correlation(&run.feature_corr)
            }
            RunOutput::FlowRank(run) => self.write_flow_backtest(&run.backtest),
        }
    }
}
