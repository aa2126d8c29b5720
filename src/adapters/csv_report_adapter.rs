//! CSV report adapter implementing ReportPort.
//!
//! One file per table in the output directory. Missing values are empty
//! cells and dates are `YYYY-MM-DD`.

use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::analysis::CorrelationMatrix;
use crate::domain::error::GaptraderError;
use crate::domain::flow_factor::FlowBacktestRow;
use crate::domain::path::BacktestRow;
use crate::domain::pipeline::FeatureRecord;
use crate::ports::report_port::ReportPort;
use chrono::NaiveDate;
use tracing::info;

pub const FEATURES_FILE: &str = "features_output.csv";
pub const BACKTEST_FILE: &str = "backtest_output.csv";
pub const FLOW_BACKTEST_FILE: &str = "final_strategy_result.csv";
pub const CORRELATION_FILE: &str = "feature_corr.csv";

pub struct CsvReportAdapter {
    output_dir: PathBuf,
}

impl CsvReportAdapter {
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn write_table(
        &self,
        file: &str,
        header: &[&str],
        rows: impl IntoIterator<Item = Vec<String>>,
    ) -> Result<(), GaptraderError> {
        fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(file);
        let mut writer = csv::Writer::from_path(&path).map_err(std::io::Error::from)?;
        writer.write_record(header).map_err(std::io::Error::from)?;
        let mut count = 0usize;
        for row in rows {
            writer.write_record(&row).map_err(std::io::Error::from)?;
            count += 1;
        }
        writer.flush()?;
        info!(path = %path.display(), rows = count, "wrote report");
        Ok(())
    }
}

fn date_cell(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn num(value: f64) -> String {
    if value.is_finite() {
        value.to_string()
    } else {
        String::new()
    }
}

fn opt(value: Option<f64>) -> String {
    value.map(num).unwrap_or_default()
}

impl ReportPort for CsvReportAdapter {
    fn write_features(&self, rows: &[FeatureRecord]) -> Result<(), GaptraderError> {
        self.write_table(
            FEATURES_FILE,
            &[
                "date",
                "gap",
                "ret_1d",
                "open_to_high",
                "open_to_low",
                "dir_ratio_long",
                "dir_ratio_short",
                "true_range",
                "atr20",
                "vol_regime",
                "direction",
            ],
            rows.iter().map(|r| {
                let f = &r.features;
                vec![
                    date_cell(f.date),
                    opt(f.gap),
                    opt(f.ret_1d),
                    num(f.open_to_high),
                    num(f.open_to_low),
                    opt(f.dir_ratio_long),
                    opt(f.dir_ratio_short),
                    num(f.true_range),
                    opt(f.atr20),
                    opt(f.vol_regime),
                    r.direction.as_i8().to_string(),
                ]
            }),
        )
    }

    fn write_backtest(&self, rows: &[BacktestRow]) -> Result<(), GaptraderError> {
        self.write_table(
            BACKTEST_FILE,
            &[
                "date",
                "position",
                "pnl_overnight",
                "pnl_opening",
                "pnl_net",
                "equity",
            ],
            rows.iter().map(|r| {
                vec![
                    date_cell(r.date),
                    r.direction.as_i8().to_string(),
                    opt(r.pnl_overnight),
                    num(r.pnl_opening),
                    opt(r.pnl_net),
                    num(r.equity),
                ]
            }),
        )
    }

    fn write_flow_backtest(&self, rows: &[FlowBacktestRow]) -> Result<(), GaptraderError> {
        self.write_table(
            FLOW_BACKTEST_FILE,
            &[
                "date",
                "gap",
                "flow_ratio",
                "factor_rank",
                "position",
                "strategy_ret",
                "strategy_net",
                "equity",
            ],
            rows.iter().map(|r| {
                vec![
                    date_cell(r.date),
                    opt(r.gap),
                    opt(r.flow_ratio),
                    opt(r.factor_rank),
                    r.position.as_i8().to_string(),
                    opt(r.strategy_ret),
                    opt(r.strategy_net),
                    num(r.equity),
                ]
            }),
        )
    }

    fn write_correlation(&self, matrix: &CorrelationMatrix) -> Result<(), GaptraderError> {
        let mut header = vec![""];
        header.extend(matrix.labels.iter().map(String::as_str));
        self.write_table(
            CORRELATION_FILE,
            &header,
            matrix.labels.iter().zip(&matrix.values).map(|(label, row)| {
                std::iter::once(label.clone())
                    .chain(row.iter().map(|v| opt(*v)))
                    .collect()
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::features::FeatureRow;
    use crate::domain::signal::Direction;
    use tempfile::TempDir;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn read(dir: &TempDir, file: &str) -> Vec<String> {
        fs::read_to_string(dir.path().join(file))
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn backtest_rows_with_empty_missing_cells() {
        let dir = TempDir::new().unwrap();
        let adapter = CsvReportAdapter::new(dir.path());
        let rows = vec![
            BacktestRow {
                date: day(15),
                direction: Direction::Flat,
                pnl_overnight: None,
                pnl_opening: 0.0,
                pnl_net: None,
                equity: 1.0,
            },
            BacktestRow {
                date: day(16),
                direction: Direction::Short,
                pnl_overnight: Some(0.01),
                pnl_opening: -0.0015,
                pnl_net: Some(0.0083),
                equity: 1.0083,
            },
        ];
        adapter.write_backtest(&rows).unwrap();

        let lines = read(&dir, BACKTEST_FILE);
        assert_eq!(lines[0], "date,position,pnl_overnight,pnl_opening,pnl_net,equity");
        assert_eq!(lines[1], "2024-01-15,0,,0,,1");
        assert_eq!(lines[2], "2024-01-16,-1,0.01,-0.0015,0.0083,1.0083");
    }

    #[test]
    fn features_include_direction_column() {
        let dir = TempDir::new().unwrap();
        let adapter = CsvReportAdapter::new(dir.path().join("nested"));
        let record = FeatureRecord {
            features: FeatureRow {
                date: day(15),
                gap: None,
                ret_1d: None,
                open_to_high: 0.5,
                open_to_low: -0.25,
                dir_ratio_long: Some(0.75),
                dir_ratio_short: Some(0.25),
                true_range: 2.0,
                atr20: None,
                vol_regime: None,
            },
            direction: Direction::Long,
        };
        adapter.write_features(&[record]).unwrap();

        let lines = read(&dir, "nested/features_output.csv");
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(",direction"));
        assert_eq!(lines[1], "2024-01-15,,,0.5,-0.25,0.75,0.25,2,,,1");
    }

    #[test]
    fn correlation_matrix_has_label_column() {
        let dir = TempDir::new().unwrap();
        let adapter = CsvReportAdapter::new(dir.path());
        let matrix = CorrelationMatrix {
            labels: vec!["gap".into(), "open_to_high".into()],
            values: vec![vec![Some(1.0), None], vec![None, Some(1.0)]],
        };
        adapter.write_correlation(&matrix).unwrap();

        let lines = read(&dir, CORRELATION_FILE);
        assert_eq!(lines[0], ",gap,open_to_high");
        assert_eq!(lines[1], "gap,1,");
        assert_eq!(lines[2], "open_to_high,,1");
    }

    #[test]
    fn flow_backtest_file_name() {
        let dir = TempDir::new().unwrap();
        let adapter = CsvReportAdapter::new(dir.path());
        let row = FlowBacktestRow {
            date: day(15),
            gap: Some(-0.002),
            flow_ratio: Some(0.3),
            factor_rank: Some(0.05),
            position: Direction::Long,
            strategy_ret: Some(-0.002),
            strategy_net: Some(-0.0022),
            equity: 0.9978,
        };
        adapter.write_flow_backtest(&[row]).unwrap();

        let lines = read(&dir, FLOW_BACKTEST_FILE);
        assert_eq!(
            lines[0],
            "date,gap,flow_ratio,factor_rank,position,strategy_ret,strategy_net,equity"
        );
        assert_eq!(lines[1], "2024-01-15,-0.002,0.3,0.05,1,-0.002,-0.0022,0.9978");
    }
}
