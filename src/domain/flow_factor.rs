//! Supply/demand flow factor and its overnight backtest.
//!
//! A flow column is normalized by trailing mean turnover, ranked over a
//! trailing window, and the lagged rank picks the position held from the
//! previous close to today's open.

use crate::domain::daily::DailyTable;
use crate::domain::error::GaptraderError;
use crate::domain::metrics::compound_equity;
use crate::domain::params::{FlowParams, Params};
use crate::domain::rolling::{rolling_mean, rolling_pct_rank};
use crate::domain::signal::{apply_flow_requirement, rank_signal, Direction};
use chrono::NaiveDate;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct FlowBacktestRow {
    pub date: NaiveDate,
    pub gap: Option<f64>,
    pub flow_ratio: Option<f64>,
    pub factor_rank: Option<f64>,
    pub position: Direction,
    /// position × gap
    pub strategy_ret: Option<f64>,
    pub strategy_net: Option<f64>,
    pub equity: f64,
}

/// Flow amount divided by the trailing mean turnover.
///
/// Missing when the flow is missing or the turnover mean is missing or zero.
pub fn flow_ratio(
    table: &DailyTable,
    column: &str,
    turnover_window: usize,
) -> Result<Vec<Option<f64>>, GaptraderError> {
    let flows = table
        .flow_series(column)
        .ok_or_else(|| GaptraderError::MissingColumns {
            missing: vec![column.to_string()],
            available: table.flow_names().to_vec(),
        })?;
    let turnover_mean = rolling_mean(&table.turnover_series(), turnover_window);

    Ok(flows
        .iter()
        .zip(turnover_mean)
        .map(|(flow, mean)| match (flow, mean) {
            (Some(f), Some(m)) if m != 0.0 => Some(f / m),
            _ => None,
        })
        .collect())
}

/// Trailing percentile rank of the normalized flow.
pub fn factor_ranks(
    table: &DailyTable,
    flow: &FlowParams,
) -> Result<(Vec<Option<f64>>, Vec<Option<f64>>), GaptraderError> {
    let ratio = flow_ratio(table, &flow.column, flow.turnover_window)?;
    let ranks = rolling_pct_rank(&ratio, flow.rolling_window);
    Ok((ratio, ranks))
}

/// Run the overnight flow-rank strategy over the whole table.
pub fn run_flow_backtest(
    table: &DailyTable,
    params: &Params,
) -> Result<Vec<FlowBacktestRow>, GaptraderError> {
    let (ratio, ranks) = factor_ranks(table, &params.flow)?;
    let positions = apply_flow_requirement(rank_signal(&ranks, &params.flow), table, params);
    let bars = table.bars();

    let mut rows = Vec::with_capacity(bars.len());
    for (i, bar) in bars.iter().enumerate() {
        let gap = if i > 0 {
            let pc = bars[i - 1].close;
            Some((bar.open - pc) / pc)
        } else {
            None
        };
        let position = positions[i];
        let strategy_ret = gap.map(|g| position.sign() * g);
        let strategy_net = if position.is_flat() {
            Some(0.0)
        } else {
            strategy_ret.map(|r| r - params.cost)
        };
        rows.push(FlowBacktestRow {
            date: bar.date,
            gap,
            flow_ratio: ratio[i],
            factor_rank: ranks[i],
            position,
            strategy_ret,
            strategy_net,
            equity: 1.0,
        });
    }

    let equity = compound_equity(rows.iter().map(|r| r.strategy_net));
    for (row, e) in rows.iter_mut().zip(equity) {
        row.equity = e;
    }

    let warmup = rows.iter().take_while(|r| r.factor_rank.is_none()).count();
    debug!(
        column = %params.flow.column,
        days = rows.len(),
        warmup,
        "flow factor backtest complete"
    );
    Ok(rows)
}

/// Rows from the first computable factor rank on, with equity recompounded
/// from 1.0 over that span.
pub fn trim_warmup(rows: &[FlowBacktestRow]) -> Vec<FlowBacktestRow> {
    let start = rows
        .iter()
        .position(|r| r.factor_rank.is_some())
        .unwrap_or(rows.len());
    let mut trimmed = rows[start..].to_vec();
    let equity = compound_equity(trimmed.iter().map(|r| r.strategy_net));
    for (row, e) in trimmed.iter_mut().zip(equity) {
        row.equity = e;
    }
    trimmed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::daily::DailyBar;
    use crate::domain::params::ParamSettings;
    use approx::assert_abs_diff_eq;

    fn table(flows: &[Option<f64>], turnover: f64) -> DailyTable {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let bars = flows
            .iter()
            .enumerate()
            .map(|(i, &f)| {
                let price = 100.0 + (i % 4) as f64;
                let mut bar = DailyBar::new(
                    start + chrono::Duration::days(i as i64),
                    price,
                    price + 1.0,
                    price - 1.0,
                    price,
                );
                bar.turnover = Some(turnover);
                bar.flows = vec![f];
                bar
            })
            .collect();
        DailyTable::new(bars, vec!["priv_fund_net".into()]).unwrap()
    }

    fn params(window: usize) -> Params {
        let mut settings = ParamSettings::default();
        settings.flow.rolling_window = window;
        settings.flow.turnover_window = 2;
        settings.cost = 0.0;
        settings.resolve().unwrap()
    }

    #[test]
    fn ratio_normalizes_by_turnover_mean() {
        let t = table(&[Some(10.0), Some(20.0), None], 100.0);
        let ratio = flow_ratio(&t, "priv_fund_net", 2).unwrap();
        assert_eq!(ratio[0], None);
        assert_abs_diff_eq!(ratio[1].unwrap(), 0.2);
        assert_eq!(ratio[2], None);
    }

    #[test]
    fn ratio_zero_turnover_is_missing() {
        let t = table(&[Some(10.0), Some(20.0)], 0.0);
        let ratio = flow_ratio(&t, "priv_fund_net", 1).unwrap();
        assert!(ratio.iter().all(Option::is_none));
    }

    #[test]
    fn missing_flow_column_is_reported() {
        let t = table(&[Some(1.0)], 1.0);
        let err = flow_ratio(&t, "foreign_net", 1).unwrap_err();
        match err {
            GaptraderError::MissingColumns { missing, available } => {
                assert_eq!(missing, vec!["foreign_net".to_string()]);
                assert_eq!(available, vec!["priv_fund_net".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn position_follows_previous_rank() {
        // ranks over window 3 (turnover window 2 delays ratios by one day)
        let flows = [Some(5.0), Some(5.0), Some(4.0), Some(3.0), Some(9.0), Some(1.0)];
        let t = table(&flows, 100.0);
        let p = params(3);
        let rows = run_flow_backtest(&t, &p).unwrap();

        for i in 1..rows.len() {
            let expected = crate::domain::signal::rank_to_direction(rows[i - 1].factor_rank, &p.flow);
            assert_eq!(rows[i].position, expected);
        }
        assert_eq!(rows[0].position, Direction::Flat);
    }

    #[test]
    fn insufficient_history_is_flat() {
        let flows: Vec<Option<f64>> = (0..10).map(|i| Some(i as f64)).collect();
        let t = table(&flows, 100.0);
        let rows = run_flow_backtest(&t, &params(60)).unwrap();
        assert!(rows.iter().all(|r| r.factor_rank.is_none()));
        assert!(rows.iter().all(|r| r.position == Direction::Flat));
        assert!(rows.iter().all(|r| r.equity == 1.0));
    }

    #[test]
    fn absent_required_flows_keep_every_day_flat() {
        let flows: Vec<Option<f64>> = (0..30)
            .map(|i| Some((i + 1) as f64 * if i % 2 == 0 { 1.0 } else { -1.0 }))
            .collect();
        let t = table(&flows, 100.0);
        let mut settings = ParamSettings::default();
        settings.flow.rolling_window = 5;
        settings.flow.turnover_window = 2;

        let ungated = run_flow_backtest(&t, &settings.clone().resolve().unwrap()).unwrap();
        assert!(ungated.iter().any(|r| !r.position.is_flat()));

        settings.require_flow_data = true;
        let rows = run_flow_backtest(&t, &settings.resolve().unwrap()).unwrap();
        assert!(rows.iter().all(|r| r.position.is_flat()));
        assert!(rows.iter().all(|r| r.strategy_net == Some(0.0) || r.strategy_net.is_none()));
        assert_eq!(rows.last().unwrap().equity, 1.0);
    }

    #[test]
    fn present_required_flows_leave_positions_alone() {
        let flows: Vec<Option<f64>> = (0..30)
            .map(|i| Some((i + 1) as f64 * if i % 2 == 0 { 1.0 } else { -1.0 }))
            .collect();
        let t = table(&flows, 100.0);
        let mut settings = ParamSettings::default();
        settings.flow.rolling_window = 5;
        settings.flow.turnover_window = 2;
        settings.require_flow_data = true;
        settings.required_flow_columns = vec!["priv_fund_net".into()];

        let rows = run_flow_backtest(&t, &settings.resolve().unwrap()).unwrap();
        assert!(rows.iter().any(|r| !r.position.is_flat()));
    }

    #[test]
    fn warmup_trim_reseeds_equity() {
        let flows = [Some(5.0), Some(5.0), Some(4.0), Some(3.0), Some(9.0), Some(1.0)];
        let t = table(&flows, 100.0);
        let rows = run_flow_backtest(&t, &params(3)).unwrap();
        let trimmed = trim_warmup(&rows);

        let first_ranked = rows.iter().position(|r| r.factor_rank.is_some()).unwrap();
        assert_eq!(trimmed.len(), rows.len() - first_ranked);
        let first_net = trimmed[0].strategy_net.unwrap_or(0.0);
        assert_abs_diff_eq!(trimmed[0].equity, 1.0 + first_net);
    }

    #[test]
    fn warmup_trim_of_unranked_series_is_empty() {
        let flows: Vec<Option<f64>> = (0..3).map(|i| Some(i as f64)).collect();
        let rows = run_flow_backtest(&table(&flows, 100.0), &params(60)).unwrap();
        assert!(trim_warmup(&rows).is_empty());
    }
}
