//! Equity compounding and summary statistics.

use crate::domain::signal::Direction;
use chrono::NaiveDate;

const CALENDAR_DAYS_PER_YEAR: f64 = 365.0;

/// Compound daily net returns from a 1.0 baseline. Missing returns are flat days.
pub fn compound_equity<I>(pnl_net: I) -> Vec<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let mut equity = 1.0_f64;
    pnl_net
        .into_iter()
        .map(|r| {
            equity *= 1.0 + r.unwrap_or(0.0);
            equity
        })
        .collect()
}

/// A simulated day as seen by the summary statistics.
pub trait DailyOutcome {
    fn date(&self) -> NaiveDate;
    fn position(&self) -> Direction;
    fn net_return(&self) -> Option<f64>;
    fn equity(&self) -> f64;
}

impl DailyOutcome for crate::domain::path::BacktestRow {
    fn date(&self) -> NaiveDate {
        self.date
    }
    fn position(&self) -> Direction {
        self.direction
    }
    fn net_return(&self) -> Option<f64> {
        self.pnl_net
    }
    fn equity(&self) -> f64 {
        self.equity
    }
}

impl DailyOutcome for crate::domain::flow_factor::FlowBacktestRow {
    fn date(&self) -> NaiveDate {
        self.date
    }
    fn position(&self) -> Direction {
        self.position
    }
    fn net_return(&self) -> Option<f64> {
        self.strategy_net
    }
    fn equity(&self) -> f64 {
        self.equity
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub total_return: f64,
    /// `None` when the span covers no calendar time.
    pub cagr: Option<f64>,
    /// Most negative equity / running peak − 1, so always ≤ 0.
    pub max_drawdown: f64,
    pub trade_days: usize,
    pub winning_days: usize,
    /// Zero when there were no trade days.
    pub win_rate: f64,
}

impl Summary {
    pub fn compute<T: DailyOutcome>(rows: &[T]) -> Self {
        let (first, last) = match (rows.first(), rows.last()) {
            (Some(f), Some(l)) => (f, l),
            _ => {
                return Summary {
                    start_date: None,
                    end_date: None,
                    total_return: 0.0,
                    cagr: None,
                    max_drawdown: 0.0,
                    trade_days: 0,
                    winning_days: 0,
                    win_rate: 0.0,
                };
            }
        };

        let growth = last.equity() / first.equity();
        let total_return = growth - 1.0;

        let elapsed = (last.date() - first.date()).num_days();
        let cagr = if elapsed > 0 {
            Some(growth.powf(CALENDAR_DAYS_PER_YEAR / elapsed as f64) - 1.0)
        } else {
            None
        };

        let trades = rows.iter().filter(|r| !r.position().is_flat());
        let (trade_days, winning_days) = trades.fold((0usize, 0usize), |(n, w), r| {
            let won = r.net_return().is_some_and(|p| p > 0.0);
            (n + 1, w + usize::from(won))
        });
        let win_rate = if trade_days > 0 {
            winning_days as f64 / trade_days as f64
        } else {
            0.0
        };

        Summary {
            start_date: Some(first.date()),
            end_date: Some(last.date()),
            total_return,
            cagr,
            max_drawdown: max_drawdown(rows.iter().map(|r| r.equity())),
            trade_days,
            winning_days,
            win_rate,
        }
    }
}

fn max_drawdown<I: IntoIterator<Item = f64>>(equity: I) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;
    for e in equity {
        peak = peak.max(e);
        if peak > 0.0 {
            worst = worst.min(e / peak - 1.0);
        }
    }
    worst
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::path::BacktestRow;
    use approx::assert_abs_diff_eq;

    fn rows(pnl: &[(i8, f64)]) -> Vec<BacktestRow> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let equity = compound_equity(pnl.iter().map(|&(_, p)| Some(p)));
        pnl.iter()
            .zip(equity)
            .enumerate()
            .map(|(i, (&(d, p), e))| BacktestRow {
                date: start + chrono::Duration::days(i as i64),
                direction: Direction::from(d),
                pnl_overnight: Some(p),
                pnl_opening: 0.0,
                pnl_net: Some(p),
                equity: e,
            })
            .collect()
    }

    #[test]
    fn compounding_from_unit_seed() {
        let eq = compound_equity([Some(0.01), Some(-0.02), Some(0.0)]);
        assert_abs_diff_eq!(eq[0], 1.01, epsilon = 1e-12);
        assert_abs_diff_eq!(eq[1], 0.9898, epsilon = 1e-12);
        assert_abs_diff_eq!(eq[2], 0.9898, epsilon = 1e-12);
    }

    #[test]
    fn compounding_treats_missing_as_flat() {
        let eq = compound_equity([None, Some(0.1), None]);
        assert_abs_diff_eq!(eq[0], 1.0);
        assert_abs_diff_eq!(eq[1], 1.1, epsilon = 1e-12);
        assert_abs_diff_eq!(eq[2], 1.1, epsilon = 1e-12);
    }

    #[test]
    fn empty_summary() {
        let s = Summary::compute::<BacktestRow>(&[]);
        assert_eq!(s.trade_days, 0);
        assert_eq!(s.cagr, None);
        assert_eq!(s.win_rate, 0.0);
    }

    #[test]
    fn total_return_relative_to_first_row() {
        let s = Summary::compute(&rows(&[(0, 0.0), (1, 0.1), (1, 0.1)]));
        assert_abs_diff_eq!(s.total_return, 0.21, epsilon = 1e-12);
    }

    #[test]
    fn cagr_over_one_year() {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let mut r = rows(&[(0, 0.0), (1, 0.21)]);
        r[0].date = start;
        r[1].date = start + chrono::Duration::days(365);
        let s = Summary::compute(&r);
        assert_abs_diff_eq!(s.cagr.unwrap(), 0.21, epsilon = 1e-12);
    }

    #[test]
    fn cagr_relative_to_first_row_equity() {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let mut r = rows(&[(1, 0.1), (1, 0.21)]);
        r[0].date = start;
        r[1].date = start + chrono::Duration::days(365);
        let s = Summary::compute(&r);
        assert_abs_diff_eq!(s.total_return, 0.21, epsilon = 1e-12);
        assert_abs_diff_eq!(s.cagr.unwrap(), s.total_return, epsilon = 1e-12);
    }

    #[test]
    fn cagr_unavailable_for_single_day() {
        let s = Summary::compute(&rows(&[(1, 0.05)]));
        assert_eq!(s.cagr, None);
    }

    #[test]
    fn drawdown_from_running_peak() {
        let dd = max_drawdown([1.0, 1.1, 0.9, 0.95, 0.88, 1.0]);
        assert_abs_diff_eq!(dd, 0.88 / 1.1 - 1.0, epsilon = 1e-12);
        assert_eq!(max_drawdown([1.0, 1.1, 1.2]), 0.0);
    }

    #[test]
    fn win_rate_counts_traded_days_only() {
        let s = Summary::compute(&rows(&[
            (0, 0.0),
            (1, 0.01),
            (-1, -0.02),
            (0, 0.0),
            (1, 0.005),
            (1, 0.0),
        ]));
        assert_eq!(s.trade_days, 4);
        assert_eq!(s.winning_days, 2);
        assert_abs_diff_eq!(s.win_rate, 0.5);
    }

    #[test]
    fn win_rate_zero_without_trades() {
        let s = Summary::compute(&rows(&[(0, 0.0), (0, 0.0)]));
        assert_eq!(s.trade_days, 0);
        assert_eq!(s.win_rate, 0.0);
    }
}
