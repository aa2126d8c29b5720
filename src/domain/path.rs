//! Opening-session payoff resolution.
//!
//! Only the day's open, high, low and close are known, so when the range
//! reaches both the take-profit and the stop the order in which they traded
//! is ambiguous. [`PathDependencyMode`] settles it:
//!
//! - `Optimistic`: take-profit is checked first, then the stop.
//! - `Conservative`: the stop is checked first, then the take-profit.
//! - `Trend`: levels are ignored and the position is closed at the close.
//!
//! Optimistic and conservative only disagree on days where both levels are
//! reachable. A level that is hit realizes exactly its distance from the open;
//! otherwise the position is closed at the close.

use crate::domain::daily::{DailyBar, DailyTable};
use crate::domain::error::GaptraderError;
use crate::domain::metrics::compound_equity;
use crate::domain::params::{Params, PathDependencyMode};
use crate::domain::signal::Direction;
use chrono::NaiveDate;
use tracing::debug;

/// Moves from the day's open, as fractions of the open.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Excursions {
    pub open_to_high: f64,
    pub open_to_low: f64,
    pub open_to_close: f64,
}

impl Excursions {
    pub fn of(bar: &DailyBar) -> Self {
        Excursions {
            open_to_high: (bar.high - bar.open) / bar.open,
            open_to_low: (bar.low - bar.open) / bar.open,
            open_to_close: (bar.close - bar.open) / bar.open,
        }
    }
}

/// Which of the two levels the day's range reached for a given side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelHits {
    pub take_profit: bool,
    pub stop: bool,
}

impl LevelHits {
    pub fn for_side(ex: &Excursions, direction: Direction, take_profit: f64, stop: f64) -> Self {
        match direction {
            Direction::Long => LevelHits {
                take_profit: ex.open_to_high >= take_profit,
                stop: ex.open_to_low <= -stop,
            },
            Direction::Short => LevelHits {
                take_profit: ex.open_to_low <= -take_profit,
                stop: ex.open_to_high >= stop,
            },
            Direction::Flat => LevelHits {
                take_profit: false,
                stop: false,
            },
        }
    }

    pub fn is_ambiguous(&self) -> bool {
        self.take_profit && self.stop
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestRow {
    pub date: NaiveDate,
    pub direction: Direction,
    /// direction × (open / prev_close − 1); missing on the first day.
    pub pnl_overnight: Option<f64>,
    pub pnl_opening: f64,
    /// Gross P&L less cost on traded days, zero on flat days.
    pub pnl_net: Option<f64>,
    pub equity: f64,
}

/// Applies one resolution policy with fixed levels and cost.
#[derive(Debug, Clone, Copy)]
pub struct PathSimulator {
    mode: PathDependencyMode,
    take_profit: f64,
    stop: f64,
    cost: f64,
}

impl PathSimulator {
    pub fn new(params: &Params) -> Self {
        PathSimulator {
            mode: params.path_mode,
            take_profit: params.take_profit_opening,
            stop: params.stop_opening,
            cost: params.cost,
        }
    }

    pub fn mode(&self) -> PathDependencyMode {
        self.mode
    }

    /// P&L of the opening session for one day and side.
    pub fn opening_pnl(&self, bar: &DailyBar, direction: Direction) -> f64 {
        if direction.is_flat() {
            return 0.0;
        }
        let ex = Excursions::of(bar);
        let at_close = direction.sign() * ex.open_to_close;
        let hits = LevelHits::for_side(&ex, direction, self.take_profit, self.stop);
        let gain = self.take_profit;
        let loss = -self.stop;

        match self.mode {
            PathDependencyMode::Trend => at_close,
            PathDependencyMode::Optimistic => {
                if hits.take_profit {
                    gain
                } else if hits.stop {
                    loss
                } else {
                    at_close
                }
            }
            PathDependencyMode::Conservative => {
                if hits.stop {
                    loss
                } else if hits.take_profit {
                    gain
                } else {
                    at_close
                }
            }
        }
    }

    /// Gross overnight and opening P&L less cost; flat days are exactly zero.
    pub fn net_pnl(
        &self,
        direction: Direction,
        pnl_overnight: Option<f64>,
        pnl_opening: f64,
    ) -> Option<f64> {
        if direction.is_flat() {
            return Some(0.0);
        }
        pnl_overnight.map(|overnight| overnight + pnl_opening - self.cost)
    }

    /// Simulate every day of `table` with the aligned `directions`.
    pub fn simulate(
        &self,
        table: &DailyTable,
        directions: &[Direction],
    ) -> Result<Vec<BacktestRow>, GaptraderError> {
        let bars = table.bars();
        if bars.len() != directions.len() {
            return Err(GaptraderError::Misaligned {
                bars: bars.len(),
                signals: directions.len(),
            });
        }

        let mut rows = Vec::with_capacity(bars.len());
        let mut ambiguous_days = 0usize;

        for (i, (bar, &direction)) in bars.iter().zip(directions).enumerate() {
            let prev_close = if i > 0 { Some(bars[i - 1].close) } else { None };
            let pnl_overnight = prev_close.map(|pc| direction.sign() * (bar.open / pc - 1.0));

            if !direction.is_flat()
                && LevelHits::for_side(&Excursions::of(bar), direction, self.take_profit, self.stop)
                    .is_ambiguous()
            {
                ambiguous_days += 1;
            }

            let pnl_opening = self.opening_pnl(bar, direction);
            rows.push(BacktestRow {
                date: bar.date,
                direction,
                pnl_overnight,
                pnl_opening,
                pnl_net: self.net_pnl(direction, pnl_overnight, pnl_opening),
                equity: 1.0,
            });
        }

        let equity = compound_equity(rows.iter().map(|r| r.pnl_net));
        for (row, e) in rows.iter_mut().zip(equity) {
            row.equity = e;
        }

        debug!(
            mode = %self.mode,
            days = rows.len(),
            ambiguous_days,
            "opening session simulated"
        );
        Ok(rows)
    }
}
