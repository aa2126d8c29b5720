//! Data access port trait.

use crate::domain::daily::DailyTable;
use crate::domain::error::GaptraderError;

/// Source of an already-normalized daily table.
///
/// Implementations map vendor headers to canonical names and must fail with
/// `GaptraderError::MissingColumns` when open/high/low/close cannot be
/// resolved.
pub trait DataPort {
    fn load_daily(&self) -> Result<DailyTable, GaptraderError>;
}
