//! Domain error types.

use chrono::NaiveDate;

/// Maximum number of found identifiers echoed back in a `MissingColumns` error.
const AVAILABLE_PREVIEW: usize = 20;

/// Top-level error type for gaptrader.
#[derive(Debug, thiserror::Error)]
pub enum GaptraderError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("unsupported path_dependency_mode: {mode} (expected optimistic, conservative or trend)")]
    UnsupportedMode { mode: String },

    #[error(
        "missing required columns after mapping: {}. available identifiers (normalized): {}",
        .missing.join(", "),
        preview(.available)
    )]
    MissingColumns {
        missing: Vec<String>,
        available: Vec<String>,
    },

    #[error("malformed date column: {reason}")]
    MalformedDate { reason: String },

    #[error("dates must be strictly increasing: {date} follows {previous}")]
    UnorderedDates { previous: NaiveDate, date: NaiveDate },

    #[error("direction series has {signals} entries but the table has {bars} bars")]
    Misaligned { bars: usize, signals: usize },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl GaptraderError {
    /// Configuration errors are raised before any row is processed.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            GaptraderError::ConfigParse { .. }
                | GaptraderError::ConfigMissing { .. }
                | GaptraderError::ConfigInvalid { .. }
                | GaptraderError::UnsupportedMode { .. }
                | GaptraderError::MissingColumns { .. }
                | GaptraderError::MalformedDate { .. }
        )
    }
}

fn preview(available: &[String]) -> String {
    if available.is_empty() {
        return "(none)".to_string();
    }
    let shown = available
        .iter()
        .take(AVAILABLE_PREVIEW)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    if available.len() > AVAILABLE_PREVIEW {
        format!("{shown}...")
    } else {
        shown
    }
}

impl From<&GaptraderError> for std::process::ExitCode {
    fn from(err: &GaptraderError) -> Self {
        let code: u8 = match err {
            GaptraderError::Io(_) => 1,
            GaptraderError::ConfigParse { .. }
            | GaptraderError::ConfigMissing { .. }
            | GaptraderError::ConfigInvalid { .. }
            | GaptraderError::UnsupportedMode { .. } => 2,
            GaptraderError::MissingColumns { .. }
            | GaptraderError::MalformedDate { .. }
            | GaptraderError::UnorderedDates { .. }
            | GaptraderError::Misaligned { .. } => 3,
            GaptraderError::Data { .. } => 4,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_columns_lists_found_identifiers() {
        let err = GaptraderError::MissingColumns {
            missing: vec!["high".into(), "low".into()],
            available: vec!["open".into(), "close".into(), "i310000600".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("high, low"));
        assert!(msg.contains("open, close, i310000600"));
        assert!(!msg.ends_with("..."));
    }

    #[test]
    fn missing_columns_truncates_long_lists() {
        let available: Vec<String> = (0..25).map(|i| format!("col{i}")).collect();
        let err = GaptraderError::MissingColumns {
            missing: vec!["open".into()],
            available,
        };
        let msg = err.to_string();
        assert!(msg.contains("col19"));
        assert!(!msg.contains("col20"));
        assert!(msg.ends_with("..."));
    }

    #[test]
    fn missing_columns_with_nothing_found() {
        let err = GaptraderError::MissingColumns {
            missing: vec!["open".into()],
            available: vec![],
        };
        assert!(err.to_string().contains("(none)"));
    }

    #[test]
    fn unsupported_mode_is_configuration_error() {
        let err = GaptraderError::UnsupportedMode {
            mode: "bogus".into(),
        };
        assert!(err.is_configuration());
        assert!(err.to_string().contains("bogus"));
        assert!(
            !GaptraderError::Misaligned {
                bars: 3,
                signals: 2
            }
            .is_configuration()
        );
    }
}
