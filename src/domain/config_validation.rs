//! Configuration validation.
//!
//! Checks the raw config surface before any data is read. Absent keys are
//! fine (defaults apply); present keys must parse and lie in range.

use crate::domain::error::GaptraderError;
use crate::domain::params::{PathDependencyMode, StrategyVariant};
use crate::ports::config_port::ConfigPort;

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), GaptraderError> {
    validate_variant(config)?;
    validate_fractions(config)?;
    validate_levels(config)?;
    validate_booleans(config)?;
    validate_mode(config)?;
    validate_flow(config)?;
    validate_data(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> GaptraderError {
    GaptraderError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn present(config: &dyn ConfigPort, section: &str, key: &str) -> Option<String> {
    config
        .get_string(section, key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn number(config: &dyn ConfigPort, section: &str, key: &str) -> Result<Option<f64>, GaptraderError> {
    match present(config, section, key) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Some)
            .ok_or_else(|| invalid(section, key, format!("'{raw}' is not a number"))),
    }
}

fn integer(config: &dyn ConfigPort, section: &str, key: &str) -> Result<Option<i64>, GaptraderError> {
    match present(config, section, key) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<i64>()
            .map(Some)
            .map_err(|_| invalid(section, key, format!("'{raw}' is not an integer"))),
    }
}

fn validate_variant(config: &dyn ConfigPort) -> Result<(), GaptraderError> {
    if let Some(raw) = present(config, "strategy", "variant") {
        raw.parse::<StrategyVariant>()
            .map_err(|reason| invalid("strategy", "variant", reason))?;
    }
    Ok(())
}

fn validate_fractions(config: &dyn ConfigPort) -> Result<(), GaptraderError> {
    for key in ["gap_abs_max", "cost"] {
        if let Some(value) = number(config, "params", key)? {
            if value < 0.0 {
                return Err(invalid("params", key, format!("{key} must be non-negative")));
            }
        }
    }
    number(config, "params", "dir_ratio_thresh")?;
    Ok(())
}

fn validate_levels(config: &dyn ConfigPort) -> Result<(), GaptraderError> {
    for key in ["take_profit_opening", "stop_opening"] {
        if let Some(value) = number(config, "params", key)? {
            if value <= 0.0 {
                return Err(invalid("params", key, format!("{key} must be positive")));
            }
        }
    }
    Ok(())
}

fn validate_booleans(config: &dyn ConfigPort) -> Result<(), GaptraderError> {
    let keys = [
        ("params", "optimistic_fill"),
        ("params", "require_flow_data"),
        ("data", "drop_weekends"),
    ];
    for (section, key) in keys {
        if let Some(raw) = present(config, section, key) {
            // an unreadable value falls back to whichever default is passed
            // in, so the two lookups disagree
            if config.get_bool(section, key, true) && !config.get_bool(section, key, false) {
                return Err(invalid(section, key, format!("'{raw}' is not a boolean")));
            }
        }
    }
    Ok(())
}

fn validate_mode(config: &dyn ConfigPort) -> Result<(), GaptraderError> {
    if let Some(raw) = present(config, "params", "path_dependency_mode") {
        raw.parse::<PathDependencyMode>()?;
    }
    Ok(())
}

fn validate_flow(config: &dyn ConfigPort) -> Result<(), GaptraderError> {
    if let Some(window) = integer(config, "flow", "rolling_window")? {
        if window < 2 {
            return Err(invalid("flow", "rolling_window", "rolling_window must be at least 2"));
        }
    }
    if let Some(window) = integer(config, "flow", "turnover_window")? {
        if window < 1 {
            return Err(invalid(
                "flow",
                "turnover_window",
                "turnover_window must be at least 1",
            ));
        }
    }

    let buy = number(config, "flow", "buy_threshold")?;
    let sell = number(config, "flow", "sell_threshold")?;
    for (key, value) in [("buy_threshold", buy), ("sell_threshold", sell)] {
        if let Some(v) = value {
            if !(0.0..=1.0).contains(&v) {
                return Err(invalid("flow", key, format!("{key} must be between 0 and 1")));
            }
        }
    }
    let buy = buy.unwrap_or(0.10);
    let sell = sell.unwrap_or(0.90);
    if buy >= sell {
        return Err(invalid(
            "flow",
            "buy_threshold",
            "buy_threshold must be below sell_threshold",
        ));
    }

    if let Some(column) = config.get_string("flow", "column") {
        if column.trim().is_empty() {
            return Err(invalid("flow", "column", "column must not be empty"));
        }
    }
    Ok(())
}

fn validate_data(config: &dyn ConfigPort) -> Result<(), GaptraderError> {
    for (identifier, canonical) in config.get_section("columns") {
        if canonical.trim().is_empty() {
            return Err(invalid(
                "columns",
                &identifier,
                "column alias needs a canonical name",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    fn invalid_key(err: GaptraderError) -> String {
        match err {
            GaptraderError::ConfigInvalid { key, .. } => key,
            other => panic!("expected ConfigInvalid, got {other}"),
        }
    }

    #[test]
    fn empty_config_uses_defaults() {
        assert!(validate_config(&make_config("")).is_ok());
    }

    #[test]
    fn full_config_passes() {
        let config = make_config(
            r#"
[strategy]
variant = flow_rank

[params]
gap_abs_max = 0.01
take_profit_opening = 0.003
stop_opening = 0.0015
dir_ratio_thresh = 0.6
cost = 0.0002
optimistic_fill = false
path_dependency_mode = Trend
require_flow_data = yes

[flow]
column = foreign_net
rolling_window = 60
buy_threshold = 0.1
sell_threshold = 0.9
turnover_window = 5

[data]
drop_weekends = true

[columns]
I31000010F = open
"#,
        );
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn unknown_variant_fails() {
        let err = validate_config(&make_config("[strategy]\nvariant = momentum\n")).unwrap_err();
        assert_eq!(invalid_key(err), "variant");
    }

    #[test]
    fn non_numeric_value_fails() {
        let err = validate_config(&make_config("[params]\ncost = cheap\n")).unwrap_err();
        assert_eq!(invalid_key(err), "cost");
    }

    #[test]
    fn negative_gap_limit_fails() {
        let err = validate_config(&make_config("[params]\ngap_abs_max = -0.01\n")).unwrap_err();
        assert_eq!(invalid_key(err), "gap_abs_max");
    }

    #[test]
    fn zero_stop_fails() {
        let err = validate_config(&make_config("[params]\nstop_opening = 0\n")).unwrap_err();
        assert_eq!(invalid_key(err), "stop_opening");
    }

    #[test]
    fn bogus_mode_is_unsupported() {
        let err = validate_config(&make_config("[params]\npath_dependency_mode = bogus\n"))
            .unwrap_err();
        assert!(matches!(err, GaptraderError::UnsupportedMode { mode } if mode == "bogus"));
    }

    #[test]
    fn mode_is_case_insensitive() {
        let config = make_config("[params]\npath_dependency_mode = CONSERVATIVE\n");
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn unreadable_boolean_fails() {
        let err = validate_config(&make_config("[params]\noptimistic_fill = maybe\n")).unwrap_err();
        assert_eq!(invalid_key(err), "optimistic_fill");
    }

    #[test]
    fn short_rolling_window_fails() {
        let err = validate_config(&make_config("[flow]\nrolling_window = 1\n")).unwrap_err();
        assert_eq!(invalid_key(err), "rolling_window");
    }

    #[test]
    fn fractional_window_fails() {
        let err = validate_config(&make_config("[flow]\nturnover_window = 2.5\n")).unwrap_err();
        assert_eq!(invalid_key(err), "turnover_window");
    }

    #[test]
    fn threshold_out_of_range_fails() {
        let err = validate_config(&make_config("[flow]\nsell_threshold = 1.2\n")).unwrap_err();
        assert_eq!(invalid_key(err), "sell_threshold");
    }

    #[test]
    fn inverted_thresholds_fail() {
        let config = make_config("[flow]\nbuy_threshold = 0.8\nsell_threshold = 0.2\n");
        assert_eq!(invalid_key(validate_config(&config).unwrap_err()), "buy_threshold");
    }

    #[test]
    fn buy_threshold_checked_against_default_sell() {
        let config = make_config("[flow]\nbuy_threshold = 0.95\n");
        assert_eq!(invalid_key(validate_config(&config).unwrap_err()), "buy_threshold");
    }
}
