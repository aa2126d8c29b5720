//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

use crate::adapters::csv_adapter::{CsvAdapter, CsvOptions};
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::analysis::{flow_information_coefficients, InformationCoefficient};
use crate::domain::config_validation::validate_config;
use crate::domain::error::GaptraderError;
use crate::domain::metrics::Summary;
use crate::domain::params::{FlowParams, ParamSettings, Params, StrategyVariant};
use crate::domain::pipeline::{self, RunOutput};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "gaptrader", about = "Overnight gap backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the configured strategy over a daily CSV
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        data: PathBuf,
        /// Directory for the CSV outputs
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
        /// Overrides [params] path_dependency_mode
        #[arg(long)]
        mode: Option<String>,
    },
    /// Validate a configuration and print the resolved parameters
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Rank flow columns by correlation with the next day's gap
    Ic {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        data: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Backtest {
            config,
            data,
            output_dir,
            mode,
        } => run_backtest(&config, &data, output_dir.as_deref(), mode.as_deref()),
        Command::Validate { config } => run_validate(&config),
        Command::Ic { config, data } => run_ic(&config, &data),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, GaptraderError> {
    FileConfigAdapter::from_file(path).map_err(|e| GaptraderError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> GaptraderError {
    GaptraderError::ConfigInvalid {
        section: section.into(),
        key: key.into(),
        reason: reason.into(),
    }
}

fn window(config: &dyn ConfigPort, key: &str, default: usize) -> Result<usize, GaptraderError> {
    let value = config.get_int("flow", key, default as i64);
    usize::try_from(value).map_err(|_| invalid("flow", key, "must not be negative"))
}

/// Raw settings from `[strategy]`, `[params]` and `[flow]`; absent keys keep
/// their defaults.
pub fn build_settings(config: &dyn ConfigPort) -> Result<ParamSettings, GaptraderError> {
    let defaults = ParamSettings::default();
    let flow_defaults = FlowParams::default();

    let variant = match config
        .get_string("strategy", "variant")
        .filter(|s| !s.trim().is_empty())
    {
        Some(raw) => raw
            .parse::<StrategyVariant>()
            .map_err(|reason| invalid("strategy", "variant", reason))?,
        None => defaults.variant,
    };

    let flow = FlowParams {
        column: config
            .get_string("flow", "column")
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .unwrap_or(flow_defaults.column),
        rolling_window: window(config, "rolling_window", flow_defaults.rolling_window)?,
        buy_threshold: config.get_double("flow", "buy_threshold", flow_defaults.buy_threshold),
        sell_threshold: config.get_double("flow", "sell_threshold", flow_defaults.sell_threshold),
        turnover_window: window(config, "turnover_window", flow_defaults.turnover_window)?,
    };

    Ok(ParamSettings {
        gap_abs_max: config.get_double("params", "gap_abs_max", defaults.gap_abs_max),
        take_profit_opening: config.get_double(
            "params",
            "take_profit_opening",
            defaults.take_profit_opening,
        ),
        stop_opening: config.get_double("params", "stop_opening", defaults.stop_opening),
        dir_ratio_thresh: config.get_double("params", "dir_ratio_thresh", defaults.dir_ratio_thresh),
        cost: config.get_double("params", "cost", defaults.cost),
        optimistic_fill: config.get_bool("params", "optimistic_fill", defaults.optimistic_fill),
        path_dependency_mode: config
            .get_string("params", "path_dependency_mode")
            .filter(|s| !s.trim().is_empty()),
        require_flow_data: config.get_bool(
            "params",
            "require_flow_data",
            defaults.require_flow_data,
        ),
        required_flow_columns: config
            .get_list("params", "required_flow_columns")
            .unwrap_or(defaults.required_flow_columns),
        variant,
        flow,
    })
}

/// Validate the raw config, apply the CLI mode override, resolve once.
pub fn resolve_params(
    config: &dyn ConfigPort,
    mode_override: Option<&str>,
) -> Result<Params, GaptraderError> {
    validate_config(config)?;
    let mut settings = build_settings(config)?;
    if let Some(mode) = mode_override {
        settings.path_dependency_mode = Some(mode.to_string());
    }
    settings.resolve()
}

pub fn execute_backtest(
    config: &dyn ConfigPort,
    data: &Path,
    mode_override: Option<&str>,
) -> Result<RunOutput, GaptraderError> {
    let params = resolve_params(config, mode_override)?;
    info!(
        variant = %params.variant,
        mode = %params.path_mode,
        "resolved parameters"
    );

    let adapter = CsvAdapter::with_options(data.to_path_buf(), CsvOptions::from_config(config));
    let table = adapter.load_daily()?;
    pipeline::run(&table, &params)
}

fn run_backtest(
    config_path: &Path,
    data_path: &Path,
    output_dir: Option<&Path>,
    mode_override: Option<&str>,
) -> Result<(), GaptraderError> {
    info!(path = %config_path.display(), "loading config");
    let config = load_config(config_path)?;
    let output = execute_backtest(&config, data_path, mode_override)?;

    if let Some(dir) = output_dir {
        CsvReportAdapter::new(dir).write_run(&output)?;
    }

    let variant = match &output {
        RunOutput::OpeningProxy(_) => StrategyVariant::OpeningProxy,
        RunOutput::FlowRank(_) => StrategyVariant::FlowRank,
    };
    print!("{}", format_summary(variant, output.summary()));
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), GaptraderError> {
    let config = load_config(config_path)?;
    let params = resolve_params(&config, None)?;
    print!("{}", format_params(&params));
    Ok(())
}

fn run_ic(config_path: &Path, data_path: &Path) -> Result<(), GaptraderError> {
    let config = load_config(config_path)?;
    let params = resolve_params(&config, None)?;
    let adapter = CsvAdapter::with_options(data_path.to_path_buf(), CsvOptions::from_config(&config));
    let table = adapter.load_daily()?;
    let ics = flow_information_coefficients(&table, params.flow.turnover_window);
    if ics.is_empty() {
        info!("no flow columns found in the data");
    }
    print!("{}", format_ics(&ics));
    Ok(())
}

fn pct(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

pub fn format_summary(variant: StrategyVariant, summary: &Summary) -> String {
    let date = |d: Option<chrono::NaiveDate>| d.map_or_else(|| "-".to_string(), |d| d.to_string());
    [
        format!("strategy      {variant}"),
        format!(
            "period        {} .. {}",
            date(summary.start_date),
            date(summary.end_date)
        ),
        format!("total_return  {}", pct(summary.total_return)),
        format!(
            "cagr          {}",
            summary.cagr.map_or_else(|| "n/a".to_string(), pct)
        ),
        format!("max_drawdown  {}", pct(summary.max_drawdown)),
        format!(
            "win_rate      {} ({}/{} days)",
            pct(summary.win_rate),
            summary.winning_days,
            summary.trade_days
        ),
    ]
    .iter()
    .map(|line| format!("{line}\n"))
    .collect()
}

pub fn format_params(params: &Params) -> String {
    let fields: [(&str, String); 14] = [
        ("variant", params.variant.to_string()),
        ("path_dependency_mode", params.path_mode.to_string()),
        ("gap_abs_max", params.gap_abs_max.to_string()),
        ("take_profit_opening", params.take_profit_opening.to_string()),
        ("stop_opening", params.stop_opening.to_string()),
        ("dir_ratio_thresh", params.dir_ratio_thresh.to_string()),
        ("cost", params.cost.to_string()),
        ("require_flow_data", params.require_flow_data.to_string()),
        ("required_flow_columns", params.required_flow_columns.join(", ")),
        ("flow.column", params.flow.column.clone()),
        ("flow.rolling_window", params.flow.rolling_window.to_string()),
        ("flow.buy_threshold", params.flow.buy_threshold.to_string()),
        ("flow.sell_threshold", params.flow.sell_threshold.to_string()),
        ("flow.turnover_window", params.flow.turnover_window.to_string()),
    ];
    fields
        .iter()
        .map(|(key, value)| format!("{key:<21} {value}\n"))
        .collect()
}

fn ic_line(column: &str, value: &str, observations: &str) -> String {
    format!("{column:<24} {value:>10} {observations:>8}\n")
}

pub fn format_ics(ics: &[InformationCoefficient]) -> String {
    let mut out = ic_line("column", "ic", "n");
    for ic in ics {
        let value = ic.ic.map_or_else(|| "n/a".to_string(), |v| format!("{v:.4}"));
        out.push_str(&ic_line(&ic.column, &value, &ic.observations.to_string()));
    }
    out
}
