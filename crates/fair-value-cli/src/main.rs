mod commands;
mod input;
mod output;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use commands::scenarios::SensitivityArgs;
use commands::valuation::{CompsArgs, DcfArgs, GrowthArgs, WaccArgs};

/// DCF and comparable-company valuations
#[derive(Parser)]
#[command(
    name = "fv",
    version,
    about = "DCF and comparable-company valuations",
    long_about = "A CLI for discounted cash flow and comparable-company valuations \
                  with decimal precision. Supports FCF DCF, trading comps, historical \
                  growth estimation, WACC and DCF sensitivity tables."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Increase log verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a free cash flow DCF valuation
    Dcf(DcfArgs),
    /// Comparable company analysis from peer multiples
    Comps(CompsArgs),
    /// Estimate FCF growth from historical free cash flow
    Growth(GrowthArgs),
    /// Calculate the weighted average cost of capital
    Wacc(WaccArgs),
    /// Two-way DCF sensitivity table
    Sensitivity(SensitivityArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // stdout carries results; logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    debug!(format = ?cli.output, "starting fv {}", env!("CARGO_PKG_VERSION"));

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Dcf(args) => commands::valuation::run_dcf(args),
        Commands::Comps(args) => commands::valuation::run_comps(args),
        Commands::Growth(args) => commands::valuation::run_growth(args),
        Commands::Wacc(args) => commands::valuation::run_wacc(args),
        Commands::Sensitivity(args) => commands::scenarios::run_sensitivity(args),
        Commands::Version => {
            println!("fv {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
