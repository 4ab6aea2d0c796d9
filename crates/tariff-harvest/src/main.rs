// Copyright 2026 Cortex Contributors
// SPDX-License-Identifier: Apache-2.0

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use tariff_harvest::cli;
use tariff_harvest::cli::run_cmd::RunArgs;

#[derive(Parser)]
#[command(
    name = "tariff-harvest",
    about = "Harvest HS tariff codes from the CBSA customs tariff into a deduplicated dataset",
    version,
    after_help = "Run 'tariff-harvest <command> --help' for details on each command.\nRun 'tariff-harvest' with no command to harvest with the default settings."
)]
struct Cli {
    /// Log filter when RUST_LOG is unset (error, warn, info, debug, trace).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Log line format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the configured categories and/or chapters and write the dataset
    Run(RunArgs),
    /// Print the canonical dotted form and chapter of raw codes
    Normalize {
        /// Raw codes, e.g. "0101.21.00" or "010121"
        raw: Vec<String>,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish)
        shell: Shell,
    },
}

fn init_tracing(level: &str, format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_format);

    let result = match cli.command {
        // No subcommand → harvest with defaults
        None => cli::run_cmd::run(&RunArgs::default()).await,
        Some(Commands::Run(args)) => cli::run_cmd::run(&args).await,
        Some(Commands::Normalize { raw }) => cli::normalize_cmd::run(&raw),
        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "tariff-harvest", &mut std::io::stdout());
            Ok(())
        }
    };

    // 0 = dataset written, 1 = configuration or write failure
    if let Err(e) = &result {
        eprintln!("  Error: {e:#}");
        std::process::exit(1);
    }

    result
}
