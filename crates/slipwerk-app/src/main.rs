// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Slipwerk — print job relay for slip and thermal receipt printers.
//
// Entry point. Parses the command line, initialises logging, loads settings,
// and dispatches to the service layer.

mod services;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use services::commands::{self, TestTarget};

#[derive(Parser)]
#[command(name = "slipwerk")]
#[command(about = "Polls the print job queue and drives slip and thermal printers", long_about = None)]
struct Cli {
    /// Settings file (default: settings.json in the data directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the polling service and run until Ctrl-C
    Run,
    /// Run a single poll tick and print the status snapshot
    StatusOnce,
    /// Print a built-in test receipt
    TestPrint(TestPrintArgs),
    /// Print the slip text rendering of an HTML receipt
    Render {
        /// HTML file to render
        file: PathBuf,
    },
}

#[derive(Args)]
struct TestPrintArgs {
    #[command(flatten)]
    target: TargetFlags,
    /// Printer address as HOST:PORT
    address: String,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct TargetFlags {
    /// Use the slip printer session
    #[arg(long)]
    slip: bool,
    /// Use the thermal ESC/POS path
    #[arg(long)]
    thermal: bool,
}

fn init_logging(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            tracing::info!("slipwerk starting");
            let cfg = commands::load_config(cli.config.as_deref())?;
            commands::run(&cfg).await?;
        }
        Commands::StatusOnce => {
            let cfg = commands::load_config(cli.config.as_deref())?;
            println!("{}", commands::status_once(&cfg).await?);
        }
        Commands::TestPrint(args) => {
            let cfg = commands::load_config(cli.config.as_deref())?;
            let target = if args.target.slip {
                TestTarget::Slip
            } else {
                TestTarget::Thermal
            };
            let result = commands::test_print(&cfg, target, &args.address).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            if !result.success {
                anyhow::bail!(
                    "test print failed: {}",
                    result.error.unwrap_or_default()
                );
            }
        }
        Commands::Render { file } => {
            println!("{}", commands::render(&file)?);
        }
    }

    Ok(())
}
