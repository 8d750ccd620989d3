//! # estate CLI entry point
//!
//! Parses command-line arguments, configures logging and runs one of the
//! two ledger services.

use std::process::ExitCode;

use clap::{Parser, Subcommand};

use estate_cli::logging::{self, LogFormat};
use estate_cli::serve::{run_escrow_ledger, run_loan_ledger, EscrowLedgerArgs, LoanLedgerArgs};

/// Loan and escrow ledger services for property purchases.
#[derive(Parser, Debug)]
#[command(name = "estate", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Log output format. Defaults to ESTATE_LOG_FORMAT, then text.
    #[arg(long, value_enum, global = true)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the loan ledger.
    LoanLedger(LoanLedgerArgs),

    /// Serve the escrow ledger.
    EscrowLedger(EscrowLedgerArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.log_format.unwrap_or_else(LogFormat::from_env));

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("failed to start async runtime: {e}");
            return ExitCode::from(1);
        }
    };

    let result = runtime.block_on(async {
        match &cli.command {
            Commands::LoanLedger(args) => run_loan_ledger(args).await,
            Commands::EscrowLedger(args) => run_escrow_ledger(args).await,
        }
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
