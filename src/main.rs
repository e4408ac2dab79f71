use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand};
use satsconv::core::DisplayUnit;
use satsconv::core::log::init_logging;
use satsconv::{AppCommand, ConvertOptions};
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args, Debug, Clone)]
struct RateArgs {
    /// Fiat currency code, e.g. EUR
    #[arg(long)]
    currency: Option<String>,

    /// Display unit: btc or sats
    #[arg(long)]
    unit: Option<DisplayUnit>,

    /// Use the fixed offline rate table
    #[arg(long)]
    test_mode: bool,
}

impl From<RateArgs> for ConvertOptions {
    fn from(args: RateArgs) -> Self {
        ConvertOptions {
            currency: args.currency,
            unit: args.unit,
            test_mode: args.test_mode,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Convert a fiat amount to bitcoin
    Convert {
        /// Amount in the selected currency
        #[arg(allow_hyphen_values = true)]
        amount: String,
        #[command(flatten)]
        rates: RateArgs,
    },
    /// Show the price of one bitcoin in every currency
    Rates {
        #[command(flatten)]
        rates: RateArgs,
    },
    /// Keep a conversion on screen, refreshing rates periodically
    Watch {
        /// Amount in the selected currency
        #[arg(allow_hyphen_values = true)]
        amount: String,
        #[command(flatten)]
        rates: RateArgs,
    },
    /// Read a price tag from an image and convert it
    Scan {
        /// Image file standing in for the camera frame
        image: PathBuf,
        #[command(flatten)]
        rates: RateArgs,
    },
    /// Pick the price out of a line of OCR text
    Extract {
        /// Raw text to scan for a price
        text: String,
    },
}

impl From<Commands> for AppCommand {
    fn from(cmd: Commands) -> AppCommand {
        match cmd {
            Commands::Convert { amount, rates } => AppCommand::Convert {
                amount,
                options: rates.into(),
            },
            Commands::Rates { rates } => AppCommand::Rates {
                options: rates.into(),
            },
            Commands::Watch { amount, rates } => AppCommand::Watch {
                amount,
                options: rates.into(),
            },
            Commands::Scan { image, rates } => AppCommand::Scan {
                image,
                options: rates.into(),
            },
            Commands::Extract { text } => AppCommand::Extract { text },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => match cli.config_path.as_deref() {
            Some(path) => satsconv::cli::setup::setup_at_path(path),
            None => satsconv::cli::setup::setup(),
        },
        Some(cmd) => satsconv::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
