use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use rust_decimal::Decimal;
use tripcost::cli::chart::ChartArgs;
use tripcost::cli::summary::SummaryArgs;
use tripcost::core::log::init_logging;
use tripcost::core::{CurrencyCode, ParticipantKey};

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

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Show, refresh or use the stored exchange rates
    #[command(subcommand)]
    Rates(RatesCommands),
    /// Display trip cost totals in each trip's currency
    Summary {
        /// Only summarize this trip
        #[arg(short, long)]
        trip: Option<u64>,
        /// Count components marked inactive
        #[arg(long)]
        include_inactive: bool,
        /// Only count components paid by these participants (id or "shared")
        #[arg(short, long = "participant")]
        participants: Vec<ParticipantKey>,
        /// Skip components that cost nothing
        #[arg(long)]
        exclude_free: bool,
    },
    /// Display cost breakdown of a trip by category and participant
    Chart {
        /// Trip id
        trip: u64,
        /// Only include these categories (defaults to all)
        #[arg(long = "category")]
        categories: Vec<String>,
        /// Only include components paid by these participants (id or "shared")
        #[arg(short, long = "participant")]
        participants: Vec<ParticipantKey>,
        /// Include components that cost nothing
        #[arg(long)]
        include_free: bool,
        /// Print chart records as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum RatesCommands {
    /// List stored rates against the base currency
    Show,
    /// Fetch the latest rates if the stored ones are stale
    Refresh {
        /// Fetch even if the stored rates are fresh
        #[arg(short, long)]
        force: bool,
    },
    /// Convert an amount between two currencies
    Convert {
        amount: Decimal,
        from: CurrencyCode,
        to: CurrencyCode,
    },
}

impl From<Commands> for tripcost::AppCommand {
    fn from(cmd: Commands) -> tripcost::AppCommand {
        match cmd {
            Commands::Rates(RatesCommands::Show) => tripcost::AppCommand::RatesShow,
            Commands::Rates(RatesCommands::Refresh { force }) => {
                tripcost::AppCommand::RatesRefresh { force }
            }
            Commands::Rates(RatesCommands::Convert { amount, from, to }) => {
                tripcost::AppCommand::RatesConvert { amount, from, to }
            }
            Commands::Summary {
                trip,
                include_inactive,
                participants,
                exclude_free,
            } => tripcost::AppCommand::Summary(SummaryArgs {
                trip,
                include_inactive,
                participants,
                exclude_free,
            }),
            Commands::Chart {
                trip,
                categories,
                participants,
                include_free,
                json,
            } => tripcost::AppCommand::Chart(ChartArgs {
                trip,
                categories,
                participants,
                include_free,
                json,
            }),
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
            Some(path) => tripcost::cli::setup::setup_at_path(path),
            None => tripcost::cli::setup::setup(),
        },
        Some(cmd) => tripcost::run_command(cmd.into(), cli.config_path.as_deref()).await,
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
