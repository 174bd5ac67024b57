mod commands;
mod config;
mod session;

use clap::{Parser, Subcommand};
use config::CliConfig;
use shot_core::ShotError;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "shot")]
#[command(about = "Shot lottery - commit-reveal pot game driven by a local simulated oracle")]
#[command(version)]
struct Cli {
    /// Data directory for engine storage
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new engine with its administrator and house accounts
    Init(commands::InitArgs),

    /// Account management commands
    #[command(subcommand)]
    Account(commands::AccountCommands),

    /// Show pot, fees and optionally a player's status
    Status {
        /// Player name or id
        player: Option<String>,
    },

    /// Pay the shot fee and commit to a secret
    Commit {
        /// Player name or id
        player: String,
        /// Secret (hex encoded), generated when omitted
        #[arg(short, long)]
        secret: Option<String>,
    },

    /// Reveal a committed secret and resolve the shot
    Reveal {
        /// Player name or id
        player: String,
        /// Secret (hex encoded)
        secret: String,
    },

    /// Clear a pending shot whose reveal window has lapsed
    Cleanup {
        /// Player name or id
        player: String,
    },

    /// Add funds to the pot without taking a shot
    Sponsor {
        /// Sponsor name or id
        sponsor: String,
        /// Amount in sats
        amount: u64,
    },

    /// Withdraw a payout that could not be transferred directly
    WithdrawPayout {
        /// Player name or id
        player: String,
    },

    /// Send accrued house funds to the house address
    WithdrawHouse {
        /// Acting account (administrator or house)
        #[arg(long = "as")]
        caller: Option<String>,
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Move the simulated oracle forward
    Advance {
        /// Number of heights
        #[arg(default_value_t = 1)]
        heights: u64,
    },

    /// Test mode commands
    #[command(subcommand)]
    TestMode(commands::TestModeCommands),

    /// Reject new commits and sponsorships
    Pause {
        /// Acting account
        #[arg(long = "as", default_value = commands::admin::ADMIN_ACCOUNT)]
        caller: String,
    },

    /// Accept commits and sponsorships again
    Unpause {
        /// Acting account
        #[arg(long = "as", default_value = commands::admin::ADMIN_ACCOUNT)]
        caller: String,
    },

    /// Show the most recent winners
    Winners,

    /// Show journaled events
    Events {
        /// Maximum number of events
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
        /// Only events about this account
        #[arg(short, long)]
        account: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!(
            "shot={},shot_core={}",
            log_level, log_level
        )))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = CliConfig::new(cli.data_dir, cli.verbose);

    // Ensure data directory exists
    tokio::fs::create_dir_all(&config.data_dir).await?;

    // Execute command
    let result = match cli.command {
        Commands::Init(args) => commands::handle_init(args, &config).await,
        Commands::Account(cmd) => commands::handle_account_command(cmd, &config).await,
        Commands::Status { player } => commands::handle_status(player, &config).await,
        Commands::Commit { player, secret } => {
            commands::handle_commit(&player, secret, &config).await
        }
        Commands::Reveal { player, secret } => {
            commands::handle_reveal(&player, &secret, &config).await
        }
        Commands::Cleanup { player } => commands::handle_cleanup(&player, &config).await,
        Commands::Sponsor { sponsor, amount } => {
            commands::handle_sponsor(&sponsor, amount, &config).await
        }
        Commands::WithdrawPayout { player } => {
            commands::handle_withdraw_payout(&player, &config).await
        }
        Commands::WithdrawHouse { caller, yes } => {
            commands::handle_withdraw_house(caller, yes, &config).await
        }
        Commands::Advance { heights } => commands::handle_advance(heights, &config).await,
        Commands::TestMode(cmd) => commands::handle_test_mode_command(cmd, &config).await,
        Commands::Pause { caller } => commands::handle_pause(true, &caller, &config).await,
        Commands::Unpause { caller } => commands::handle_pause(false, &caller, &config).await,
        Commands::Winners => commands::handle_winners(&config).await,
        Commands::Events { limit, account } => {
            commands::handle_events(limit, account, &config).await
        }
    };

    if let Err(e) = result {
        match e {
            ShotError::CooldownActive { remaining } => {
                eprintln!("Error: Cooldown active");
                eprintln!("Wait {} more heights ('shot advance {}')", remaining, remaining);
            }
            ShotError::AlreadyPending(_) => {
                eprintln!("Error: A shot is already pending");
                eprintln!("Reveal it, or clean it up once its window has lapsed");
            }
            ShotError::NotYetRevealable { elapsed, start } => {
                eprintln!("Error: Too early to reveal");
                eprintln!("Wait {} more heights", start - elapsed);
            }
            ShotError::WindowExpired { .. } => {
                eprintln!("Error: Reveal window expired");
                eprintln!("Use 'shot cleanup <player>' and commit again");
            }
            ShotError::BadSecret => {
                eprintln!("Error: Secret does not match the commitment");
                eprintln!("The shot is still pending, retry with the right secret");
            }
            _ => {
                eprintln!("Error: {}", e);
            }
        }
        std::process::exit(1);
    }

    Ok(())
}
