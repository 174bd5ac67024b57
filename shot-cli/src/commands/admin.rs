use super::fmt_amount;
use crate::config::CliConfig;
use crate::session::Session;
use bitcoin::Amount;
use clap::{Args, Subcommand};
use shot_core::storage::{AccountStore, EventStore, StateStore, Storage};
use shot_core::{
    AccountId, InMemoryBank, ManualOracle, Result, RoundConfig, ShotEngine, ShotError,
    TestModeConfig,
};

pub const ADMIN_ACCOUNT: &str = "admin";
pub const HOUSE_ACCOUNT: &str = "house";

#[derive(Args)]
pub struct InitArgs {
    /// Shot fee in sats
    #[arg(long, default_value_t = 1_000_000)]
    pub shot_cost: u64,
    /// Fee for the first shot into an empty pot, in sats
    #[arg(long)]
    pub first_shot_cost: Option<u64>,
    /// Minimum sponsorship in sats
    #[arg(long, default_value_t = 100_000)]
    pub sponsor_cost: u64,
    /// Heights between two shots of the same player
    #[arg(long, default_value_t = 60)]
    pub cooldown: u64,
    /// Share of the pot paid to the winner, in basis points
    #[arg(long, default_value_t = 9_000)]
    pub win_bp: u64,
    /// Share of the pot kept by the house, in basis points
    #[arg(long, default_value_t = 1_000)]
    pub house_bp: u64,
    /// Chance of a win, in basis points
    #[arg(long, default_value_t = 1_000)]
    pub chance_bp: u64,
    /// Size of the recent winners list
    #[arg(long, default_value_t = 10)]
    pub max_winners: usize,
    /// Minimum pot for a win, in sats
    #[arg(long, default_value_t = 1_000_000)]
    pub min_pot: u64,
    /// First height after commit at which a reveal is accepted
    #[arg(long, default_value_t = 1)]
    pub reveal_start: u64,
    /// Last height after commit at which a reveal is accepted
    #[arg(long, default_value_t = 256)]
    pub reveal_end: u64,
    /// Replace an existing engine
    #[arg(short, long)]
    pub force: bool,
}

impl InitArgs {
    fn to_config(&self, house: AccountId) -> RoundConfig {
        let mut config = RoundConfig::new(house);
        config.shot_cost = Amount::from_sat(self.shot_cost);
        config.first_shot_cost = self.first_shot_cost.map(Amount::from_sat);
        config.sponsor_cost = Amount::from_sat(self.sponsor_cost);
        config.cooldown_period = self.cooldown;
        config.win_percentage_bp = self.win_bp;
        config.house_percentage_bp = self.house_bp;
        config.win_chance_bp = self.chance_bp;
        config.max_recent_winners = self.max_winners;
        config.min_pot_size = Amount::from_sat(self.min_pot);
        config.reveal_window_start = self.reveal_start;
        config.reveal_window_end = self.reveal_end;
        config
    }
}

async fn role_account(store: &AccountStore<'_>, name: &str) -> Result<AccountId> {
    match store.get_account(name).await? {
        Some(record) => Ok(record.id),
        None => Ok(store.save_account(name, AccountId::new()).await?.id),
    }
}

pub async fn handle_init(args: InitArgs, config: &CliConfig) -> Result<()> {
    let storage = Storage::new(&config.db_path()).await?;

    if StateStore::new(&storage).has_state().await? {
        if !args.force {
            return Err(ShotError::config(
                "An engine already exists. Use --force to replace it",
            ));
        }
        let removed = EventStore::new(&storage).clear().await?;
        tracing::info!("Replacing engine, dropped {} journaled events", removed);
    }

    let accounts = AccountStore::new(&storage);
    let admin = role_account(&accounts, ADMIN_ACCOUNT).await?;
    let house = role_account(&accounts, HOUSE_ACCOUNT).await?;

    let round = args.to_config(house);
    let oracle = ManualOracle::with_random_seed(0);
    let engine = ShotEngine::new(round, admin, oracle.clone(), InMemoryBank::new())?;

    let cfg = engine.config().clone();
    Session::from_parts(storage, oracle, engine).save().await?;

    println!("Shot engine initialized");
    println!("  Shot cost: {}", fmt_amount(cfg.shot_cost));
    if let Some(first) = cfg.first_shot_cost {
        println!("  First shot cost: {}", fmt_amount(first));
    }
    println!("  Sponsor minimum: {}", fmt_amount(cfg.sponsor_cost));
    println!("  Cooldown: {} heights", cfg.cooldown_period);
    println!(
        "  Split: {} bp winner / {} bp house, win chance {} bp",
        cfg.win_percentage_bp, cfg.house_percentage_bp, cfg.win_chance_bp
    );
    println!(
        "  Reveal window: {}..={} heights after commit",
        cfg.reveal_window_start, cfg.reveal_window_end
    );
    println!("  Administrator: {} ({})", ADMIN_ACCOUNT, admin);
    println!("  House: {} ({})", HOUSE_ACCOUNT, house);

    Ok(())
}

pub async fn handle_advance(heights: u64, config: &CliConfig) -> Result<()> {
    let session = Session::open(config).await?;
    let height = session.oracle().try_advance(heights)?;

    let expired = session.engine.expired_players();
    println!("Oracle height is now {}", height);
    if !expired.is_empty() {
        println!("{} pending shot(s) can be cleaned up:", expired.len());
        for player in &expired {
            println!("  shot cleanup {}", session.display_name(player).await);
        }
    }

    session.save().await
}

#[derive(Subcommand)]
pub enum TestModeCommands {
    /// Enable test mode (short cooldown, optional forced roll)
    On {
        /// Roll used instead of the derived random value
        #[arg(long)]
        force_number: Option<u64>,
        /// Cooldown in heights while test mode is on
        #[arg(long, default_value_t = 1)]
        cooldown: u64,
        /// Acting account
        #[arg(long = "as", default_value = ADMIN_ACCOUNT)]
        caller: String,
    },
    /// Disable test mode
    Off {
        /// Acting account
        #[arg(long = "as", default_value = ADMIN_ACCOUNT)]
        caller: String,
    },
}

pub async fn handle_test_mode_command(cmd: TestModeCommands, config: &CliConfig) -> Result<()> {
    let mut session = Session::open(config).await?;

    match cmd {
        TestModeCommands::On {
            force_number,
            cooldown,
            caller,
        } => {
            let caller = session.resolve(&caller).await?;
            let test_mode = TestModeConfig {
                enabled: true,
                forced_winning_number: force_number,
                cooldown_period: cooldown,
            };
            session.engine.set_test_mode(caller, test_mode)?;

            println!("Test mode ENABLED");
            println!("  Cooldown: {} heights", cooldown);
            match force_number {
                Some(n) => println!("  Forced roll: {}", n),
                None => println!("  Roll: random"),
            }
        }
        TestModeCommands::Off { caller } => {
            let caller = session.resolve(&caller).await?;
            session
                .engine
                .set_test_mode(caller, TestModeConfig::default())?;
            println!("Test mode disabled");
        }
    }

    session.save().await
}

pub async fn handle_pause(paused: bool, caller: &str, config: &CliConfig) -> Result<()> {
    let mut session = Session::open(config).await?;
    let caller = session.resolve(caller).await?;

    if paused {
        session.engine.pause(caller)?;
        println!("Engine paused: commits and sponsorships are rejected");
    } else {
        session.engine.unpause(caller)?;
        println!("Engine unpaused");
    }

    session.save().await
}
