use super::fmt_amount;
use crate::config::CliConfig;
use crate::session::Session;
use comfy_table::{presets::UTF8_FULL, Table};
use shot_core::storage::EventStore;
use shot_core::{Result, ShotEvent};

pub async fn handle_status(player: Option<String>, config: &CliConfig) -> Result<()> {
    let session = Session::open(config).await?;
    let engine = &session.engine;

    println!("Shot engine status:");
    println!("  Height: {}", engine.current_height());
    println!("  Pot: {}", fmt_amount(engine.current_pot()));
    println!("  Next shot fee: {}", fmt_amount(engine.required_fee()));
    println!("  House funds: {}", fmt_amount(engine.house_funds()));
    println!("  Pending shots: {}", engine.pending_count());
    println!("  Paused: {}", if engine.is_paused() { "yes" } else { "no" });
    if engine.test_mode().enabled {
        println!(
            "  Test mode: ENABLED (cooldown {} heights, forced roll {:?})",
            engine.test_mode().cooldown_period,
            engine.test_mode().forced_winning_number
        );
    }

    if let Some(name) = player {
        let id = session.resolve(&name).await?;
        let pending = engine.pending_shot(&id);

        println!();
        println!("Player '{}':", name);
        println!("  Can commit: {}", if engine.can_commit(&id) { "yes" } else { "no" });
        println!("  Cooldown remaining: {} heights", engine.cooldown_remaining(&id));
        if pending.exists {
            println!(
                "  Pending shot: {} committed at height {}",
                fmt_amount(pending.amount),
                pending.height_at_commit
            );
        } else {
            println!("  Pending shot: none");
        }
        println!("  Pending payout: {}", fmt_amount(engine.pending_payout(&id)));
        println!("  Balance: {}", fmt_amount(engine.custody().balance(&id)));
    }

    Ok(())
}

pub async fn handle_winners(config: &CliConfig) -> Result<()> {
    let session = Session::open(config).await?;
    let winners = session.engine.recent_winners();

    if winners.is_empty() {
        println!("No winners yet");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Height", "Player", "Payout (sats)"]);
    for winner in winners.iter().rev() {
        table.add_row(vec![
            winner.height.to_string(),
            session.display_name(&winner.player).await,
            winner.payout.to_sat().to_string(),
        ]);
    }
    println!("{}", table);

    Ok(())
}

pub async fn handle_events(limit: usize, account: Option<String>, config: &CliConfig) -> Result<()> {
    let session = Session::open(config).await?;
    let store = EventStore::new(session.storage());

    let records = match account {
        Some(name) => {
            let id = session.resolve(&name).await?;
            store.list_for_account(&id, limit).await?
        }
        None => store.list_recent(limit).await?,
    };

    if records.is_empty() {
        println!("No events recorded");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Height", "Time", "Event", "Account", "Details"]);
    for record in records {
        let account = match record.event.account() {
            Some(id) => session.display_name(&id).await,
            None => String::new(),
        };
        table.add_row(vec![
            record.height.to_string(),
            record.emitted_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            record.event.kind().to_string(),
            account,
            describe(&record.event),
        ]);
    }
    println!("{}", table);

    Ok(())
}

fn describe(event: &ShotEvent) -> String {
    match event {
        ShotEvent::Committed {
            commitment_hash,
            amount,
            ..
        } => format!(
            "{} sats, commitment {}…",
            amount.to_sat(),
            &hex::encode(commitment_hash)[..16]
        ),
        ShotEvent::Revealed { amount, won, .. } => {
            format!("{} sats, {}", amount.to_sat(), if *won { "won" } else { "lost" })
        }
        ShotEvent::Won { payout, .. } => format!("payout {} sats", payout.to_sat()),
        ShotEvent::Expired {
            height_at_commit,
            amount,
            ..
        } => format!("{} sats from height {}", amount.to_sat(), height_at_commit),
        ShotEvent::HouseFundsWithdrawn { amount, .. }
        | ShotEvent::Sponsored { amount, .. }
        | ShotEvent::PayoutDeferred { amount, .. }
        | ShotEvent::PayoutWithdrawn { amount, .. } => format!("{} sats", amount.to_sat()),
        ShotEvent::TestModeChanged { enabled } => format!("enabled: {}", enabled),
        ShotEvent::PauseChanged { paused } => format!("paused: {}", paused),
    }
}
