use super::admin::ADMIN_ACCOUNT;
use super::fmt_amount;
use crate::config::CliConfig;
use crate::session::Session;
use bitcoin::Amount;
use dialoguer::Confirm;
use shot_core::{Result, ShotError};

pub async fn handle_sponsor(sponsor: &str, amount: u64, config: &CliConfig) -> Result<()> {
    let mut session = Session::open(config).await?;
    let sponsor_id = session.resolve(sponsor).await?;

    let pot = session
        .engine
        .sponsor(sponsor_id, Amount::from_sat(amount))?;
    println!("'{}' sponsored {}", sponsor, fmt_amount(Amount::from_sat(amount)));
    println!("  Pot: {}", fmt_amount(pot));

    session.save().await
}

pub async fn handle_withdraw_payout(player: &str, config: &CliConfig) -> Result<()> {
    let mut session = Session::open(config).await?;
    let player_id = session.resolve(player).await?;

    let amount = session.engine.withdraw_pending_payout(player_id)?;
    println!("Withdrew {} for '{}'", fmt_amount(amount), player);
    println!(
        "  Balance: {}",
        fmt_amount(session.engine.custody().balance(&player_id))
    );

    session.save().await
}

pub async fn handle_withdraw_house(caller: Option<String>, yes: bool, config: &CliConfig) -> Result<()> {
    let mut session = Session::open(config).await?;
    let caller = caller.unwrap_or_else(|| ADMIN_ACCOUNT.to_string());
    let caller_id = session.resolve(&caller).await?;

    let amount = session.engine.house_funds();
    let house = session.engine.config().house_address;
    if amount == Amount::ZERO {
        return Err(ShotError::NothingPending);
    }

    if !yes {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Send {} to house address {}?",
                fmt_amount(amount),
                session.display_name(&house).await
            ))
            .default(false)
            .interact()
            .map_err(|e| ShotError::internal(format!("Prompt failed: {}", e)))?;

        if !confirmed {
            println!("Withdrawal cancelled");
            return Ok(());
        }
    }

    let withdrawn = session.engine.withdraw_house_funds(caller_id)?;
    println!(
        "Withdrew {} of house funds to {}",
        fmt_amount(withdrawn),
        session.display_name(&house).await
    );

    session.save().await
}
