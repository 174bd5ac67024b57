use super::fmt_amount;
use crate::config::CliConfig;
use crate::session::Session;
use shot_core::{generate_secret, LossReason, PayoutResult, Result, RevealOutcome, ShotCommitment, ShotError};

pub async fn handle_commit(player: &str, secret: Option<String>, config: &CliConfig) -> Result<()> {
    let mut session = Session::open(config).await?;
    let player_id = session.resolve(player).await?;

    let secret = match secret {
        Some(hex_secret) => hex::decode(hex_secret.trim_start_matches("0x"))
            .map_err(|e| ShotError::invalid_input(format!("Secret must be hex: {}", e)))?,
        None => generate_secret(),
    };
    let commitment = ShotCommitment::new(secret.clone(), &player_id);

    let fee = session.engine.required_fee();
    session.engine.commit(player_id, *commitment.hash(), fee)?;

    let height = session.engine.current_height();
    let cfg = session.engine.config().clone();
    println!("Shot committed for '{}'", player);
    println!("  Fee paid: {}", fmt_amount(fee));
    println!("  Pot: {}", fmt_amount(session.engine.current_pot()));
    println!("  Commitment: {}", commitment.hash_hex());
    println!();
    println!("IMPORTANT: keep your secret, it is needed to reveal!");
    println!("Secret: {}", hex::encode(&secret));
    println!();
    let (first, last) = cfg.reveal_heights(height);
    println!(
        "Reveal between heights {} and {} (current height {}):",
        first, last, height
    );
    println!("shot reveal {} {}", player, hex::encode(&secret));

    session.save().await
}

pub async fn handle_reveal(player: &str, secret: &str, config: &CliConfig) -> Result<()> {
    let mut session = Session::open(config).await?;
    let player_id = session.resolve(player).await?;

    let secret = hex::decode(secret.trim_start_matches("0x"))
        .map_err(|e| ShotError::invalid_input(format!("Secret must be hex: {}", e)))?;

    let outcome = session.engine.reveal(player_id, &secret)?;

    match &outcome {
        RevealOutcome::Lost { roll, reason, .. } => {
            println!("No luck this time.");
            match reason {
                LossReason::SoleContributor => {
                    println!("  The pot only held your own stake, so it could not be won")
                }
                LossReason::PotTooSmall => println!("  The pot is below the minimum for a win"),
                LossReason::Roll => {
                    if let Some(roll) = roll {
                        println!(
                            "  Rolled {} (needed below {})",
                            roll,
                            session.engine.config().win_chance_bp
                        );
                    }
                }
            }
            println!("  Pot: {}", fmt_amount(session.engine.current_pot()));
        }
        RevealOutcome::Won {
            roll,
            split,
            settlement,
            ..
        } => {
            println!();
            println!("------ WINNER! ------");
            println!("═══════════════════════════════════");
            println!("Winner: {}", player);
            println!("Rolled: {}", roll);
            println!("Prize: {}", fmt_amount(split.payout));
            println!("House cut: {}", fmt_amount(split.house_cut));
            match settlement {
                PayoutResult::Transferred { amount } => {
                    println!("Payout successful! {} transferred", fmt_amount(*amount));
                }
                PayoutResult::Deferred { amount, reason } => {
                    println!("Direct payout failed: {}", reason);
                    println!("{} credited as pending payout, withdraw with:", fmt_amount(*amount));
                    println!("shot withdraw-payout {}", player);
                }
            }
        }
    }

    session.save().await
}

pub async fn handle_cleanup(player: &str, config: &CliConfig) -> Result<()> {
    let mut session = Session::open(config).await?;
    let player_id = session.resolve(player).await?;

    let shot = session.engine.cleanup_expired(player_id)?;
    println!(
        "Expired shot of '{}' from height {} cleared",
        player, shot.height_at_commit
    );
    println!("  {} stays in the pot", fmt_amount(shot.amount_paid));

    session.save().await
}
