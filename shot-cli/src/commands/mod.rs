pub mod account;
pub mod admin;
pub mod funds;
pub mod shot;
pub mod status;

pub use account::{handle_account_command, AccountCommands};
pub use admin::{
    handle_advance, handle_init, handle_pause, handle_test_mode_command, InitArgs,
    TestModeCommands,
};
pub use funds::{handle_sponsor, handle_withdraw_house, handle_withdraw_payout};
pub use shot::{handle_cleanup, handle_commit, handle_reveal};
pub use status::{handle_events, handle_status, handle_winners};

use bitcoin::Amount;

pub(crate) fn fmt_amount(amount: Amount) -> String {
    format!("{} sats ({:.8} BTC)", amount.to_sat(), amount.to_btc())
}
