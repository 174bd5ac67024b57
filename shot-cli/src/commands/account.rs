use crate::config::CliConfig;
use clap::Subcommand;
use comfy_table::{presets::UTF8_FULL, Table};
use shot_core::storage::{AccountStore, Storage};
use shot_core::{AccountId, Result};

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Register a named account
    Add {
        /// Account name
        name: String,
    },
    /// List named accounts
    List,
}

pub async fn handle_account_command(cmd: AccountCommands, config: &CliConfig) -> Result<()> {
    let storage = Storage::new(&config.db_path()).await?;
    let store = AccountStore::new(&storage);

    match cmd {
        AccountCommands::Add { name } => {
            let record = store.save_account(&name, AccountId::new()).await?;
            println!("Account '{}' created", record.name);
            println!("  ID: {}", record.id);
        }

        AccountCommands::List => {
            let accounts = store.list_accounts().await?;
            if accounts.is_empty() {
                println!("No accounts yet. Use 'shot account add <name>'");
                return Ok(());
            }

            let mut table = Table::new();
            table.load_preset(UTF8_FULL);
            table.set_header(vec!["Name", "ID", "Created"]);
            for account in accounts {
                table.add_row(vec![
                    account.name,
                    account.id.to_string(),
                    account.created_at.format("%Y-%m-%d %H:%M").to_string(),
                ]);
            }
            println!("{}", table);
        }
    }

    Ok(())
}
