use crate::config::CliConfig;
use chrono::Utc;
use shot_core::storage::{AccountStore, StateStore, Storage, StoredState};
use shot_core::{AccountId, LocalEngine, ManualOracle, Result, ShotEngine, ShotError};

/// Engine loaded from the data directory for the duration of one command.
pub struct Session {
    storage: Storage,
    oracle: ManualOracle,
    pub engine: LocalEngine,
}

impl Session {
    pub async fn open(config: &CliConfig) -> Result<Self> {
        let storage = Storage::new(&config.db_path()).await?;
        let state = StateStore::new(&storage)
            .load_state()
            .await?
            .ok_or_else(|| ShotError::config("No engine found. Run 'shot init' first"))?;

        let oracle = ManualOracle::new(state.oracle_height, state.oracle_seed);
        let engine = ShotEngine::restore(state.snapshot, oracle.clone(), state.custody)?;

        Ok(Self {
            storage,
            oracle,
            engine,
        })
    }

    pub fn from_parts(storage: Storage, oracle: ManualOracle, engine: LocalEngine) -> Self {
        Self {
            storage,
            oracle,
            engine,
        }
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn oracle(&self) -> &ManualOracle {
        &self.oracle
    }

    /// Journals emitted events and persists engine state.
    pub async fn save(mut self) -> Result<()> {
        let events = self.engine.drain_events();
        let state = StoredState {
            snapshot: self.engine.snapshot(),
            oracle_height: self.engine.current_height(),
            oracle_seed: self.oracle.seed(),
            custody: self.engine.custody().clone(),
            updated_at: Utc::now(),
        };
        StateStore::new(&self.storage)
            .save_with_events(&state, &events)
            .await
    }

    /// Accepts an account name or a raw account id.
    pub async fn resolve(&self, who: &str) -> Result<AccountId> {
        if let Some(record) = AccountStore::new(&self.storage).get_account(who).await? {
            return Ok(record.id);
        }

        who.parse().map_err(|_| {
            ShotError::invalid_input(format!(
                "Unknown account '{}'. Use 'shot account add {}' first",
                who, who
            ))
        })
    }

    pub async fn display_name(&self, id: &AccountId) -> String {
        match AccountStore::new(&self.storage).find_by_id(id).await {
            Ok(Some(record)) => record.name,
            _ => id.to_string(),
        }
    }
}
