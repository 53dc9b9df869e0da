//! CLI Common Utilities
//!
//! Shared initialization and context management for CLI commands.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use crate::ai::ProviderRegistry;
use crate::campaign::SourceWorkbook;
use crate::config::{Config, ConfigLoader};
use crate::storage::{Database, SharedDatabase, StagingStore};
use crate::types::{ResponseStatus, Result, ServiceResponse};

/// Command execution context
///
/// Configuration plus the opened, initialized database. Commands that only
/// print configuration never build one.
#[derive(Clone)]
pub struct CommandContext {
    pub config: Arc<Config>,
    pub db: SharedDatabase,
}

impl CommandContext {
    /// Load configuration (optionally from an explicit file) and open the database.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config = match config_path {
            Some(path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load()?,
        };
        Self::with_config(config)
    }

    pub fn with_config(config: Config) -> Result<Self> {
        let db = Database::open_shared(&config.storage.database_path)?;
        Ok(Self {
            config: Arc::new(config),
            db,
        })
    }

    pub fn staging(&self) -> StagingStore {
        StagingStore::new(self.db.clone())
    }

    /// Providers from configuration, or the offline set when forced
    pub fn providers(&self, offline: bool) -> Result<ProviderRegistry> {
        if offline {
            Ok(ProviderRegistry::offline())
        } else {
            ProviderRegistry::from_config(&self.config)
        }
    }
}

pub fn load_workbook(path: &Path) -> Result<SourceWorkbook> {
    SourceWorkbook::load(path)
}

/// Print a service response as pretty JSON and hand back its status.
pub fn print_response<T: Serialize>(response: &ServiceResponse<T>) -> Result<ResponseStatus> {
    println!("{}", serde_json::to_string_pretty(response)?);
    Ok(response.status)
}
