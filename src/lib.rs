//! Campaign Research - AI research and outreach drafting for sales campaigns
//!
//! Takes a campaign workbook (settings, questions, prospects, case studies),
//! researches every prospect through web-grounded and knowledge-base AI
//! providers, drafts personalized outreach, and moves the results from
//! staging into permanent storage in one all-or-nothing commit.
//!
//! ## Core Features
//!
//! - **Throttled providers**: bounded concurrency with a delay between batches
//! - **Acceptance filter**: keyword rejection plus grounded verification
//! - **Graceful degradation**: failed provider calls become empty strings
//! - **Staging commit**: one bounded transaction, staging cleared afterwards
//!
//! ## Quick Start
//!
//! ```ignore
//! use campaign_research::{CampaignResearchOrchestrator, Config, Database, ProviderRegistry};
//!
//! let config = Arc::new(Config::default());
//! let db = Database::open_shared(&config.storage.database_path)?;
//! let orchestrator = CampaignResearchOrchestrator::new(
//!     ProviderRegistry::from_config(&config)?,
//!     StagingStore::new(db.clone()),
//!     config.clone(),
//! );
//! let response = orchestrator.run(&workbook, CancellationToken::new()).await;
//! ```
//!
//! ## Modules
//!
//! - [`ai`]: provider clients, throttling, retry and acceptance
//! - [`campaign`]: workbook loading and campaign setup
//! - [`research`]: per-prospect and seller-side research pipelines
//! - [`storage`]: SQLite staging, permanent tables and the commit protocol
//! - [`config`]: layered configuration

pub mod ai;
pub mod campaign;
pub mod cli;
pub mod config;
pub mod constants;
pub mod research;
pub mod storage;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

pub use config::{Config, ConfigLoader};

pub use types::error::{ErrorCategory, Result, ResearchError, ResultExt};
pub use types::{ResponseStatus, ServiceResponse};

pub use storage::{
    Database, PermanentRecords, SharedDatabase, StagingCommitter, StagingStore, TransferResults,
};

// =============================================================================
// Pipeline Re-exports
// =============================================================================

pub use campaign::{CampaignSetup, SourceWorkbook};
pub use research::{CampaignResearchOrchestrator, ResearchSummary, SellSideResearcher};

pub use ai::{AcceptanceFilter, ProviderRegistry, Throttle};
