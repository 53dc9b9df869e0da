//! Campaign Research Pipeline
//!
//! - [`orchestrator`]: one research run over every prospect, staged atomically
//! - [`prospect`]: the per-prospect knowledge, title, topic and draft stages
//! - [`sell_side`]: seller-side talking points from the knowledge base
//! - [`service`]: throttled provider operations shared by both pipelines
//! - [`prompts`] and [`topics`]: prompt templates and topic bucketing

pub mod orchestrator;
pub mod prompts;
pub mod prospect;
pub mod sell_side;
pub mod service;
pub mod topics;

pub use orchestrator::{CampaignResearchOrchestrator, ResearchSummary};
pub use prospect::{ProspectOutcome, ProspectResearcher};
pub use sell_side::{SellSideResearcher, SellSideSummary};
pub use service::ResearchService;
pub use topics::{Bucket, ResearchFindings};
