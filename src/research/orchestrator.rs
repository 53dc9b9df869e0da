//! Campaign Research Orchestrator
//!
//! Drives one research run over every prospect in a workbook:
//!
//! 1. Validate the workbook (campaign name, at least one prospect)
//! 2. Reset the research staging tables so a previous partial run is discarded
//! 3. Research every prospect concurrently; admission control lives in the
//!    shared throttles, not here
//! 4. Stage prospects, answers and drafts in one transaction
//!
//! Runs inside one process are serialised; staging holds a single run.

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use super::prospect::{ProspectOutcome, ProspectResearcher};
use super::service::ResearchService;
use crate::ai::ProviderRegistry;
use crate::campaign::SourceWorkbook;
use crate::config::Config;
use crate::storage::{ResearchBatch, StagingStore, StagingTable};
use crate::types::{EmailDraftSet, Prospect, ResearchError, RunId, ServiceResponse};

/// Counts staged by one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchSummary {
    pub run_id: String,
    pub prospects: usize,
    pub research_answers: usize,
    pub email_drafts: usize,
    pub elapsed_ms: u64,
}

pub struct CampaignResearchOrchestrator {
    providers: ProviderRegistry,
    staging: StagingStore,
    config: Arc<Config>,
    run_guard: Mutex<()>,
}

impl CampaignResearchOrchestrator {
    pub fn new(providers: ProviderRegistry, staging: StagingStore, config: Arc<Config>) -> Self {
        Self {
            providers,
            staging,
            config,
            run_guard: Mutex::new(()),
        }
    }

    /// Research every prospect in `workbook` and stage the results.
    ///
    /// Never returns `Err`; validation, staging and cancellation failures
    /// come back as a `Failed` response.
    #[instrument(skip_all, fields(prospects = workbook.prospects.len()))]
    pub async fn run(
        &self,
        workbook: &SourceWorkbook,
        cancel: CancellationToken,
    ) -> ServiceResponse<ResearchSummary> {
        let _guard = self.run_guard.lock().await;
        let started = Instant::now();

        let details = workbook.details();
        if details.campaign_name.is_empty() {
            return ServiceResponse::failed("Campaign name missing from settings");
        }
        let prospects = workbook.prospects(&details.campaign_name);
        if prospects.is_empty() {
            return ServiceResponse::failed("Workbook has no prospects");
        }
        let topics = workbook.buyside_topics(&details.campaign_name);

        let run_id = RunId::generate();
        info!(
            run_id = %run_id,
            campaign = %details.campaign_name,
            prospects = prospects.len(),
            topics = topics.len(),
            providers = %self.providers.describe(),
            "Research run starting"
        );

        if let Err(e) = self.staging.clear(&StagingTable::RESEARCH) {
            warn!(error = %e, "Failed to reset research staging");
            return ServiceResponse::failed(format!("Failed to reset staging tables: {}", e));
        }

        let service = match ResearchService::new(self.providers.clone(), &self.config, cancel.clone())
        {
            Ok(service) => Arc::new(service),
            Err(e) => return ServiceResponse::failed(format!("An error occurred: {}", e)),
        };
        let campaign_name = details.campaign_name.clone();
        let researcher = ProspectResearcher::new(
            service,
            Arc::new(details),
            Arc::new(topics),
            self.config.research.clone(),
        );

        let outcomes: DashMap<String, ProspectOutcome> = DashMap::new();
        let fan_out = join_all(prospects.iter().map(|prospect| {
            let researcher = &researcher;
            let outcomes = &outcomes;
            async move {
                let fallback = prospect
                    .case_study_id
                    .as_deref()
                    .and_then(|id| workbook.case_study(id));
                match researcher.research(prospect, fallback.as_deref()).await {
                    Ok(outcome) => {
                        outcomes.insert(prospect.buyer_identifier.clone(), outcome);
                    }
                    Err(ResearchError::Cancelled) => {}
                    Err(e) => {
                        warn!(buyer = %prospect.buyer_identifier, error = %e, "Prospect research failed");
                    }
                }
            }
        }));

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {}
            _ = fan_out => {}
        }
        if cancel.is_cancelled() {
            warn!(run_id = %run_id, "Research run cancelled; nothing staged");
            return ServiceResponse::failed("Research run cancelled before completion");
        }

        let batch = Self::collect(prospects, &outcomes);
        let elapsed_ms = started.elapsed().as_millis() as u64;

        if let Err(e) = self
            .staging
            .stage_research(&run_id, &campaign_name, &batch, elapsed_ms)
        {
            warn!(run_id = %run_id, error = %e, "Failed to stage research");
            return ServiceResponse::failed(format!("Failed to write research to staging: {}", e));
        }

        let summary = ResearchSummary {
            run_id: run_id.to_string(),
            prospects: batch.prospects.len(),
            research_answers: batch.research_answers.len(),
            email_drafts: batch.email_drafts.len(),
            elapsed_ms,
        };
        info!(?summary, "Research run complete");

        ServiceResponse::ok("AI research completed and saved to staging", summary)
    }

    /// Assemble the staging batch in workbook order.
    fn collect(
        prospects: Vec<Prospect>,
        outcomes: &DashMap<String, ProspectOutcome>,
    ) -> ResearchBatch {
        let mut batch = ResearchBatch::default();

        for prospect in prospects {
            match outcomes.remove(&prospect.buyer_identifier) {
                Some((_, outcome)) => {
                    batch.research_answers.extend(outcome.answers);
                    batch.email_drafts.push(outcome.drafts);
                }
                // Repeated identifier: the first row already took the outcome
                None if batch
                    .prospects
                    .iter()
                    .any(|p| p.buyer_identifier == prospect.buyer_identifier) =>
                {
                    warn!(
                        buyer = %prospect.buyer_identifier,
                        "Dropping prospect row with a repeated buyer identifier"
                    );
                    continue;
                }
                None => batch
                    .email_drafts
                    .push(EmailDraftSet::empty(&prospect.buyer_identifier)),
            }
            batch.prospects.push(prospect);
        }

        batch
    }
}
