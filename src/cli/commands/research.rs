//! Research Command
//!
//! Run the buyer-side research pipeline over every prospect in a workbook
//! and stage the results.

use std::path::Path;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::cli::ui::Output;
use crate::cli::util::{CommandContext, load_workbook, print_response};
use crate::research::CampaignResearchOrchestrator;
use crate::types::{ResponseStatus, Result};

pub async fn run(
    ctx: &CommandContext,
    workbook: &Path,
    offline: bool,
    timeout_secs: Option<u64>,
    cancel: CancellationToken,
) -> Result<ResponseStatus> {
    let workbook = load_workbook(workbook)?;
    let output = Output::new();

    if let Some(secs) = timeout_secs {
        let deadline = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = deadline.cancelled() => {}
                _ = tokio::time::sleep(Duration::from_secs(secs)) => {
                    warn!(timeout_secs = secs, "Research run timed out; cancelling");
                    deadline.cancel();
                }
            }
        });
    }

    let providers = ctx.providers(offline)?;
    output.info(&format!(
        "Researching {} prospects ({})",
        workbook.prospects.len(),
        providers.describe()
    ));

    let orchestrator = CampaignResearchOrchestrator::new(providers, ctx.staging(), ctx.config.clone());
    let response = orchestrator.run(&workbook, cancel).await;

    output.status(response.status, &response.message);
    print_response(&response)
}
