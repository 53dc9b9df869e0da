//! Sell-side Command
//!
//! Answer the sell-side questions against the knowledge base and stage
//! the resulting scripts.

use std::path::Path;

use tokio_util::sync::CancellationToken;

use crate::cli::ui::Output;
use crate::cli::util::{CommandContext, load_workbook, print_response};
use crate::research::SellSideResearcher;
use crate::types::{ResponseStatus, Result};

pub async fn run(
    ctx: &CommandContext,
    workbook: &Path,
    offline: bool,
    cancel: CancellationToken,
) -> Result<ResponseStatus> {
    let workbook = load_workbook(workbook)?;
    let researcher = SellSideResearcher::new(ctx.providers(offline)?, ctx.staging(), ctx.config.clone());

    let response = researcher.run(&workbook, cancel).await;
    Output::new().status(response.status, &response.message);
    print_response(&response)
}
