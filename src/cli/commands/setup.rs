//! Setup Command
//!
//! Stage the campaign, its users and its topics from a workbook.

use std::path::Path;

use crate::campaign::CampaignSetup;
use crate::cli::ui::Output;
use crate::cli::util::{CommandContext, load_workbook, print_response};
use crate::types::{ResponseStatus, Result};

pub fn run(ctx: &CommandContext, workbook: &Path) -> Result<ResponseStatus> {
    let workbook = load_workbook(workbook)?;
    let response = CampaignSetup::new(ctx.staging()).stage(&workbook);

    Output::new().status(response.status, &response.message);
    print_response(&response)
}
