//! Commit Command
//!
//! Transfer every staging table into the permanent tables in one
//! transaction.

use crate::cli::ui::Output;
use crate::cli::util::{CommandContext, print_response};
use crate::storage::StagingCommitter;
use crate::types::{ResponseStatus, Result};

pub fn run(ctx: &CommandContext) -> Result<ResponseStatus> {
    let committer = StagingCommitter::new(ctx.db.clone(), &ctx.config.storage);
    let response = committer.commit();

    Output::new().status(response.status, &response.message);
    print_response(&response)
}
