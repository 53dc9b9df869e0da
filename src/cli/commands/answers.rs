//! Answers Command
//!
//! Show the committed prospect, research answers and drafts for one buyer.

use crate::cli::ui::Output;
use crate::cli::util::CommandContext;
use crate::storage::PermanentRecords;
use crate::types::{ResponseStatus, Result};

pub fn run(ctx: &CommandContext, buyer_identifier: &str) -> Result<ResponseStatus> {
    let records = PermanentRecords::new(ctx.db.clone());
    let output = Output::new();

    let Some(prospect) = records.prospect(buyer_identifier)? else {
        output.warning(&format!("No committed prospect {}", buyer_identifier));
        return Ok(ResponseStatus::Failed);
    };
    let answers = records.research_answers_for(buyer_identifier)?;
    let drafts = records.email_drafts_for(buyer_identifier)?;

    let report = serde_json::json!({
        "prospect": prospect,
        "research_answers": answers,
        "email_drafts": drafts,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(ResponseStatus::Ok)
}
