//! Status Command
//!
//! Row counts of every staging and permanent table.

use crate::cli::util::CommandContext;
use crate::storage::PermanentRecords;
use crate::types::{ResponseStatus, Result};

pub fn run(ctx: &CommandContext, format: &str) -> Result<ResponseStatus> {
    let counts = PermanentRecords::new(ctx.db.clone()).table_counts()?;
    let runs = ctx.staging().run_count()?;

    if format == "json" {
        let status = serde_json::json!({
            "database": ctx.config.storage.database_path,
            "research_runs": runs,
            "tables": counts,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(ResponseStatus::Ok);
    }

    println!("Campaign Research Status");
    println!("══════════════════════════════════════");
    println!("Database: {}", ctx.config.storage.database_path.display());
    println!("Research runs staged: {}", runs);
    println!();
    println!("{:<20} {:>10} {:>10}", "Table", "Staging", "Permanent");
    for count in counts {
        println!("{:<20} {:>10} {:>10}", count.table, count.staging, count.permanent);
    }

    Ok(ResponseStatus::Ok)
}
