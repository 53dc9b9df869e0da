pub mod commit;
pub mod database;
pub mod records;
pub mod staging;

pub use commit::{StagingCommitter, TransferResults};
pub use database::{Database, Deadline, PoolConfig, SharedDatabase};
pub use records::{PermanentRecords, TableCount};
pub use staging::{ResearchBatch, SetupBatch, StagingSnapshot, StagingStore, StagingTable};
