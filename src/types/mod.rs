pub mod campaign;
pub mod error;
pub mod prospect;
pub mod response;
pub mod utils;

pub use campaign::*;
pub use error::{ErrorCategory, ErrorClassifier, ProviderError, Result, ResearchError, ResultExt};
pub use prospect::*;
pub use response::{ResponseStatus, ServiceResponse};
pub use utils::{Row, first_value, row_i64, row_opt_string, row_string};

// =============================================================================
// Domain Newtypes
// =============================================================================

use std::fmt;

/// Type-safe wrapper for research run IDs
///
/// Every orchestrator run gets one; it tags log lines and the
/// `staging_runs` audit row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct RunId(String);

impl RunId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RunId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod newtype_tests {
    use super::*;

    #[test]
    fn test_run_id_unique() {
        let a = RunId::generate();
        let b = RunId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
        assert_eq!(format!("{}", RunId::from("r-1")), "r-1");
    }
}
