//! Structured `{status, message, data}` results returned by the services.

use serde::{Deserialize, Serialize};

/// Outcome of a service call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Ok,
    /// Commit found every staging table empty
    NothingToCommit,
    Failed,
}

impl ResponseStatus {
    /// HTTP-style status code
    pub fn code(&self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::NothingToCommit => 404,
            Self::Failed => 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceResponse<T> {
    pub status: ResponseStatus,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ServiceResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            status: ResponseStatus::Ok,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Failed,
            message: message.into(),
            data: None,
        }
    }

    pub fn nothing_to_commit(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::NothingToCommit,
            message: message.into(),
            data: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == ResponseStatus::Ok
    }
}
