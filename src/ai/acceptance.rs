//! Response Acceptance Filter
//!
//! Two stages decide whether a grounded answer is usable:
//!
//! 1. a case-sensitive keyword check that rejects "nothing found" style
//!    replies and replies that drifted into public-company financial
//!    boilerplate (local, cheap)
//! 2. a verification query asking the grounded provider whether the
//!    statement is likely true, optionally anchored to a recency cutoff
//!    (network, expensive)
//!
//! A rejected answer never aborts research; callers treat it as empty.

use tracing::debug;

use super::provider::{ChatMessage, GroundedProvider};
use crate::config::AcceptanceConfig;
use crate::constants;
use crate::types::Result;

const VERIFY_SYSTEM_PROMPT: &str = "You are an artificial intelligence web-search assistant. \
Your role is to search the web to validate or reject a given statement.";

/// Recency requirement for the verification stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validity {
    /// Only truthfulness matters
    Irrelevant,
    /// The statement must also be dated later than this anchor, e.g. "July 1, 2024"
    Since(String),
}

impl Validity {
    /// Parse a configured anchor; the literal "Irrelevant" disables the recency check.
    pub fn parse(anchor: &str) -> Self {
        let anchor = anchor.trim();
        if anchor.is_empty() || anchor == constants::research::VALIDITY_IRRELEVANT {
            Self::Irrelevant
        } else {
            Self::Since(anchor.to_string())
        }
    }

    fn instruction(&self) -> String {
        match self {
            Self::Irrelevant => "Conduct a web search to answer in one word without giving any \
                details, if this statement is likely true or false:"
                .to_string(),
            Self::Since(date) => format!(
                "Check if this following statement is likely true or false and dated later \
                 than {}. Respond in one word only:",
                date
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    ProviderFailed,
    Empty,
    NoData(String),
    Financial(String),
    Unverified,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ProviderFailed => write!(f, "provider failed"),
            Self::Empty => write!(f, "empty response"),
            Self::NoData(kw) => write!(f, "no-data keyword {:?}", kw),
            Self::Financial(kw) => write!(f, "financial keyword {:?}", kw),
            Self::Unverified => write!(f, "not verified"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accepted(String),
    Rejected(RejectReason),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }

    /// Accepted text, or empty for a rejection
    pub fn into_text(self) -> String {
        match self {
            Self::Accepted(text) => text,
            Self::Rejected(_) => String::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AcceptanceFilter {
    no_data_keywords: Vec<String>,
    financial_keywords: Vec<String>,
    verify_enabled: bool,
}

impl Default for AcceptanceFilter {
    fn default() -> Self {
        Self::from_config(&AcceptanceConfig::default())
    }
}

impl AcceptanceFilter {
    pub fn from_config(config: &AcceptanceConfig) -> Self {
        Self {
            no_data_keywords: config.no_data_keywords.clone(),
            financial_keywords: config.financial_keywords.clone(),
            verify_enabled: config.verify,
        }
    }

    pub fn verify_enabled(&self) -> bool {
        self.verify_enabled
    }

    /// Keyword stage. Pure: the same text always yields the same answer.
    pub fn is_acceptable(&self, text: &str) -> bool {
        self.rejection(text).is_none()
    }

    fn rejection(&self, text: &str) -> Option<RejectReason> {
        if text.trim().is_empty() {
            return Some(RejectReason::Empty);
        }
        if let Some(kw) = self.no_data_keywords.iter().find(|kw| text.contains(kw.as_str())) {
            return Some(RejectReason::NoData(kw.clone()));
        }
        self.financial_keywords
            .iter()
            .find(|kw| text.contains(kw.as_str()))
            .map(|kw| RejectReason::Financial(kw.clone()))
    }

    /// Keyword stage applied to a provider outcome
    pub fn evaluate(&self, outcome: Result<String>) -> Verdict {
        match outcome {
            Ok(text) => match self.rejection(&text) {
                Some(reason) => Verdict::Rejected(reason),
                None => Verdict::Accepted(text),
            },
            Err(e) => {
                debug!(error = %e, "Provider call failed before acceptance");
                Verdict::Rejected(RejectReason::ProviderFailed)
            }
        }
    }

    /// Verification stage. Any provider failure counts as "not verified".
    pub async fn verify(
        &self,
        provider: &dyn GroundedProvider,
        text: &str,
        validity: &Validity,
    ) -> bool {
        if !self.verify_enabled {
            return true;
        }

        let messages = verification_messages(text, validity);
        match provider.search(&messages, false).await {
            Ok(reply) => affirms_truth(&reply.text),
            Err(e) => {
                debug!(error = %e, "Verification query failed");
                false
            }
        }
    }
}

pub fn verification_messages(text: &str, validity: &Validity) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(VERIFY_SYSTEM_PROMPT),
        ChatMessage::user(format!("{} {}", validity.instruction(), text)),
    ]
}

const NEGATING_WORDS: &[&str] = &["false", "not", "untrue"];

/// Whether a verification reply affirms the statement.
///
/// The whole word "true" must appear and no negating word may.
pub fn affirms_truth(answer: &str) -> bool {
    let mut affirmed = false;
    for word in answer.split(|c: char| !c.is_alphanumeric()) {
        let word = word.to_ascii_lowercase();
        if NEGATING_WORDS.contains(&word.as_str()) {
            return false;
        }
        affirmed |= word == "true";
    }
    affirmed
}

/// Strict form used for the title check: the reply is exactly "true"
pub fn is_exactly_true(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case("true")
}
