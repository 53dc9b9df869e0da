//! AI Integration Layer
//!
//! Provider clients, admission control and response acceptance for the
//! campaign research pipeline.

pub mod acceptance;
pub mod provider;
pub mod retry;
pub mod throttle;
pub mod timeout;

pub use acceptance::{
    AcceptanceFilter, RejectReason, Validity, Verdict, affirms_truth, is_exactly_true,
};
pub use provider::{
    ChatMessage, ChatProvider, GroundedProvider, GroundedReply, OfflineProvider, ProviderRegistry,
    RagProvider, Role, SharedChat, SharedGrounded, SharedRag,
};
pub use retry::{RetryPolicy, retry_with_backoff};
pub use throttle::{Throttle, ThrottleError};
pub use timeout::with_timeout;
