use serde::{Deserialize, Serialize};
use ts_rs::TS;

pub mod contact;
pub mod identify;

pub use contact::{Contact, LinkPrecedence, ParseLinkPrecedenceError};
pub use identify::{ConsolidatedContact, IdentifyRequest, IdentifyResponse};

/// Error response for API endpoints
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ErrorResponse {
    pub error: String,
}
