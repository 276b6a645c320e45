//! Error types for the webhook boundary, reply delivery, and template configuration.

use thiserror::Error;

/// Rejection of a webhook delivery before any event is processed.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("missing X-Line-Signature header")]
    MissingSignature,

    #[error("webhook signature does not match body")]
    InvalidSignature,

    #[error("malformed webhook body: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl WebhookError {
    /// Signature problems are the sender's fault; a body we cannot parse is ours.
    pub fn is_signature_error(&self) -> bool {
        matches!(
            self,
            WebhookError::MissingSignature | WebhookError::InvalidSignature
        )
    }
}

/// Failure to deliver a reply.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("channel access token not configured")]
    MissingToken,

    #[error("reply request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("reply rejected: {status} {body}")]
    Status { status: u16, body: String },
}

/// Rich template content that would be rejected by the messaging API.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("{what}: must not be empty")]
    Empty { what: String },

    #[error("{what}: {len} characters exceeds limit of {max}")]
    TooLong { what: String, len: usize, max: usize },

    #[error("{what}: {count} entries, expected {min}..={max}")]
    Count {
        what: String,
        count: usize,
        min: usize,
        max: usize,
    },

    #[error("{what}: expected {expected} layout")]
    Layout { what: String, expected: String },

    #[error("carousel columns must all have the same number of actions")]
    UnevenActions,

    #[error("{what}: {uri:?} is not an http(s) URI")]
    InvalidUri { what: String, uri: String },
}
