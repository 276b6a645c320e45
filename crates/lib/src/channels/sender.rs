//! Reply delivery seam.

use crate::error::DeliveryError;
use crate::outbound::OutboundMessage;
use async_trait::async_trait;

/// Sends a reply to one inbound event.
///
/// A reply token is single use: callers must not send twice with the same token.
#[async_trait]
pub trait ReplySender: Send + Sync {
    /// Channel id for logs (e.g. "line").
    fn id(&self) -> &str;

    async fn send_reply(
        &self,
        reply_token: &str,
        message: &OutboundMessage,
    ) -> Result<(), DeliveryError>;
}
