//! Communication channels (LINE).
//!
//! Inbound: webhook deliveries are verified and normalized into [`InboundEvent`]s.
//! Outbound: replies go through the [`ReplySender`] trait so the router does not depend on
//! the transport.

mod inbound;
mod line;
mod sender;

pub use inbound::{InboundEvent, InboundMessage, MessageKind};
pub use line::{
    message_json, parse_webhook, sign_body, verify_signature, LineChannel, SIGNATURE_HEADER,
};
pub use sender::ReplySender;
