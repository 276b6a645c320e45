//! Inbound events from the webhook, normalized away from the LINE wire format.

use crate::session::UserId;

/// One event from a webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// A message the bot can reply to.
    Message(InboundMessage),
    /// Anything else (follow, unfollow, postback, a message without a reply token, ...).
    Other { event_type: String },
}

/// A message from a user, with the single-use token needed to answer it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub user_id: UserId,
    pub reply_token: String,
    pub kind: MessageKind,
}

/// Message payload by kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    Text {
        text: String,
    },
    Sticker {
        package_id: String,
        sticker_id: String,
        resource_type: String,
    },
    /// Image, video, audio, file, location, ... (`message_type` as sent by the platform).
    Other {
        message_type: String,
    },
}

impl MessageKind {
    /// Short name for logs.
    pub fn name(&self) -> &str {
        match self {
            MessageKind::Text { .. } => "text",
            MessageKind::Sticker { .. } => "sticker",
            MessageKind::Other { message_type } => message_type,
        }
    }
}

impl InboundMessage {
    pub fn text(
        user_id: impl Into<String>,
        reply_token: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            reply_token: reply_token.into(),
            kind: MessageKind::Text { text: text.into() },
        }
    }
}
