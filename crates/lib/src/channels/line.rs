//! LINE channel: webhook verification/parsing and the reply API.

use crate::channels::inbound::{InboundEvent, InboundMessage, MessageKind};
use crate::channels::sender::ReplySender;
use crate::error::{DeliveryError, WebhookError};
use crate::outbound::{Action, MenuItem, OutboundMessage, RichTemplate, TemplateLayout};
use async_trait::async_trait;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying base64(HMAC-SHA256(channel secret, raw body)).
pub const SIGNATURE_HEADER: &str = "x-line-signature";

/// Webhook delivery body: one or more events.
#[derive(Debug, Deserialize)]
struct WebhookBody {
    #[serde(default)]
    events: Vec<WireEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEvent {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    reply_token: Option<String>,
    #[serde(default)]
    source: Option<WireSource>,
    #[serde(default)]
    message: Option<WireMessage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireSource {
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    group_id: Option<String>,
    #[serde(default)]
    room_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireMessage {
    #[serde(rename = "type")]
    message_type: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    package_id: Option<String>,
    #[serde(default)]
    sticker_id: Option<String>,
    #[serde(default)]
    sticker_resource_type: Option<String>,
}

impl WireSource {
    /// The user id; group and room ids stand in when the user has not shared theirs.
    fn identity(self) -> Option<String> {
        self.user_id
            .or(self.group_id)
            .or(self.room_id)
            .filter(|id| !id.is_empty())
    }
}

impl WireMessage {
    fn into_kind(self) -> MessageKind {
        let WireMessage {
            message_type,
            text,
            package_id,
            sticker_id,
            sticker_resource_type,
        } = self;
        if message_type == "sticker" {
            return MessageKind::Sticker {
                package_id: package_id.unwrap_or_default(),
                sticker_id: sticker_id.unwrap_or_default(),
                resource_type: sticker_resource_type.unwrap_or_default(),
            };
        }
        if message_type == "text" {
            if let Some(text) = text {
                return MessageKind::Text { text };
            }
        }
        MessageKind::Other { message_type }
    }
}

impl WireEvent {
    fn into_event(self) -> InboundEvent {
        if self.event_type != "message" {
            return InboundEvent::Other {
                event_type: self.event_type,
            };
        }
        let Some(message) = self.message else {
            return InboundEvent::Other {
                event_type: "message without payload".to_string(),
            };
        };
        let Some(reply_token) = self.reply_token.filter(|t| !t.is_empty()) else {
            return InboundEvent::Other {
                event_type: "message without reply token".to_string(),
            };
        };
        let Some(user_id) = self.source.and_then(WireSource::identity) else {
            return InboundEvent::Other {
                event_type: "message without source".to_string(),
            };
        };
        InboundEvent::Message(InboundMessage {
            user_id,
            reply_token,
            kind: message.into_kind(),
        })
    }
}

/// Compute the signature for `body` (what the platform puts in [`SIGNATURE_HEADER`]).
pub fn sign_body(channel_secret: &str, body: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(channel_secret.as_bytes()).ok()?;
    mac.update(body);
    Some(base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
}

/// Check a base64 signature against the body. Comparison is constant time.
pub fn verify_signature(channel_secret: &str, body: &[u8], signature: &str) -> bool {
    let Ok(expected) = base64::engine::general_purpose::STANDARD.decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(channel_secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

/// Verify and parse one webhook delivery.
pub fn parse_webhook(
    channel_secret: &str,
    signature: Option<&str>,
    body: &[u8],
) -> Result<Vec<InboundEvent>, WebhookError> {
    let signature = signature.ok_or(WebhookError::MissingSignature)?;
    if !verify_signature(channel_secret, body, signature) {
        return Err(WebhookError::InvalidSignature);
    }
    let body: WebhookBody = serde_json::from_slice(body)?;
    Ok(body.events.into_iter().map(WireEvent::into_event).collect())
}

fn action_json(action: &Action) -> Value {
    match action {
        Action::Uri { label, uri } => json!({ "type": "uri", "label": label, "uri": uri }),
        Action::Postback { label, data } => {
            json!({ "type": "postback", "label": label, "data": data })
        }
    }
}

fn item_json(item: &MenuItem) -> Value {
    let mut v = json!({
        "text": item.text,
        "actions": item.actions.iter().map(action_json).collect::<Vec<_>>(),
    });
    if let Some(url) = &item.thumbnail_image_url {
        v["thumbnailImageUrl"] = Value::String(url.clone());
    }
    if let Some(title) = &item.title {
        v["title"] = Value::String(title.clone());
    }
    v
}

fn template_json(template: &RichTemplate) -> Value {
    let body = match template.layout {
        TemplateLayout::Buttons => {
            let mut v = template.items.first().map(item_json).unwrap_or_else(|| json!({}));
            v["type"] = Value::String("buttons".to_string());
            v
        }
        TemplateLayout::Carousel => json!({
            "type": "carousel",
            "columns": template.items.iter().map(item_json).collect::<Vec<_>>(),
        }),
    };
    json!({ "type": "template", "altText": template.alt_text, "template": body })
}

/// Messaging API JSON for one message.
pub fn message_json(message: &OutboundMessage) -> Value {
    match message {
        OutboundMessage::Text {
            text,
            quick_replies,
        } => {
            let mut v = json!({ "type": "text", "text": text });
            if !quick_replies.is_empty() {
                let items: Vec<Value> = quick_replies
                    .iter()
                    .map(|q| {
                        json!({
                            "type": "action",
                            "action": { "type": "message", "label": q.label, "text": q.text }
                        })
                    })
                    .collect();
                v["quickReply"] = json!({ "items": items });
            }
            v
        }
        OutboundMessage::Sticker {
            package_id,
            sticker_id,
        } => json!({ "type": "sticker", "packageId": package_id, "stickerId": sticker_id }),
        OutboundMessage::Template(template) => template_json(template),
    }
}

/// LINE reply connector: POSTs to /v2/bot/message/reply with the channel access token.
pub struct LineChannel {
    id: String,
    api_base: String,
    access_token: Option<String>,
    client: reqwest::Client,
}

impl LineChannel {
    pub fn new(api_base: impl Into<String>, access_token: Option<String>) -> Self {
        Self {
            id: "line".to_string(),
            api_base: api_base.into(),
            access_token,
            client: reqwest::Client::new(),
        }
    }

    /// Send one message with a reply token.
    pub async fn reply_message(
        &self,
        reply_token: &str,
        message: &OutboundMessage,
    ) -> Result<(), DeliveryError> {
        let token = self
            .access_token
            .as_ref()
            .ok_or(DeliveryError::MissingToken)?;
        let url = format!(
            "{}/v2/bot/message/reply",
            self.api_base.trim_end_matches('/')
        );
        let body = json!({
            "replyToken": reply_token,
            "messages": [message_json(message)],
        });
        let res = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(DeliveryError::Status { status, body });
        }
        Ok(())
    }
}

#[async_trait]
impl ReplySender for LineChannel {
    fn id(&self) -> &str {
        &self.id
    }

    async fn send_reply(
        &self,
        reply_token: &str,
        message: &OutboundMessage,
    ) -> Result<(), DeliveryError> {
        self.reply_message(reply_token, message).await
    }
}
