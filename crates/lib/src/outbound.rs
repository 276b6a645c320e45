//! Outbound message descriptions. Pure data: what to send, not how.
//!
//! Rich templates come from configuration, so they are checked against the messaging API's
//! documented limits with [`RichTemplate::validate`] before the server starts.

use crate::error::TemplateError;
use serde::{Deserialize, Serialize};

const MAX_ALT_TEXT: usize = 400;
const MAX_TITLE: usize = 40;
const MAX_TEXT_PLAIN: usize = 160;
const MAX_TEXT_WITH_HEADER: usize = 60;
const MAX_LABEL: usize = 20;
const MAX_POSTBACK_DATA: usize = 300;
const MAX_URI: usize = 1000;
const MAX_BUTTON_ACTIONS: usize = 4;
const MAX_COLUMN_ACTIONS: usize = 3;
const MAX_CAROUSEL_COLUMNS: usize = 10;

/// A message to send in reply to one inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    Text {
        text: String,
        /// Suggested answers shown under the message. Empty for plain text.
        quick_replies: Vec<QuickReply>,
    },
    Sticker {
        package_id: String,
        sticker_id: String,
    },
    Template(RichTemplate),
}

impl OutboundMessage {
    pub fn text(text: impl Into<String>) -> Self {
        OutboundMessage::Text {
            text: text.into(),
            quick_replies: Vec::new(),
        }
    }

    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            OutboundMessage::Text { quick_replies, .. } if !quick_replies.is_empty() => {
                "quick reply"
            }
            OutboundMessage::Text { .. } => "text",
            OutboundMessage::Sticker { .. } => "sticker",
            OutboundMessage::Template(t) => match t.layout {
                TemplateLayout::Buttons => "buttons template",
                TemplateLayout::Carousel => "carousel template",
            },
        }
    }
}

/// A quick-reply button that sends `text` as the user's message when tapped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickReply {
    pub label: String,
    pub text: String,
}

impl QuickReply {
    /// Button whose label is also the text it sends.
    pub fn echo(label: impl Into<String>) -> Self {
        let label = label.into();
        Self {
            text: label.clone(),
            label,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateLayout {
    /// Single card with up to four actions.
    Buttons,
    /// Horizontally scrolling cards.
    Carousel,
}

/// Buttons or carousel template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RichTemplate {
    pub layout: TemplateLayout,
    /// Shown in notifications and on clients that cannot render templates.
    pub alt_text: String,
    pub items: Vec<MenuItem>,
}

/// One card of a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub text: String,
    pub actions: Vec<Action>,
}

/// A selectable action on a card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Action {
    /// Open a URL.
    Uri { label: String, uri: String },
    /// Send `data` back to the webhook as a postback event.
    Postback { label: String, data: String },
}

impl Action {
    pub fn label(&self) -> &str {
        match self {
            Action::Uri { label, .. } | Action::Postback { label, .. } => label,
        }
    }
}

fn check_len(what: &str, value: &str, max: usize) -> Result<(), TemplateError> {
    if value.trim().is_empty() {
        return Err(TemplateError::Empty {
            what: what.to_string(),
        });
    }
    let len = value.chars().count();
    if len > max {
        return Err(TemplateError::TooLong {
            what: what.to_string(),
            len,
            max,
        });
    }
    Ok(())
}

fn check_count(what: &str, count: usize, max: usize) -> Result<(), TemplateError> {
    if count == 0 || count > max {
        return Err(TemplateError::Count {
            what: what.to_string(),
            count,
            min: 1,
            max,
        });
    }
    Ok(())
}

fn check_uri(what: &str, uri: &str) -> Result<(), TemplateError> {
    check_len(what, uri, MAX_URI)?;
    if !(uri.starts_with("https://") || uri.starts_with("http://")) {
        return Err(TemplateError::InvalidUri {
            what: what.to_string(),
            uri: uri.to_string(),
        });
    }
    Ok(())
}

impl Action {
    fn validate(&self, what: &str) -> Result<(), TemplateError> {
        check_len(&format!("{what} label"), self.label(), MAX_LABEL)?;
        match self {
            Action::Uri { uri, .. } => check_uri(&format!("{what} uri"), uri),
            Action::Postback { data, .. } => {
                check_len(&format!("{what} data"), data, MAX_POSTBACK_DATA)
            }
        }
    }
}

impl MenuItem {
    fn validate(&self, what: &str, max_actions: usize) -> Result<(), TemplateError> {
        if let Some(url) = &self.thumbnail_image_url {
            check_uri(&format!("{what} thumbnail"), url)?;
        }
        if let Some(title) = &self.title {
            check_len(&format!("{what} title"), title, MAX_TITLE)?;
        }
        let max_text = if self.thumbnail_image_url.is_some() || self.title.is_some() {
            MAX_TEXT_WITH_HEADER
        } else {
            MAX_TEXT_PLAIN
        };
        check_len(&format!("{what} text"), &self.text, max_text)?;
        check_count(&format!("{what} actions"), self.actions.len(), max_actions)?;
        for (i, action) in self.actions.iter().enumerate() {
            action.validate(&format!("{what} action {i}"))?;
        }
        Ok(())
    }
}

impl RichTemplate {
    /// Check the template against the messaging API's limits.
    pub fn validate(&self) -> Result<(), TemplateError> {
        check_len("alt text", &self.alt_text, MAX_ALT_TEXT)?;
        match self.layout {
            TemplateLayout::Buttons => {
                check_count("buttons items", self.items.len(), 1)?;
                for item in &self.items {
                    item.validate("buttons", MAX_BUTTON_ACTIONS)?;
                }
            }
            TemplateLayout::Carousel => {
                check_count("carousel columns", self.items.len(), MAX_CAROUSEL_COLUMNS)?;
                for (i, item) in self.items.iter().enumerate() {
                    item.validate(&format!("column {i}"), MAX_COLUMN_ACTIONS)?;
                }
                let first = self.items[0].actions.len();
                if self.items.iter().any(|c| c.actions.len() != first) {
                    return Err(TemplateError::UnevenActions);
                }
            }
        }
        Ok(())
    }
}
