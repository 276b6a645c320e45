//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use replybot::channels::ReplySender;
use replybot::error::DeliveryError;
use replybot::outbound::OutboundMessage;
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::Mutex;

/// Records every reply; fails for reply tokens listed in `fail_tokens`.
/// With a `delay`, each send sleeps first, like a slow reply API.
#[derive(Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<(String, OutboundMessage)>>,
    fail_tokens: HashSet<String>,
    fail_all: bool,
    delay: Option<Duration>,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail_all: true,
            ..Self::default()
        }
    }

    pub fn failing_for(tokens: &[&str]) -> Self {
        Self {
            fail_tokens: tokens.iter().map(|t| t.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub async fn sent(&self) -> Vec<(String, OutboundMessage)> {
        self.sent.lock().await.clone()
    }

    pub async fn last(&self) -> Option<OutboundMessage> {
        self.sent.lock().await.last().map(|(_, m)| m.clone())
    }
}

#[async_trait]
impl ReplySender for RecordingSender {
    fn id(&self) -> &str {
        "recording"
    }

    async fn send_reply(
        &self,
        reply_token: &str,
        message: &OutboundMessage,
    ) -> Result<(), DeliveryError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_all || self.fail_tokens.contains(reply_token) {
            return Err(DeliveryError::Status {
                status: 400,
                body: format!("refused {}", reply_token),
            });
        }
        self.sent
            .lock()
            .await
            .push((reply_token.to_string(), message.clone()));
        Ok(())
    }
}
