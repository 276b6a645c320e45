//! Event routing: inbound event → intent → reply → delivery.
//!
//! For text messages the [`ContextResolver`] consults the session store first: a pending
//! context always wins over vocabulary matching, and it is consumed by that one message.
//! Each event ends in exactly one [`EventOutcome`]; failures are logged and never cross the
//! event boundary.

use crate::channels::{InboundEvent, InboundMessage, MessageKind, ReplySender};
use crate::classify::{self, DispatchIntent};
use crate::config::ContextRegistration;
use crate::reply::ReplyBuilder;
use crate::session::{ContextTag, SessionStore};
use futures_util::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;

/// Why an event got no reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// Not a message event (follow, postback, ...) or a message we cannot answer.
    UnsupportedEvent(String),
    /// Message kind with no reply strategy (image, video, ...).
    UnsupportedMessage(String),
}

/// Terminal state of one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    Replied,
    Dropped(DropReason),
    /// Delivery failed; the error text is kept for logs and tests.
    Failed(String),
}

/// Decides the intent for a message, giving pending contexts precedence.
#[derive(Clone)]
pub struct ContextResolver {
    sessions: Arc<dyn SessionStore>,
}

impl ContextResolver {
    pub fn new(sessions: Arc<dyn SessionStore>) -> Self {
        Self { sessions }
    }

    /// Intent for `message`. Text consumes the user's pending context if one exists;
    /// stickers and other kinds never touch the store.
    pub async fn resolve(&self, message: &InboundMessage) -> DispatchIntent {
        let MessageKind::Text { text } = &message.kind else {
            return classify::classify(message);
        };
        match self.sessions.take_and_clear(&message.user_id).await {
            Some(context) => {
                log::debug!("continuing {} for {}", context.tag, message.user_id);
                match context.tag {
                    ContextTag::YesNoSurvey => {
                        DispatchIntent::ContinueYesNoSurvey(classify::interpret_answer(text))
                    }
                }
            }
            None => classify::classify_text(text),
        }
    }
}

/// Top-level entry point for webhook events.
pub struct EventRouter {
    resolver: ContextResolver,
    sessions: Arc<dyn SessionStore>,
    replies: ReplyBuilder,
    sender: Arc<dyn ReplySender>,
    registration: ContextRegistration,
}

impl EventRouter {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        replies: ReplyBuilder,
        sender: Arc<dyn ReplySender>,
        registration: ContextRegistration,
    ) -> Self {
        Self {
            resolver: ContextResolver::new(sessions.clone()),
            sessions,
            replies,
            sender,
            registration,
        }
    }

    /// Handle every event of one delivery. Each user's messages are handled in delivery order;
    /// different users (and non-message events) run concurrently. The outcomes are returned
    /// in input order.
    pub async fn handle_events(&self, events: Vec<InboundEvent>) -> Vec<EventOutcome> {
        let mut lanes: Vec<Vec<(usize, InboundEvent)>> = Vec::new();
        let mut lane_of_user: HashMap<String, usize> = HashMap::new();
        for (index, event) in events.into_iter().enumerate() {
            let lane = match &event {
                InboundEvent::Message(message) => {
                    *lane_of_user
                        .entry(message.user_id.clone())
                        .or_insert_with(|| {
                            lanes.push(Vec::new());
                            lanes.len() - 1
                        })
                }
                InboundEvent::Other { .. } => {
                    lanes.push(Vec::new());
                    lanes.len() - 1
                }
            };
            lanes[lane].push((index, event));
        }

        let handled = join_all(lanes.into_iter().map(|lane| async move {
            let mut outcomes = Vec::with_capacity(lane.len());
            for (index, event) in lane {
                outcomes.push((index, self.handle_event(event).await));
            }
            outcomes
        }))
        .await;

        let mut outcomes: Vec<(usize, EventOutcome)> = handled.into_iter().flatten().collect();
        outcomes.sort_by_key(|(index, _)| *index);
        outcomes.into_iter().map(|(_, outcome)| outcome).collect()
    }

    pub async fn handle_event(&self, event: InboundEvent) -> EventOutcome {
        match event {
            InboundEvent::Message(message) => self.handle_message(message).await,
            InboundEvent::Other { event_type } => {
                log::info!("unsupported event type: {}", event_type);
                EventOutcome::Dropped(DropReason::UnsupportedEvent(event_type))
            }
        }
    }

    async fn handle_message(&self, message: InboundMessage) -> EventOutcome {
        let intent = self.resolver.resolve(&message).await;
        let Some(reply) = self.replies.build(&intent) else {
            let kind = message.kind.name().to_string();
            log::info!("unsupported message content from {}: {}", message.user_id, kind);
            return EventOutcome::Dropped(DropReason::UnsupportedMessage(kind));
        };
        let follow_up = ReplyBuilder::follow_up(&intent);

        if self.registration == ContextRegistration::Eager {
            if let Some(context) = &follow_up {
                self.sessions.put(&message.user_id, context.clone()).await;
                log::debug!("registered {} for {}", context.tag, message.user_id);
            }
        }

        match self.sender.send_reply(&message.reply_token, &reply).await {
            Ok(()) => {
                if self.registration == ContextRegistration::Confirmed {
                    if let Some(context) = follow_up {
                        log::debug!("registered {} for {}", context.tag, message.user_id);
                        self.sessions.put(&message.user_id, context).await;
                    }
                }
                log::info!(
                    "sent {} reply to {} via {}",
                    reply.kind(),
                    message.user_id,
                    self.sender.id()
                );
                EventOutcome::Replied
            }
            Err(e) => {
                log::warn!("{} reply to {} failed: {}", reply.kind(), message.user_id, e);
                EventOutcome::Failed(e.to_string())
            }
        }
    }
}
