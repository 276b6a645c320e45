//! Reply strategies: one per dispatch intent.
//!
//! Each strategy turns an intent into an [`OutboundMessage`] built from the configured reply
//! content. Strategies are pure; the only follow-up they can ask for is a pending context,
//! returned by [`ReplyBuilder::follow_up`] for the router to register.

use crate::classify::{DispatchIntent, SurveyAnswer};
use crate::config::RepliesConfig;
use crate::outbound::{OutboundMessage, QuickReply};
use crate::session::PendingContext;
use std::sync::Arc;

/// Builds replies from configured content. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ReplyBuilder {
    replies: Arc<RepliesConfig>,
}

impl Default for ReplyBuilder {
    fn default() -> Self {
        Self::new(RepliesConfig::default())
    }
}

impl ReplyBuilder {
    pub fn new(replies: RepliesConfig) -> Self {
        Self {
            replies: Arc::new(replies),
        }
    }

    /// Reply for an intent; `None` for [`DispatchIntent::Unsupported`].
    pub fn build(&self, intent: &DispatchIntent) -> Option<OutboundMessage> {
        let msg = match intent {
            DispatchIntent::ShowStickerSample => self.sticker_sample(),
            DispatchIntent::ShowButtonMenu => self.button_menu(),
            DispatchIntent::ShowCarouselMenu => self.carousel_menu(),
            DispatchIntent::StartYesNoSurvey => self.survey_question(),
            DispatchIntent::ContinueYesNoSurvey(answer) => self.survey_answer(*answer),
            DispatchIntent::EchoText(text) => OutboundMessage::text(text.clone()),
            DispatchIntent::StickerAck {
                sticker_id,
                resource_type,
            } => self.sticker_ack(sticker_id, resource_type),
            DispatchIntent::Unsupported => return None,
        };
        Some(msg)
    }

    /// Context to register once the reply for `intent` has been built, if it asks a question.
    pub fn follow_up(intent: &DispatchIntent) -> Option<PendingContext> {
        match intent {
            DispatchIntent::StartYesNoSurvey => Some(PendingContext::yes_no_survey()),
            _ => None,
        }
    }

    pub fn sticker_sample(&self) -> OutboundMessage {
        let s = &self.replies.sticker_sample;
        OutboundMessage::Sticker {
            package_id: s.package_id.clone(),
            sticker_id: s.sticker_id.clone(),
        }
    }

    pub fn button_menu(&self) -> OutboundMessage {
        OutboundMessage::Template(self.replies.buttons.clone())
    }

    pub fn carousel_menu(&self) -> OutboundMessage {
        OutboundMessage::Template(self.replies.carousel.clone())
    }

    pub fn survey_question(&self) -> OutboundMessage {
        let survey = &self.replies.survey;
        OutboundMessage::Text {
            text: survey.question.clone(),
            quick_replies: vec![
                QuickReply::echo(survey.yes_label.clone()),
                QuickReply::echo(survey.no_label.clone()),
            ],
        }
    }

    pub fn survey_answer(&self, answer: SurveyAnswer) -> OutboundMessage {
        let survey = &self.replies.survey;
        let text = match answer {
            SurveyAnswer::Yes => &survey.affirmative,
            SurveyAnswer::No => &survey.dismissive,
            SurveyAnswer::Unclear => &survey.clarify,
        };
        OutboundMessage::text(text.clone())
    }

    pub fn sticker_ack(&self, sticker_id: &str, resource_type: &str) -> OutboundMessage {
        let text = fill_placeholders(
            &self.replies.sticker_ack,
            &[("{id}", sticker_id), ("{resourceType}", resource_type)],
        );
        OutboundMessage::text(text)
    }
}

/// Substitute every placeholder in one left-to-right pass; inserted values are never rescanned.
fn fill_placeholders(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    'scan: while !rest.is_empty() {
        for &(placeholder, value) in values {
            if let Some(tail) = rest.strip_prefix(placeholder) {
                out.push_str(value);
                rest = tail;
                continue 'scan;
            }
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            out.push(c);
        }
        rest = chars.as_str();
    }
    out
}
