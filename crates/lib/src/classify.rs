//! Message classification: inbound message → dispatch intent.
//!
//! Text is matched exactly (after trim + lowercase) against a fixed vocabulary. There is no
//! tokenization or partial matching; anything outside the vocabulary is echoed back.

use crate::channels::{InboundMessage, MessageKind};

/// What the bot should do with a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchIntent {
    ShowStickerSample,
    ShowButtonMenu,
    ShowCarouselMenu,
    StartYesNoSurvey,
    /// Echo the original text back (case preserved).
    EchoText(String),
    StickerAck {
        sticker_id: String,
        resource_type: String,
    },
    ContinueYesNoSurvey(SurveyAnswer),
    /// No reply; the event is dropped.
    Unsupported,
}

/// The user's answer to the yes/no survey.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurveyAnswer {
    Yes,
    No,
    Unclear,
}

/// Trim and lowercase for matching. The original text is kept separately for echoing.
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Classify text that is not a continuation of a pending question.
pub fn classify_text(text: &str) -> DispatchIntent {
    match normalize(text).as_str() {
        "sticker" | "stickers" => DispatchIntent::ShowStickerSample,
        "button" | "buttons" => DispatchIntent::ShowButtonMenu,
        "carousel" => DispatchIntent::ShowCarouselMenu,
        "botnoi" => DispatchIntent::StartYesNoSurvey,
        _ => DispatchIntent::EchoText(text.to_string()),
    }
}

/// Classify a message without regard to any pending context.
pub fn classify(message: &InboundMessage) -> DispatchIntent {
    match &message.kind {
        MessageKind::Text { text } => classify_text(text),
        MessageKind::Sticker {
            sticker_id,
            resource_type,
            ..
        } => DispatchIntent::StickerAck {
            sticker_id: sticker_id.clone(),
            resource_type: resource_type.clone(),
        },
        MessageKind::Other { .. } => DispatchIntent::Unsupported,
    }
}

/// Read a reply to the yes/no survey.
pub fn interpret_answer(text: &str) -> SurveyAnswer {
    match normalize(text).as_str() {
        "yes" => SurveyAnswer::Yes,
        "no" => SurveyAnswer::No,
        _ => SurveyAnswer::Unclear,
    }
}
