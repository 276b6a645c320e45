//! End-to-end routing: events in, replies out, pending contexts in between.

mod common;

use common::RecordingSender;
use replybot::channels::{InboundEvent, InboundMessage, MessageKind};
use replybot::config::{ContextRegistration, RepliesConfig};
use replybot::outbound::{OutboundMessage, QuickReply};
use replybot::reply::ReplyBuilder;
use replybot::router::{DropReason, EventOutcome, EventRouter};
use replybot::session::{MemorySessionStore, PendingContext, SessionStore};
use std::sync::Arc;
use std::time::Duration;

const AFFIRMATIVE: &str = "I\u{2019}m glad you like Botnoi, because I like too.";
const CLARIFY: &str = "What did you mean by that.";

fn setup(
    sender: RecordingSender,
    registration: ContextRegistration,
) -> (EventRouter, Arc<MemorySessionStore>, Arc<RecordingSender>) {
    let store = Arc::new(MemorySessionStore::new());
    let sender = Arc::new(sender);
    let router = EventRouter::new(
        store.clone(),
        ReplyBuilder::default(),
        sender.clone(),
        registration,
    );
    (router, store, sender)
}

fn text(user: &str, token: &str, text: &str) -> InboundEvent {
    InboundEvent::Message(InboundMessage::text(user, token, text))
}

#[tokio::test]
async fn survey_then_yes() {
    let (router, store, sender) = setup(RecordingSender::new(), ContextRegistration::Eager);

    let out = router.handle_event(text("U1", "r1", "botnoi")).await;
    assert_eq!(out, EventOutcome::Replied);
    assert_eq!(
        sender.last().await,
        Some(OutboundMessage::Text {
            text: "Do you like botnoi?".into(),
            quick_replies: vec![QuickReply::echo("Yes"), QuickReply::echo("No")],
        })
    );
    assert_eq!(store.get("U1").await, Some(PendingContext::yes_no_survey()));

    let out = router.handle_event(text("U1", "r2", "Yes")).await;
    assert_eq!(out, EventOutcome::Replied);
    assert_eq!(sender.last().await, Some(OutboundMessage::text(AFFIRMATIVE)));
    assert_eq!(store.get("U1").await, None);
}

#[tokio::test]
async fn survey_then_unclear_answer() {
    let (router, store, sender) = setup(RecordingSender::new(), ContextRegistration::Eager);
    router.handle_event(text("U1", "r1", "botnoi")).await;
    router.handle_event(text("U1", "r2", "maybe")).await;
    assert_eq!(sender.last().await, Some(OutboundMessage::text(CLARIFY)));
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn context_is_single_use() {
    let (router, _store, sender) = setup(RecordingSender::new(), ContextRegistration::Eager);
    router.handle_event(text("U1", "r1", "botnoi")).await;
    // Keyword is read as the survey answer...
    router.handle_event(text("U1", "r2", "sticker")).await;
    assert_eq!(sender.last().await, Some(OutboundMessage::text(CLARIFY)));
    // ...and the next one is a fresh command again.
    router.handle_event(text("U1", "r3", "sticker")).await;
    assert_eq!(
        sender.last().await,
        Some(OutboundMessage::Sticker {
            package_id: "1".into(),
            sticker_id: "1".into()
        })
    );
}

#[tokio::test]
async fn carousel_keyword_sends_configured_columns() {
    let (router, _store, sender) = setup(RecordingSender::new(), ContextRegistration::Eager);
    router.handle_event(text("U1", "r1", "CAROUSEL")).await;
    let expected = RepliesConfig::default().carousel;
    assert_eq!(sender.last().await, Some(OutboundMessage::Template(expected)));
}

#[tokio::test]
async fn echo_preserves_case() {
    let (router, _store, sender) = setup(RecordingSender::new(), ContextRegistration::Eager);
    router.handle_event(text("U1", "r1", "  Hello World ")).await;
    assert_eq!(
        sender.last().await,
        Some(OutboundMessage::text("  Hello World "))
    );
}

#[tokio::test]
async fn unsupported_event_is_dropped_without_side_effects() {
    let (router, store, sender) = setup(RecordingSender::new(), ContextRegistration::Eager);
    store.put("U1", PendingContext::yes_no_survey()).await;

    let out = router
        .handle_event(InboundEvent::Other {
            event_type: "follow".into(),
        })
        .await;
    assert_eq!(
        out,
        EventOutcome::Dropped(DropReason::UnsupportedEvent("follow".into()))
    );

    let image = InboundEvent::Message(InboundMessage {
        user_id: "U1".into(),
        reply_token: "r1".into(),
        kind: MessageKind::Other {
            message_type: "image".into(),
        },
    });
    assert_eq!(
        router.handle_event(image).await,
        EventOutcome::Dropped(DropReason::UnsupportedMessage("image".into()))
    );

    assert!(sender.sent().await.is_empty());
    assert_eq!(store.get("U1").await, Some(PendingContext::yes_no_survey()));
}

#[tokio::test]
async fn sticker_ack_ignores_pending_context() {
    let (router, store, sender) = setup(RecordingSender::new(), ContextRegistration::Eager);
    store.put("U1", PendingContext::yes_no_survey()).await;
    let sticker = InboundEvent::Message(InboundMessage {
        user_id: "U1".into(),
        reply_token: "r1".into(),
        kind: MessageKind::Sticker {
            package_id: "446".into(),
            sticker_id: "1988".into(),
            resource_type: "STATIC".into(),
        },
    });
    router.handle_event(sticker).await;
    assert_eq!(
        sender.last().await,
        Some(OutboundMessage::text(
            "sticker id is 1988, stickerResourceType is STATIC"
        ))
    );
    assert!(store.get("U1").await.is_some());
}

#[tokio::test]
async fn eager_registration_survives_failed_delivery() {
    let (router, store, _sender) = setup(RecordingSender::failing(), ContextRegistration::Eager);
    let out = router.handle_event(text("U1", "r1", "botnoi")).await;
    assert!(matches!(out, EventOutcome::Failed(_)));
    assert_eq!(store.get("U1").await, Some(PendingContext::yes_no_survey()));
}

#[tokio::test]
async fn confirmed_registration_requires_delivery() {
    let (router, store, _sender) =
        setup(RecordingSender::failing(), ContextRegistration::Confirmed);
    let out = router.handle_event(text("U1", "r1", "botnoi")).await;
    assert!(matches!(out, EventOutcome::Failed(_)));
    assert_eq!(store.get("U1").await, None);

    let (router, store, _sender) = setup(RecordingSender::new(), ContextRegistration::Confirmed);
    router.handle_event(text("U1", "r1", "botnoi")).await;
    assert_eq!(store.get("U1").await, Some(PendingContext::yes_no_survey()));
}

#[tokio::test]
async fn failed_event_does_not_affect_siblings() {
    let (router, _store, sender) = setup(
        RecordingSender::failing_for(&["r2"]),
        ContextRegistration::Eager,
    );
    let outcomes = router
        .handle_events(vec![
            text("U1", "r1", "hello"),
            text("U2", "r2", "buttons"),
            InboundEvent::Other {
                event_type: "unfollow".into(),
            },
            text("U3", "r3", "stickers"),
        ])
        .await;
    assert_eq!(outcomes[0], EventOutcome::Replied);
    assert!(matches!(outcomes[1], EventOutcome::Failed(_)));
    assert!(matches!(outcomes[2], EventOutcome::Dropped(_)));
    assert_eq!(outcomes[3], EventOutcome::Replied);

    let mut tokens: Vec<String> = sender.sent().await.into_iter().map(|(t, _)| t).collect();
    tokens.sort();
    assert_eq!(tokens, vec!["r1".to_string(), "r3".to_string()]);
}

#[tokio::test]
async fn one_reply_per_event() {
    let (router, _store, sender) = setup(RecordingSender::new(), ContextRegistration::Eager);
    router
        .handle_events(vec![
            text("U1", "r1", "botnoi"),
            text("U2", "r2", "carousel"),
            text("U3", "r3", "whatever"),
        ])
        .await;
    let mut tokens: Vec<String> = sender.sent().await.into_iter().map(|(t, _)| t).collect();
    tokens.sort();
    assert_eq!(tokens, vec!["r1", "r2", "r3"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_answers_consume_context_once() {
    for _ in 0..20 {
        let (router, store, sender) = setup(RecordingSender::new(), ContextRegistration::Eager);
        let router = Arc::new(router);
        store.put("U1", PendingContext::yes_no_survey()).await;

        let a = tokio::spawn({
            let router = router.clone();
            async move { router.handle_event(text("U1", "a", "yes")).await }
        });
        let b = tokio::spawn({
            let router = router.clone();
            async move { router.handle_event(text("U1", "b", "yes")).await }
        });
        a.await.unwrap();
        b.await.unwrap();

        let sent = sender.sent().await;
        let affirmative = sent
            .iter()
            .filter(|(_, m)| *m == OutboundMessage::text(AFFIRMATIVE))
            .count();
        let echoed = sent
            .iter()
            .filter(|(_, m)| *m == OutboundMessage::text("yes"))
            .count();
        assert_eq!((affirmative, echoed), (1, 1));
        assert!(store.is_empty().await);
    }
}

#[tokio::test]
async fn same_user_batch_is_handled_in_delivery_order() {
    let (router, store, sender) = setup(
        RecordingSender::with_delay(Duration::from_millis(20)),
        ContextRegistration::Confirmed,
    );

    let outcomes = router
        .handle_events(vec![text("U1", "r1", "botnoi"), text("U1", "r2", "yes")])
        .await;
    assert_eq!(outcomes, vec![EventOutcome::Replied, EventOutcome::Replied]);

    let sent = sender.sent().await;
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].0, "r1");
    assert_eq!(sent[1], ("r2".to_string(), OutboundMessage::text(AFFIRMATIVE)));
    assert!(store.is_empty().await);

    router.handle_event(text("U1", "r3", "carousel")).await;
    assert!(matches!(
        sender.last().await,
        Some(OutboundMessage::Template(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn different_users_in_one_batch_are_not_serialized() {
    let (router, _store, sender) = setup(
        RecordingSender::with_delay(Duration::from_millis(100)),
        ContextRegistration::Eager,
    );

    let started = tokio::time::Instant::now();
    let outcomes = router
        .handle_events(vec![
            text("U1", "r1", "hello"),
            text("U2", "r2", "hello"),
            text("U1", "r3", "again"),
        ])
        .await;
    assert_eq!(outcomes, vec![EventOutcome::Replied; 3]);
    // U1 sends twice in sequence; U2 overlaps with U1's first reply.
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(200), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(300), "{elapsed:?}");

    let u1: Vec<String> = sender
        .sent()
        .await
        .into_iter()
        .filter(|(t, _)| t != "r2")
        .map(|(t, _)| t)
        .collect();
    assert_eq!(u1, vec!["r1", "r3"]);
}
