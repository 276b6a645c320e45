//! Pending conversation context per user.
//!
//! When the bot asks a question that expects an answer (the yes/no survey), it records a
//! [`PendingContext`] for the user. The user's next text message is then read as the answer
//! and the context is consumed. Contexts live in memory only; a restart forgets them.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Sender identity on the chat platform (LINE user id). Opaque; compared for equality only.
pub type UserId = String;

/// What kind of answer a pending context is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextTag {
    /// The user was asked a yes/no question and the next text is the answer.
    YesNoSurvey,
}

impl ContextTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContextTag::YesNoSurvey => "yes_no_survey",
        }
    }
}

impl std::fmt::Display for ContextTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A question was asked and an answer is expected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingContext {
    pub tag: ContextTag,
}

impl PendingContext {
    pub fn yes_no_survey() -> Self {
        Self {
            tag: ContextTag::YesNoSurvey,
        }
    }
}

/// Storage for pending contexts, keyed by user.
///
/// Every operation is atomic for a single user. `take_and_clear` removes and returns the
/// context in one step, so two concurrent calls for the same user hand it to at most one caller.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Peek at the user's pending context without consuming it.
    async fn get(&self, user: &str) -> Option<PendingContext>;

    /// Record a pending context for the user, replacing any existing one.
    async fn put(&self, user: &str, context: PendingContext);

    /// Remove and return the user's pending context.
    async fn take_and_clear(&self, user: &str) -> Option<PendingContext>;
}

#[derive(Debug, Clone)]
struct Entry {
    context: PendingContext,
    stored_at: Instant,
}

/// In-memory store. With a TTL, contexts older than the TTL behave as absent.
pub struct MemorySessionStore {
    inner: Arc<RwLock<HashMap<UserId, Entry>>>,
    ttl: Option<Duration>,
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySessionStore {
    /// Store whose contexts never expire.
    pub fn new() -> Self {
        Self::with_ttl(None)
    }

    pub fn with_ttl(ttl: Option<Duration>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    fn is_live(&self, entry: &Entry, now: Instant) -> bool {
        match self.ttl {
            Some(ttl) => now.duration_since(entry.stored_at) < ttl,
            None => true,
        }
    }

    /// Drop expired contexts; returns how many were removed. No-op without a TTL.
    pub async fn purge_expired(&self) -> usize {
        if self.ttl.is_none() {
            return 0;
        }
        let now = Instant::now();
        let mut g = self.inner.write().await;
        let before = g.len();
        g.retain(|_, entry| self.is_live(entry, now));
        before - g.len()
    }

    /// Number of stored contexts, expired ones included until purged or touched.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, user: &str) -> Option<PendingContext> {
        let g = self.inner.read().await;
        g.get(user)
            .filter(|entry| self.is_live(entry, Instant::now()))
            .map(|entry| entry.context.clone())
    }

    async fn put(&self, user: &str, context: PendingContext) {
        let entry = Entry {
            context,
            stored_at: Instant::now(),
        };
        self.inner.write().await.insert(user.to_string(), entry);
    }

    async fn take_and_clear(&self, user: &str) -> Option<PendingContext> {
        let entry = self.inner.write().await.remove(user)?;
        if self.is_live(&entry, Instant::now()) {
            Some(entry.context)
        } else {
            log::debug!("pending context for {} expired ({})", user, entry.context.tag);
            None
        }
    }
}
