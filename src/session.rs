use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};

use crate::core::config::settings::SessionSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    Human,
    Ai,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMessage {
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl SessionMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatSession {
    pub id: String,
    messages: Vec<SessionMessage>,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    #[serde(skip)]
    max_messages: Option<usize>,
}

impl ChatSession {
    fn new(id: String, max_messages: Option<usize>) -> Self {
        let now = Utc::now();
        Self {
            id,
            messages: Vec::new(),
            created_at: now,
            last_active: now,
            max_messages,
        }
    }

    pub fn messages(&self) -> &[SessionMessage] {
        &self.messages
    }

    /// Appends a message, dropping the oldest ones past the configured cap.
    pub fn push(&mut self, message: SessionMessage) {
        self.last_active = message.created_at;
        self.messages.push(message);
        if let Some(max) = self.max_messages {
            if self.messages.len() > max {
                let excess = self.messages.len() - max;
                self.messages.drain(..excess);
            }
        }
    }

    /// Records one completed human/ai exchange.
    pub fn record_turn(&mut self, question: &str, answer: &str) {
        self.push(SessionMessage::new(MessageRole::Human, question));
        self.push(SessionMessage::new(MessageRole::Ai, answer));
    }

    pub fn touch(&mut self) {
        self.last_active = Utc::now();
    }
}

/// Process-wide session map. Each session sits behind its own mutex so that
/// turns on one session are serialized without blocking the others.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<Mutex<ChatSession>>>>,
    settings: SessionSettings,
}

impl SessionStore {
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            settings,
        }
    }

    /// Returns the session, creating an empty one on first access.
    pub async fn get(&self, session_id: &str) -> Arc<Mutex<ChatSession>> {
        if let Some(session) = self.sessions.read().await.get(session_id) {
            return session.clone();
        }

        let mut sessions = self.sessions.write().await;
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| {
                tracing::debug!("Creating session {}", session_id);
                Arc::new(Mutex::new(ChatSession::new(
                    session_id.to_string(),
                    self.settings.max_messages,
                )))
            })
            .clone()
    }

    /// Snapshot of a session's transcript, `None` when the id is unknown.
    pub async fn history(&self, session_id: &str) -> Option<Vec<SessionMessage>> {
        let session = self.sessions.read().await.get(session_id).cloned()?;
        let guard = session.lock().await;
        Some(guard.messages().to_vec())
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Drops sessions idle for longer than the configured TTL. Sessions whose
    /// lock is held (a turn in flight) are never evicted. Returns the number
    /// removed; always zero when no TTL is configured.
    pub async fn evict_idle(&self, now: DateTime<Utc>) -> usize {
        let Some(ttl_secs) = self.settings.idle_ttl_secs else {
            return 0;
        };
        let ttl_secs = i64::try_from(ttl_secs).unwrap_or(i64::MAX);

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|id, session| match session.try_lock() {
            Ok(guard) => {
                let keep = (now - guard.last_active).num_seconds() <= ttl_secs;
                if !keep {
                    tracing::debug!("Evicting idle session {}", id);
                }
                keep
            }
            Err(_) => true,
        });
        let removed = before - sessions.len();
        if removed > 0 {
            tracing::info!("Evicted {} idle session(s)", removed);
        }
        removed
    }

    /// Interval for the background eviction task, if eviction is enabled.
    pub fn eviction_interval(&self) -> Option<Duration> {
        self.settings
            .idle_ttl_secs
            .map(|ttl| Duration::from_secs((ttl / 2).clamp(1, 300)))
    }
}

/// Periodically evicts idle sessions until the store is dropped elsewhere.
pub fn spawn_eviction_task(store: Arc<SessionStore>) -> Option<tokio::task::JoinHandle<()>> {
    let period = store.eviction_interval()?;
    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            store.evict_idle(Utc::now()).await;
        }
    }))
}
