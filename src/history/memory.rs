use async_trait::async_trait;
use chrono::Utc;
use crate::models::chat::{ ChatMessage, Conversation, Role };
use crate::history::{ compact_turns, HistoryStore, DEFAULT_MAX_SESSIONS, PUBLIC_SESSION };
use std::collections::HashMap;
use std::error::Error;
use std::sync::Arc;
use log::debug;
use tokio::sync::RwLock;

/// Persona shared by every session seeded with it.
struct Seed {
    prompt: Arc<str>,
    timestamp: i64,
}

struct Session {
    seed: Option<Seed>,
    turns: Vec<ChatMessage>,
    last_used: u64,
}

impl Session {
    fn messages(&self) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(self.turns.len() + 1);
        if let Some(seed) = &self.seed {
            messages.push(ChatMessage {
                role: Role::System,
                content: seed.prompt.to_string(),
                timestamp: seed.timestamp,
            });
        }
        messages.extend(self.turns.iter().cloned());
        messages
    }
}

#[derive(Default)]
struct Sessions {
    by_id: HashMap<String, Session>,
    clock: u64,
}

impl Sessions {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Makes room for one more session by dropping the least recently used
    /// one. The public session is never dropped.
    fn evict_for_insert(&mut self, max_sessions: usize) {
        while self.by_id.len() >= max_sessions {
            let oldest = self.by_id
                .iter()
                .filter(|(id, _)| id.as_str() != PUBLIC_SESSION)
                .min_by_key(|(_, session)| session.last_used)
                .map(|(id, _)| id.clone());
            match oldest {
                Some(id) => {
                    debug!("Evicting idle history session {}", id);
                    self.by_id.remove(&id);
                }
                None => break,
            }
        }
    }

    fn get_or_insert(&mut self, conversation_id: &str, max_sessions: usize) -> &mut Session {
        let now = self.tick();
        if !self.by_id.contains_key(conversation_id) {
            self.evict_for_insert(max_sessions);
        }
        let session = self.by_id.entry(conversation_id.to_string()).or_insert_with(|| Session {
            seed: None,
            turns: Vec::new(),
            last_used: now,
        });
        session.last_used = now;
        session
    }
}

/// Session logs held in process memory, capped at `max_sessions` with least
/// recently used eviction.
pub struct MemoryHistoryStore {
    sessions: RwLock<Sessions>,
    max_sessions: usize,
}

impl Default for MemoryHistoryStore {
    fn default() -> Self {
        Self::with_max_sessions(DEFAULT_MAX_SESSIONS)
    }
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_sessions(max_sessions: usize) -> Self {
        Self {
            sessions: RwLock::new(Sessions::default()),
            max_sessions: max_sessions.max(1),
        }
    }

    pub fn max_sessions(&self) -> usize {
        self.max_sessions
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn seed(
        &self,
        conversation_id: &str,
        system_prompt: &Arc<str>
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_or_insert(conversation_id, self.max_sessions);
        if session.seed.is_none() && session.turns.is_empty() {
            debug!("Seeding history for session {}", conversation_id);
            session.seed = Some(Seed {
                prompt: Arc::clone(system_prompt),
                timestamp: Utc::now().timestamp(),
            });
        }
        Ok(())
    }

    async fn add_message(
        &self,
        conversation_id: &str,
        role: Role,
        content: &str
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_or_insert(conversation_id, self.max_sessions);
        session.turns.push(ChatMessage::new(role, content));
        let seeded = session.seed.is_some();
        compact_turns(&mut session.turns, seeded);
        Ok(())
    }

    async fn get_conversation(
        &self,
        conversation_id: &str
    ) -> Result<Conversation, Box<dyn Error + Send + Sync>> {
        let sessions = self.sessions.read().await;
        Ok(Conversation {
            id: conversation_id.to_string(),
            messages: sessions.by_id.get(conversation_id).map(Session::messages).unwrap_or_default(),
        })
    }

    async fn session_count(&self) -> usize {
        self.sessions.read().await.by_id.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{ HISTORY_COMPACT_THRESHOLD, HISTORY_KEEP_RECENT };

    fn persona(text: &str) -> Arc<str> {
        Arc::from(text)
    }

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let store = MemoryHistoryStore::new();
        store.seed("a", &persona("persona")).await.unwrap();
        store.add_message("a", Role::User, "hello").await.unwrap();
        store.seed("a", &persona("other persona")).await.unwrap();

        let conversation = store.get_conversation("a").await.unwrap();
        assert_eq!(conversation.messages.len(), 2);
        assert_eq!(conversation.messages[0].content, "persona");
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let store = MemoryHistoryStore::new();
        let shared = persona("persona");
        store.seed("a", &shared).await.unwrap();
        store.seed("b", &shared).await.unwrap();
        store.add_message("a", Role::User, "only in a").await.unwrap();

        let b = store.get_conversation("b").await.unwrap();
        assert_eq!(b.messages.len(), 1);
        assert_eq!(store.session_count().await, 2);
    }

    #[tokio::test]
    async fn appends_are_compacted() {
        let store = MemoryHistoryStore::new();
        store.seed("a", &persona("persona")).await.unwrap();
        for i in 0..HISTORY_COMPACT_THRESHOLD {
            store.add_message("a", Role::Assistant, &format!("reply {}", i)).await.unwrap();
        }

        let conversation = store.get_conversation("a").await.unwrap();
        assert_eq!(conversation.messages.len(), HISTORY_KEEP_RECENT + 1);
        assert_eq!(conversation.messages[0].role, Role::System);
        assert_eq!(conversation.messages[0].content, "persona");
        assert_eq!(conversation.messages.last().unwrap().content, "reply 19");
    }

    #[tokio::test]
    async fn unknown_session_is_empty() {
        let store = MemoryHistoryStore::new();
        let conversation = store.get_conversation("nobody").await.unwrap();
        assert!(conversation.messages.is_empty());
        assert_eq!(store.session_count().await, 0);
    }

    #[tokio::test]
    async fn seed_text_is_shared_not_copied() {
        let store = MemoryHistoryStore::new();
        let shared = persona("a long persona prompt");
        for i in 0..50 {
            store.seed(&format!("s{}", i), &shared).await.unwrap();
        }

        assert_eq!(Arc::strong_count(&shared), 51);
    }

    #[tokio::test]
    async fn session_count_never_exceeds_cap() {
        let store = MemoryHistoryStore::with_max_sessions(100);
        let shared = persona("persona");
        for i in 0..5000 {
            let id = format!("sess-{}", i);
            store.seed(&id, &shared).await.unwrap();
            store.add_message(&id, Role::User, "x").await.unwrap();
        }

        assert_eq!(store.session_count().await, 100);
        assert!(Arc::strong_count(&shared) <= 101);
    }

    #[tokio::test]
    async fn least_recently_used_session_is_evicted() {
        let store = MemoryHistoryStore::with_max_sessions(2);
        let shared = persona("persona");
        store.seed("old", &shared).await.unwrap();
        store.seed("busy", &shared).await.unwrap();
        store.add_message("old", Role::User, "still here").await.unwrap();

        store.seed("new", &shared).await.unwrap();

        assert_eq!(store.session_count().await, 2);
        assert_eq!(store.get_conversation("old").await.unwrap().messages.len(), 2);
        assert!(store.get_conversation("busy").await.unwrap().messages.is_empty());
    }

    #[tokio::test]
    async fn public_session_survives_eviction() {
        let store = MemoryHistoryStore::with_max_sessions(2);
        let shared = persona("persona");
        store.seed(PUBLIC_SESSION, &shared).await.unwrap();
        for i in 0..10 {
            store.seed(&format!("s{}", i), &shared).await.unwrap();
        }

        assert_eq!(store.session_count().await, 2);
        assert_eq!(store.get_conversation(PUBLIC_SESSION).await.unwrap().messages.len(), 1);
    }

    #[tokio::test]
    async fn zero_cap_still_keeps_one_session() {
        let store = MemoryHistoryStore::with_max_sessions(0);
        assert_eq!(store.max_sessions(), 1);
        store.seed("a", &persona("persona")).await.unwrap();
        assert_eq!(store.session_count().await, 1);
    }
}
