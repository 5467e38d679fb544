mod memory;

pub use memory::MemoryHistoryStore;

use async_trait::async_trait;
use log::info;
use std::error::Error;
use std::sync::Arc;
use crate::models::chat::{ ChatMessage, Conversation, Role };

/// Session used when a caller does not identify itself. Every anonymous
/// caller shares this log.
pub const PUBLIC_SESSION: &str = "public";

/// A session log longer than this is compacted on the next append.
pub const HISTORY_COMPACT_THRESHOLD: usize = 20;

/// Entries kept after the seed when compacting.
pub const HISTORY_KEEP_RECENT: usize = 10;

/// Sessions held in memory before the least recently used one is dropped.
pub const DEFAULT_MAX_SESSIONS: usize = 1000;

#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Creates the session with `system_prompt` as its first entry. No-op if
    /// the session already exists.
    async fn seed(
        &self,
        conversation_id: &str,
        system_prompt: &Arc<str>
    ) -> Result<(), Box<dyn Error + Send + Sync>>;

    async fn add_message(
        &self,
        conversation_id: &str,
        role: Role,
        content: &str
    ) -> Result<(), Box<dyn Error + Send + Sync>>;

    async fn get_conversation(
        &self,
        conversation_id: &str
    ) -> Result<Conversation, Box<dyn Error + Send + Sync>>;

    async fn session_count(&self) -> usize;
}

pub fn initialize_history_store(max_sessions: usize) -> Arc<dyn HistoryStore> {
    info!(
        "Chat history kept in memory for up to {} sessions (compacted above {} entries to seed + last {})",
        max_sessions,
        HISTORY_COMPACT_THRESHOLD,
        HISTORY_KEEP_RECENT
    );
    Arc::new(MemoryHistoryStore::with_max_sessions(max_sessions))
}

/// Keeps entry 0 and the most recent `HISTORY_KEEP_RECENT` entries once the
/// log exceeds `HISTORY_COMPACT_THRESHOLD`.
pub fn compact(messages: &mut Vec<ChatMessage>) {
    if messages.len() <= HISTORY_COMPACT_THRESHOLD {
        return;
    }
    let tail_start = messages.len() - HISTORY_KEEP_RECENT;
    messages.drain(1..tail_start);
}

/// `compact` for a log whose seed entry is kept outside `turns`.
pub fn compact_turns(turns: &mut Vec<ChatMessage>, seeded: bool) {
    if !seeded {
        return compact(turns);
    }
    if turns.len() + 1 <= HISTORY_COMPACT_THRESHOLD {
        return;
    }
    let excess = turns.len() - HISTORY_KEEP_RECENT;
    turns.drain(..excess);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log_of(len: usize) -> Vec<ChatMessage> {
        let mut messages = vec![ChatMessage::new(Role::System, "seed")];
        for i in 1..len {
            messages.push(ChatMessage::new(Role::Assistant, format!("reply {}", i)));
        }
        messages
    }

    #[test]
    fn leaves_short_logs_alone() {
        let mut messages = log_of(HISTORY_COMPACT_THRESHOLD);
        compact(&mut messages);
        assert_eq!(messages.len(), HISTORY_COMPACT_THRESHOLD);
    }

    #[test]
    fn keeps_seed_and_most_recent_entries() {
        let mut messages = log_of(HISTORY_COMPACT_THRESHOLD + 1);
        compact(&mut messages);

        assert_eq!(messages.len(), HISTORY_KEEP_RECENT + 1);
        assert_eq!(messages[0].content, "seed");
        assert_eq!(messages[1].content, "reply 11");
        assert_eq!(messages.last().unwrap().content, "reply 20");
    }

    #[test]
    fn compaction_bound_holds_for_any_length() {
        for len in HISTORY_COMPACT_THRESHOLD + 1..60 {
            let mut messages = log_of(len);
            compact(&mut messages);
            assert_eq!(messages[0].role, Role::System);
            assert!(messages.len() <= HISTORY_KEEP_RECENT + 1);
            assert_eq!(messages.last().unwrap().content, format!("reply {}", len - 1));
        }
    }

    #[test]
    fn detached_seed_follows_the_same_rule() {
        let mut full = log_of(HISTORY_COMPACT_THRESHOLD + 5);
        let mut turns = full[1..].to_vec();

        compact(&mut full);
        compact_turns(&mut turns, true);

        let kept: Vec<&str> = full[1..].iter().map(|m| m.content.as_str()).collect();
        let detached: Vec<&str> = turns.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(detached, kept);
        assert_eq!(turns.len(), HISTORY_KEEP_RECENT);
        assert_eq!(turns.first().unwrap().content, "reply 15");
        assert_eq!(turns.last().unwrap().content, "reply 24");
    }

    #[test]
    fn unseeded_turns_keep_their_first_entry() {
        let mut turns = log_of(HISTORY_COMPACT_THRESHOLD + 1);
        compact_turns(&mut turns, false);
        assert_eq!(turns.len(), HISTORY_KEEP_RECENT + 1);
        assert_eq!(turns[0].content, "seed");
    }
}
