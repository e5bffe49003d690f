//! Conversation memory
//!
//! A bounded, ordered log of completed exchanges. Appends and evictions happen under
//! one lock, so concurrent queries can never reorder turns or push the log past
//! its capacity.

use crate::retrieval::SearchResult;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use uuid::Uuid;

/// One completed exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub id: Uuid,
    pub user_query: String,
    /// Evidence the answer was generated from
    pub retrieved_context: Vec<SearchResult>,
    pub generated_response: String,
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn new(
        user_query: impl Into<String>,
        retrieved_context: Vec<SearchResult>,
        generated_response: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_query: user_query.into(),
            retrieved_context,
            generated_response: generated_response.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Display form of a turn for history views
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub user_query: String,
    pub response: String,
    /// RFC 3339 timestamp
    pub timestamp: String,
    pub sources: Vec<String>,
}

impl From<&ConversationTurn> for HistoryEntry {
    fn from(turn: &ConversationTurn) -> Self {
        Self {
            user_query: turn.user_query.clone(),
            response: turn.generated_response.clone(),
            timestamp: turn.timestamp.to_rfc3339(),
            sources: turn
                .retrieved_context
                .iter()
                .map(|r| r.source.clone())
                .collect(),
        }
    }
}

/// Bounded FIFO log of conversation turns
#[derive(Debug)]
pub struct ConversationMemory {
    turns: Mutex<VecDeque<ConversationTurn>>,
    capacity: usize,
}

impl ConversationMemory {
    /// Create an empty memory holding at most `capacity` turns (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            turns: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a turn, evicting the oldest turns beyond capacity
    pub fn append(&self, turn: ConversationTurn) {
        let mut turns = self.turns.lock();
        turns.push_back(turn);
        while turns.len() > self.capacity {
            turns.pop_front();
        }
    }

    /// The last `n` turns, oldest first
    pub fn recent(&self, n: usize) -> Vec<ConversationTurn> {
        let turns = self.turns.lock();
        let skip = turns.len().saturating_sub(n);
        turns.iter().skip(skip).cloned().collect()
    }

    /// Remove every turn
    pub fn clear(&self) {
        self.turns.lock().clear();
    }

    /// Copy of every retained turn, oldest first
    pub fn snapshot(&self) -> Vec<ConversationTurn> {
        self.turns.lock().iter().cloned().collect()
    }

    /// Retained turns in display form
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.turns.lock().iter().map(HistoryEntry::from).collect()
    }

    pub fn len(&self) -> usize {
        self.turns.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ConversationMemory {
    fn default() -> Self {
        Self::new(10)
    }
}
