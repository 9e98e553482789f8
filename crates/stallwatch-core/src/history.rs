use std::collections::VecDeque;

use stallwatch_types::ConversationState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    /// Normalized confident text of the sample.
    pub text: String,
    pub state: ConversationState,
}

/// Bounded ring of recent classified samples, oldest first.
#[derive(Debug, Clone)]
pub struct RecentHistory {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl RecentHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, entry: HistoryEntry) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn last(&self) -> Option<&HistoryEntry> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    /// How many of the most recent samples carried exactly `text`.
    pub fn unchanged_run(&self, text: &str) -> u32 {
        self.entries
            .iter()
            .rev()
            .take_while(|e| e.text == text)
            .count() as u32
    }
}
