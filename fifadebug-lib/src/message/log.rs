use std::collections::VecDeque;

pub const LOG_CAPACITY: usize = 1000;

/// Insertion-ordered log of intercepted messages, bounded at [`LOG_CAPACITY`]
/// entries with strict FIFO eviction. Survives device resets and destroys;
/// only the overlay's clear action empties it.
#[derive(Default)]
pub struct MessageLog {
    entries: VecDeque<String>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, message: impl Into<String>) {
        while self.entries.len() >= LOG_CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(message.into());
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// Serializes the full log as one buffer. Entries are joined with no
    /// delimiter; sources embed their own line terminators if they want them.
    pub fn export(&self) -> String {
        let mut buffer = String::with_capacity(self.entries.iter().map(String::len).sum());
        for entry in &self.entries {
            buffer.push_str(entry);
        }
        buffer
    }
}
