use crate::types::RecentWinner;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Bounded list of the latest winners, oldest evicted first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentWinners {
    capacity: usize,
    entries: VecDeque<RecentWinner>,
}

impl RecentWinners {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, winner: RecentWinner) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(winner);
    }

    /// Oldest first.
    pub fn to_vec(&self) -> Vec<RecentWinner> {
        self.entries.iter().cloned().collect()
    }

    pub fn latest(&self) -> Option<&RecentWinner> {
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

    pub(crate) fn resize(&mut self, capacity: usize) {
        self.capacity = capacity;
        while self.entries.len() > capacity {
            self.entries.pop_front();
        }
    }
}
