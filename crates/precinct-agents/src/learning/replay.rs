//! Fixed-capacity FIFO transition store.

use std::collections::VecDeque;

use rand::Rng;

/// Bounded experience buffer. Inserting into a full buffer evicts the
/// oldest entry.
#[derive(Debug, Clone)]
pub struct ReplayBuffer<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> ReplayBuffer<T> {
    /// Create an empty buffer. A zero capacity is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity.min(1_024)),
            capacity,
        }
    }

    /// Append an item, returning the evicted oldest item if the buffer was full.
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.items.len() >= self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        evicted
    }

    /// Number of stored items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the buffer holds nothing.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Maximum number of stored items.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Items from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    /// Uniformly sample up to `n` distinct items.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R, n: usize) -> Vec<&T> {
        let amount = n.min(self.items.len());
        rand::seq::index::sample(rng, self.items.len(), amount)
            .into_iter()
            .filter_map(|i| self.items.get(i))
            .collect()
    }

    /// Drop every stored item.
    pub fn clear(&mut self) {
        self.items.clear();
    }
}
