//! Bounded overwrite queue.
//!
//! A fixed-capacity FIFO that evicts its oldest element instead of rejecting
//! new input. Used wherever only the most recent N items matter, such as
//! lifecycle history and statistics windows.
//!
//! The queue performs no internal locking; wrap it in a lock to share it
//! between threads.

use crate::error::QueueError;
use std::collections::vec_deque::{self, VecDeque};

/// Fixed-capacity FIFO with overwrite-on-full semantics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundedQueue<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> BoundedQueue<T> {
    /// Create an empty queue holding at most `capacity` elements
    pub fn new(capacity: usize) -> Result<Self, QueueError> {
        if capacity == 0 {
            return Err(QueueError::ZeroCapacity);
        }
        Ok(Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        })
    }

    /// Append `value`, evicting and returning the oldest element if full
    pub fn enqueue(&mut self, value: T) -> Option<T> {
        let evicted = if self.items.len() == self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(value);
        evicted
    }

    /// Remove and return the oldest element
    pub fn dequeue(&mut self) -> Result<T, QueueError> {
        self.items.pop_front().ok_or(QueueError::EmptyQueue)
    }

    /// Return the oldest element without removing it
    pub fn peek(&self) -> Result<&T, QueueError> {
        self.items.front().ok_or(QueueError::EmptyQueue)
    }

    /// Return the element at `index`, counting from the oldest
    pub fn get(&self, index: usize) -> Result<&T, QueueError> {
        self.items.get(index).ok_or(QueueError::IndexOutOfRange {
            index,
            len: self.items.len(),
        })
    }

    /// Maximum number of elements
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current number of elements
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when no elements are stored
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// True when the next enqueue will evict
    pub fn is_full(&self) -> bool {
        self.items.len() == self.capacity
    }

    /// Remove every element
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Iterate oldest to newest
    pub fn iter(&self) -> vec_deque::Iter<'_, T> {
        self.items.iter()
    }
}

impl<T: Clone> BoundedQueue<T> {
    /// Snapshot of the contents, oldest first
    pub fn to_vec(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }
}

impl<'a, T> IntoIterator for &'a BoundedQueue<T> {
    type Item = &'a T;
    type IntoIter = vec_deque::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T> IntoIterator for BoundedQueue<T> {
    type Item = T;
    type IntoIter = vec_deque::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}
