//! Bounded "largest N" retention.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// Keeps the `limit` items with the largest keys seen so far. On equal keys the item
/// offered first is kept.
#[derive(Debug)]
pub struct TopK<T> {
    limit: usize,
    seq: u64,
    heap: BinaryHeap<Reverse<Entry<T>>>,
}

#[derive(Debug)]
struct Entry<T> {
    key: u64,
    seq: u64,
    item: T,
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T> Eq for Entry<T> {}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Entry<T> {
    // later offers rank lower so they are evicted first among equal keys
    fn cmp(&self, other: &Self) -> Ordering {
        self.key
            .cmp(&other.key)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl<T> TopK<T> {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            seq: 0,
            heap: BinaryHeap::with_capacity(limit.min(1024)),
        }
    }

    pub fn offer(&mut self, key: u64, item: T) {
        if self.limit == 0 {
            return;
        }
        let seq = self.seq;
        self.seq = self.seq.saturating_add(1);
        if self.heap.len() < self.limit {
            self.heap.push(Reverse(Entry { key, seq, item }));
            return;
        }
        let evict = self
            .heap
            .peek()
            .is_some_and(|Reverse(smallest)| key > smallest.key);
        if evict {
            self.heap.pop();
            self.heap.push(Reverse(Entry { key, seq, item }));
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Retained items, largest key first.
    pub fn into_sorted_vec(self) -> Vec<T> {
        // ascending order of Reverse(entry) is descending order of entry
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|Reverse(entry)| entry.item)
            .collect()
    }
}
