//! FIFO buffer keyed by two monotonic watermarks.
//!
//! Items live in a hash map under integer keys in `(low, high]`. Appending bumps
//! `high`, removing from the front bumps `low`, and front-insertion stores at
//! `low` before decrementing it, so no operation ever shifts existing entries.
//! Keys are only renumbered by [`OrderedBuffer::reset`].

use std::iter::FusedIterator;

use rustc_hash::FxHashMap;

/// Watermark-keyed FIFO container
#[derive(Debug, Clone)]
pub struct OrderedBuffer<T> {
    items: FxHashMap<i64, T>,
    low: i64,
    high: i64,
}

impl<T> Default for OrderedBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> OrderedBuffer<T> {
    pub fn new() -> Self {
        Self {
            items: FxHashMap::default(),
            low: 0,
            high: 0,
        }
    }

    /// Append at the back
    pub fn enqueue(&mut self, item: T) {
        self.high += 1;
        self.items.insert(self.high, item);
    }

    /// Insert before the current front
    pub fn prequeue(&mut self, item: T) {
        self.items.insert(self.low, item);
        self.low -= 1;
    }

    /// Remove and return the oldest item
    pub fn dequeue(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let key = self.low + 1;
        self.low = key;
        self.items.remove(&key)
    }

    pub fn peek(&self) -> Option<&T> {
        if self.is_empty() {
            return None;
        }
        self.items.get(&(self.low + 1))
    }

    pub fn peek_mut(&mut self) -> Option<&mut T> {
        if self.is_empty() {
            return None;
        }
        self.items.get_mut(&(self.low + 1))
    }

    /// Discard every item and zero both watermarks
    pub fn reset(&mut self) {
        self.items.clear();
        self.low = 0;
        self.high = 0;
    }

    /// Remove every item in FIFO order, leaving the buffer reset
    pub fn take_all(&mut self) -> Vec<T> {
        let mut drained = Vec::with_capacity(self.len());
        while let Some(item) = self.dequeue() {
            drained.push(item);
        }
        self.reset();
        drained
    }

    pub fn len(&self) -> usize {
        (self.high - self.low) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.high == self.low
    }

    /// Current `(low, high)` watermarks
    pub fn watermarks(&self) -> (i64, i64) {
        (self.low, self.high)
    }

    /// Borrowing iterator over the current items, front to back
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            items: &self.items,
            next: self.low + 1,
            end: self.high,
        }
    }
}

impl<T> Extend<T> for OrderedBuffer<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for item in iter {
            self.enqueue(item);
        }
    }
}

impl<T> FromIterator<T> for OrderedBuffer<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut buffer = Self::new();
        buffer.extend(iter);
        buffer
    }
}

impl<'a, T> IntoIterator for &'a OrderedBuffer<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Front-to-back iterator; once exhausted it stays exhausted
#[derive(Debug)]
pub struct Iter<'a, T> {
    items: &'a FxHashMap<i64, T>,
    next: i64,
    end: i64,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        while self.next <= self.end {
            let key = self.next;
            self.next += 1;
            if let Some(item) = self.items.get(&key) {
                return Some(item);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.end - self.next + 1).max(0) as usize;
        (0, Some(remaining))
    }
}

impl<T> FusedIterator for Iter<'_, T> {}
