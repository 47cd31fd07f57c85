//! Reordering of out-of-order completions.

use std::collections::BTreeMap;

/// Releases items in index order, whatever order they arrive in.
#[derive(Debug)]
pub struct OrderedBuffer<T> {
    next: usize,
    pending: BTreeMap<usize, T>,
}

impl<T> OrderedBuffer<T> {
    pub fn new() -> Self {
        Self {
            next: 0,
            pending: BTreeMap::new(),
        }
    }

    /// Stores the item completed at `index` and returns every item that is
    /// now contiguous with what was already released.
    pub fn push(&mut self, index: usize, item: T) -> Vec<T> {
        self.pending.insert(index, item);

        let mut ready = Vec::new();
        while let Some(item) = self.pending.remove(&self.next) {
            ready.push(item);
            self.next += 1;
        }
        ready
    }

}

impl<T> Default for OrderedBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_order_passes_through() {
        let mut buffer = OrderedBuffer::new();
        assert_eq!(buffer.push(0, "a"), vec!["a"]);
        assert_eq!(buffer.push(1, "b"), vec!["b"]);
    }

    #[test]
    fn test_out_of_order_is_held_back() {
        let mut buffer = OrderedBuffer::new();
        assert!(buffer.push(2, "c").is_empty());
        assert!(buffer.push(1, "b").is_empty());
        assert_eq!(buffer.push(0, "a"), vec!["a", "b", "c"]);
        assert_eq!(buffer.push(3, "d"), vec!["d"]);
    }
}
