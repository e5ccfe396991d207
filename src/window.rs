//! Bounded record window for one dataset.

use crate::record::{Record, Table};
use std::collections::VecDeque;

/// Most recent records of a dataset, oldest first.
#[derive(Debug)]
pub struct RecordWindow {
    records: VecDeque<Record>,
    capacity: usize,
}

impl RecordWindow {
    /// Create an empty window. A capacity of zero is bumped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a batch, evicting the oldest records beyond capacity.
    /// Returns the window length after trimming.
    pub fn append(&mut self, batch: Vec<Record>) -> usize {
        self.records.extend(batch);
        while self.records.len() > self.capacity {
            self.records.pop_front();
        }
        self.records.len()
    }

    /// Copy of the current contents, in arrival order.
    pub fn snapshot(&self) -> Table {
        Table::new(self.records.iter().cloned().collect())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether the window holds `capacity` records.
    pub fn is_full(&self) -> bool {
        self.records.len() >= self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }
}
