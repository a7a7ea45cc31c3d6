//! Bounded holding area for reports that could not be forwarded.

use std::collections::VecDeque;

use crate::report::ErrorReport;

/// Default number of reports kept for a later retry.
pub const DEFAULT_QUEUE_CAPACITY: usize = 10;

/// FIFO of unsent reports. When full, the oldest report is dropped.
#[derive(Debug, Clone)]
pub struct RetryQueue {
    items: VecDeque<ErrorReport>,
    capacity: usize,
    dropped: u64,
}

impl Default for RetryQueue {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_QUEUE_CAPACITY)
    }
}

impl RetryQueue {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
            dropped: 0,
        }
    }

    /// Queue a report, evicting the oldest one if the queue is full.
    pub fn push(&mut self, report: ErrorReport) {
        if self.items.len() == self.capacity {
            self.items.pop_front();
            self.dropped += 1;
        }
        self.items.push_back(report);
    }

    /// Put a report back at the front, as the next to be retried.
    pub fn push_front(&mut self, report: ErrorReport) {
        if self.items.len() == self.capacity {
            self.dropped += 1;
            return;
        }
        self.items.push_front(report);
    }

    pub fn pop(&mut self) -> Option<ErrorReport> {
        self.items.pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of reports evicted so far.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ReportLevel;

    fn report(n: usize) -> ErrorReport {
        ErrorReport::new(format!("E{}", n), "m", ReportLevel::Error)
    }

    #[test]
    fn test_oldest_dropped_when_full() {
        let mut queue = RetryQueue::default();
        for n in 0..12 {
            queue.push(report(n));
        }

        assert_eq!(queue.len(), DEFAULT_QUEUE_CAPACITY);
        assert_eq!(queue.dropped(), 2);
        assert_eq!(queue.pop().unwrap().title, "E2");
    }

    #[test]
    fn test_push_front_when_full_drops_it() {
        let mut queue = RetryQueue::with_capacity(1);
        queue.push(report(1));
        queue.push_front(report(0));

        assert_eq!(queue.len(), 1);
        assert_eq!(queue.pop().unwrap().title, "E1");
        assert!(queue.is_empty());
    }
}
