use crate::domain::RecoveryQueueItem;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};

/// In-memory priority queue of mints awaiting a recovery pass (§4.7
/// "Workers ... pull up to batch_size items from the queue (head-of-queue
/// by priority)"). Kept sorted on insert rather than re-sorted on drain,
/// since insert batches are small relative to scan cadence.
pub struct RecoveryQueue {
    queued: Mutex<VecDeque<RecoveryQueueItem>>,
    in_flight: Mutex<HashSet<String>>,
}

impl RecoveryQueue {
    pub fn new() -> Self {
        Self { queued: Mutex::new(VecDeque::new()), in_flight: Mutex::new(HashSet::new()) }
    }

    /// Adds `mint` at its priority-sorted position unless it is already
    /// queued or in flight (§4.7 "Enqueues items not already queued or
    /// in-flight"). Returns whether it was added.
    pub fn enqueue(&self, mint: String, priority: u8) -> bool {
        if self.in_flight.lock().contains(&mint) {
            return false;
        }
        let mut queued = self.queued.lock();
        if queued.iter().any(|item| item.mint == mint) {
            return false;
        }
        let item = RecoveryQueueItem::new(mint, priority);
        let pos = queued.iter().position(|existing| existing.priority < item.priority).unwrap_or(queued.len());
        queued.insert(pos, item);
        true
    }

    /// Pops the head-of-queue item (highest priority) and marks it
    /// in-flight.
    pub fn take(&self) -> Option<RecoveryQueueItem> {
        let item = self.queued.lock().pop_front()?;
        self.in_flight.lock().insert(item.mint.clone());
        Some(item)
    }

    pub fn complete(&self, mint: &str) {
        self.in_flight.lock().remove(mint);
    }

    /// Clears the in-flight mark and either re-queues `item` with an
    /// incremented attempt counter, or drops it once `max_retries` is
    /// reached (§4.7 "after max_retries (3) the item is removed"). Returns
    /// whether it was re-queued.
    pub fn requeue_or_drop(&self, mut item: RecoveryQueueItem, max_retries: u32) -> bool {
        self.in_flight.lock().remove(&item.mint);
        item.attempts += 1;
        item.last_attempt = Some(Utc::now());
        if item.attempts >= max_retries {
            return false;
        }
        let mut queued = self.queued.lock();
        let pos = queued.iter().position(|existing| existing.priority < item.priority).unwrap_or(queued.len());
        queued.insert(pos, item);
        true
    }

    pub fn len(&self) -> usize {
        self.queued.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().len()
    }
}

impl Default for RecoveryQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn higher_priority_dequeues_first() {
        let queue = RecoveryQueue::new();
        queue.enqueue("low".to_string(), 40);
        queue.enqueue("high".to_string(), 90);
        queue.enqueue("mid".to_string(), 60);

        assert_eq!(queue.take().unwrap().mint, "high");
        assert_eq!(queue.take().unwrap().mint, "mid");
        assert_eq!(queue.take().unwrap().mint, "low");
    }

    #[test]
    fn already_queued_or_in_flight_is_rejected() {
        let queue = RecoveryQueue::new();
        assert!(queue.enqueue("mint1".to_string(), 50));
        assert!(!queue.enqueue("mint1".to_string(), 90));

        let item = queue.take().unwrap();
        assert!(!queue.enqueue(item.mint.clone(), 50));
    }

    #[test]
    fn drops_after_max_retries() {
        let queue = RecoveryQueue::new();
        queue.enqueue("mint1".to_string(), 50);
        let mut item = queue.take().unwrap();

        item = {
            assert!(queue.requeue_or_drop(item, 3));
            queue.take().unwrap()
        };
        assert!(queue.requeue_or_drop(item, 3));
        let item = queue.take().unwrap();
        assert!(!queue.requeue_or_drop(item, 3));
        assert!(queue.is_empty());
    }
}
