use super::queue::{PendingBatch, PendingRow};
use super::store::PersistenceStore;
use crate::config::PersistenceConfig;
use crate::events::{EventBus, PipelineEvent};
use crate::logger::{self, LogTag};
use crate::monitor::MetricsRecorder;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Process-wide write batcher (C6). A timer drains up to `batch_size`
/// pending rows every `batch_interval_ms` and inserts them in one
/// transaction. Failed batches are re-queued at the head once, then
/// dropped (§4.6, §7).
pub struct BatchQueue {
    incoming: Mutex<VecDeque<PendingRow>>,
    retry: Mutex<VecDeque<PendingBatch>>,
    store: Arc<PersistenceStore>,
    config: PersistenceConfig,
    events: EventBus,
    flushed_total: AtomicU64,
    dropped_total: AtomicU64,
    recorder: Mutex<Option<Arc<MetricsRecorder>>>,
}

impl BatchQueue {
    pub fn new(store: Arc<PersistenceStore>, config: PersistenceConfig, events: EventBus) -> Self {
        Self {
            incoming: Mutex::new(VecDeque::new()),
            retry: Mutex::new(VecDeque::new()),
            store,
            config,
            events,
            flushed_total: AtomicU64::new(0),
            dropped_total: AtomicU64::new(0),
            recorder: Mutex::new(None),
        }
    }

    /// Feeds this queue's depth into the performance monitor's sampler
    /// (§4.9 "queue depths"). Optional: left unset, the queue behaves the
    /// same, just unobserved.
    pub fn set_recorder(&self, recorder: Arc<MetricsRecorder>) {
        *self.recorder.lock() = Some(recorder);
    }

    pub fn enqueue(&self, row: PendingRow) {
        self.incoming.lock().push_back(row);
        if let Some(recorder) = self.recorder.lock().as_ref() {
            recorder.set_queue_depth("batch_queue", self.incoming.lock().len());
        }
    }

    pub fn flushed_total(&self) -> u64 {
        self.flushed_total.load(Ordering::Relaxed)
    }

    pub fn dropped_total(&self) -> u64 {
        self.dropped_total.load(Ordering::Relaxed)
    }

    pub fn pending_len(&self) -> usize {
        self.incoming.lock().len()
    }

    pub fn start(self: Arc<Self>, shutdown: Arc<Notify>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(self.config.batch_interval_ms));
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.flush_once();
                    }
                    _ = shutdown.notified() => {
                        self.flush_once();
                        return;
                    }
                }
            }
        })
    }

    /// Drains and inserts a single batch, preferring a previously failed
    /// batch over fresh rows so retries don't get starved.
    fn flush_once(&self) {
        let batch = self.next_batch();
        if let Some(recorder) = self.recorder.lock().as_ref() {
            recorder.set_queue_depth("batch_queue", self.incoming.lock().len());
        }
        if batch.rows.is_empty() {
            return;
        }

        let kinds: Vec<&'static str> = batch.rows.iter().map(|r| r.kind()).collect();
        match self.store.insert_batch(&batch.rows) {
            Ok(count) => {
                self.flushed_total.fetch_add(count as u64, Ordering::Relaxed);
                for kind in dedup(&kinds) {
                    self.events.publish(PipelineEvent::BatchFlushed { kind: kind.to_string(), rows: count });
                }
            }
            Err(err) => {
                logger::error(LogTag::Persistence, &format!("batch insert failed: {err}"));
                if batch.attempts < self.config.max_requeue_depth {
                    self.retry.lock().push_front(PendingBatch { rows: batch.rows, attempts: batch.attempts + 1 });
                } else {
                    self.dropped_total.fetch_add(batch.rows.len() as u64, Ordering::Relaxed);
                    self.events.publish(PipelineEvent::BatchFailed {
                        kind: "mixed".to_string(),
                        reason: err.to_string(),
                    });
                    logger::warning(LogTag::Persistence, "dropping batch after exhausting re-queue attempts");
                }
            }
        }
    }

    fn next_batch(&self) -> PendingBatch {
        if let Some(batch) = self.retry.lock().pop_front() {
            return batch;
        }

        let mut incoming = self.incoming.lock();
        let take = incoming.len().min(self.config.batch_size);
        let rows: Vec<PendingRow> = incoming.drain(..take).collect();
        PendingBatch { rows, attempts: 0 }
    }
}

fn dedup(kinds: &[&'static str]) -> Vec<&'static str> {
    let mut seen = Vec::new();
    for k in kinds {
        if !seen.contains(k) {
            seen.push(*k);
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Program, Token};

    #[test]
    fn flush_inserts_pending_rows() {
        crate::config::ensure_test_config();
        let store = Arc::new(PersistenceStore::in_memory().unwrap());
        let queue = BatchQueue::new(store.clone(), PersistenceConfig::default(), EventBus::new());
        queue.enqueue(PendingRow::TokenUpsert(Token::placeholder("Mint1", Program::BondingCurve, 1)));
        assert_eq!(queue.pending_len(), 1);
        queue.flush_once();
        assert_eq!(queue.pending_len(), 0);
        assert_eq!(queue.flushed_total(), 1);
        assert!(store.token_by_mint("Mint1").unwrap().is_some());
    }
}
