//! Unbounded FIFO of pending file paths.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use metrics::gauge;
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

use crate::error::{QueueError, QueueResult};

/// Gauge tracking paths pushed but not yet popped.
pub const QUEUE_DEPTH: &str = "comcutter_queue_depth";

/// Create a connected sender/receiver pair.
pub fn job_queue() -> (JobSender, JobReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    let depth = Arc::new(AtomicUsize::new(0));

    (
        JobSender {
            tx,
            depth: Arc::clone(&depth),
        },
        JobReceiver {
            rx: Arc::new(Mutex::new(rx)),
            depth,
        },
    )
}

/// Producer half. Held by the dispatcher.
#[derive(Debug, Clone)]
pub struct JobSender {
    tx: mpsc::UnboundedSender<PathBuf>,
    depth: Arc<AtomicUsize>,
}

impl JobSender {
    /// Push a path to the back of the queue. Never blocks.
    pub fn push(&self, path: PathBuf) -> QueueResult<()> {
        // Count before sending so a fast consumer never underflows the counter.
        let depth = self.depth.fetch_add(1, Ordering::SeqCst) + 1;
        if self.tx.send(path).is_err() {
            self.depth.fetch_sub(1, Ordering::SeqCst);
            return Err(QueueError::Closed);
        }
        gauge!(QUEUE_DEPTH).set(depth as f64);
        debug!(depth, "Job enqueued");
        Ok(())
    }

    /// Number of paths waiting to be picked up.
    pub fn len(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Consumer half. Clones share one underlying receiver, so each path is
/// delivered to exactly one worker.
#[derive(Debug, Clone)]
pub struct JobReceiver {
    rx: Arc<Mutex<mpsc::UnboundedReceiver<PathBuf>>>,
    depth: Arc<AtomicUsize>,
}

impl JobReceiver {
    /// Wait for the next path. Returns `None` once every sender is gone.
    pub async fn pop(&self) -> Option<PathBuf> {
        let path = self.rx.lock().await.recv().await?;
        let depth = self.depth.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
        gauge!(QUEUE_DEPTH).set(depth as f64);
        Some(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fifo_order() {
        let (tx, rx) = job_queue();
        tx.push(PathBuf::from("/library/a.ts")).unwrap();
        tx.push(PathBuf::from("/library/b.ts")).unwrap();
        tx.push(PathBuf::from("/library/c.ts")).unwrap();
        assert_eq!(tx.len(), 3);

        assert_eq!(rx.pop().await, Some(PathBuf::from("/library/a.ts")));
        assert_eq!(rx.pop().await, Some(PathBuf::from("/library/b.ts")));
        assert_eq!(rx.pop().await, Some(PathBuf::from("/library/c.ts")));
        assert!(tx.is_empty());
    }

    #[tokio::test]
    async fn test_pop_ends_when_senders_dropped() {
        let (tx, rx) = job_queue();
        tx.push(PathBuf::from("/library/a.ts")).unwrap();
        drop(tx);

        assert_eq!(rx.pop().await, Some(PathBuf::from("/library/a.ts")));
        assert_eq!(rx.pop().await, None);
    }

    #[tokio::test]
    async fn test_push_fails_when_receiver_dropped() {
        let (tx, rx) = job_queue();
        drop(rx);

        assert!(matches!(
            tx.push(PathBuf::from("/library/a.ts")),
            Err(QueueError::Closed)
        ));
        assert_eq!(tx.len(), 0);
    }

    #[tokio::test]
    async fn test_each_path_delivered_once() {
        let (tx, rx) = job_queue();
        for i in 0..50 {
            tx.push(PathBuf::from(format!("/library/{i}.ts"))).unwrap();
        }
        drop(tx);

        let consumers: Vec<_> = (0..4)
            .map(|_| {
                let rx = rx.clone();
                tokio::spawn(async move {
                    let mut got = Vec::new();
                    while let Some(path) = rx.pop().await {
                        got.push(path);
                    }
                    got
                })
            })
            .collect();

        let mut all = Vec::new();
        for consumer in consumers {
            all.extend(consumer.await.unwrap());
        }
        all.sort();
        all.dedup();
        assert_eq!(all.len(), 50);
    }
}
