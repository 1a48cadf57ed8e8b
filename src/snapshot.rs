//! Full-snapshot subscriptions over a record source.
//!
//! Each update replaces the whole record set; there are no diffs. A failed
//! fetch is delivered as an error value and leaves the last good snapshot in
//! place on the consuming side.

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

pub trait SnapshotSource: Send + Sync + 'static {
    type Record: Send + 'static;

    /// Current full result set.
    fn fetch(&self) -> impl Future<Output = anyhow::Result<Vec<Self::Record>>> + Send;
}

#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotUpdate<T> {
    Snapshot(Vec<T>),
    Failed(String),
}

/// Polls `source` every `every` and forwards each result. The polling task
/// stops once the receiver is dropped.
pub fn subscribe<S: SnapshotSource>(
    source: S,
    every: Duration,
) -> mpsc::Receiver<SnapshotUpdate<S::Record>> {
    let (tx, rx) = mpsc::channel(4);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let update = match source.fetch().await {
                Ok(records) => {
                    tracing::debug!(records = records.len(), "snapshot fetched");
                    SnapshotUpdate::Snapshot(records)
                }
                Err(err) => {
                    tracing::warn!(error = %err, "snapshot fetch failed");
                    SnapshotUpdate::Failed(format!("{err:#}"))
                }
            };
            if tx.send(update).await.is_err() {
                tracing::debug!("snapshot subscriber gone, stopping");
                break;
            }
        }
    });

    rx
}

/// Consumer-side state: the last good snapshot plus the most recent error.
#[derive(Debug, Clone)]
pub struct SnapshotView<T> {
    records: Vec<T>,
    last_error: Option<String>,
    snapshots: u64,
}

impl<T> Default for SnapshotView<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            last_error: None,
            snapshots: 0,
        }
    }
}

impl<T> SnapshotView<T> {
    pub fn apply(&mut self, update: SnapshotUpdate<T>) {
        match update {
            SnapshotUpdate::Snapshot(records) => {
                self.records = records;
                self.last_error = None;
                self.snapshots += 1;
            }
            SnapshotUpdate::Failed(error) => {
                self.last_error = Some(error);
            }
        }
    }

    pub fn records(&self) -> &[T] {
        &self.records
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// False until the first successful snapshot arrives.
    pub fn is_ready(&self) -> bool {
        self.snapshots > 0
    }

    pub fn snapshots(&self) -> u64 {
        self.snapshots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    struct ScriptedSource {
        script: Arc<Mutex<VecDeque<Result<Vec<u32>, String>>>>,
    }

    impl SnapshotSource for ScriptedSource {
        type Record = u32;

        async fn fetch(&self) -> anyhow::Result<Vec<u32>> {
            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some(Ok(records)) => Ok(records),
                Some(Err(message)) => Err(anyhow::anyhow!(message)),
                None => Ok(Vec::new()),
            }
        }
    }

    #[test]
    fn failures_keep_last_good_snapshot() {
        let mut view = SnapshotView::default();
        assert!(!view.is_ready());

        view.apply(SnapshotUpdate::Snapshot(vec![1, 2, 3]));
        view.apply(SnapshotUpdate::Failed("permission denied".to_string()));

        assert_eq!(view.records(), &[1, 2, 3]);
        assert_eq!(view.last_error(), Some("permission denied"));

        view.apply(SnapshotUpdate::Snapshot(vec![4]));
        assert_eq!(view.records(), &[4]);
        assert_eq!(view.last_error(), None);
        assert_eq!(view.snapshots(), 2);
    }

    #[tokio::test]
    async fn subscription_delivers_full_snapshots_in_order() {
        let script = Arc::new(Mutex::new(VecDeque::from(vec![
            Ok(vec![1, 2]),
            Err("unavailable".to_string()),
            Ok(vec![1, 2, 3]),
        ])));
        let mut rx = subscribe(
            ScriptedSource {
                script: script.clone(),
            },
            Duration::from_millis(5),
        );

        let mut view = SnapshotView::default();
        view.apply(rx.recv().await.unwrap());
        assert_eq!(view.records(), &[1, 2]);

        let failed = rx.recv().await.unwrap();
        assert!(matches!(&failed, SnapshotUpdate::Failed(msg) if msg == "unavailable"));
        view.apply(failed);
        assert_eq!(view.records(), &[1, 2]);

        view.apply(rx.recv().await.unwrap());
        assert_eq!(view.records(), &[1, 2, 3]);
        assert!(script.lock().unwrap().is_empty());
    }
}
