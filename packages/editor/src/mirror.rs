//! # Mirror
//!
//! Keeps a proxy [`LiveTree`] in step with successive snapshots of a source
//! tree. Snapshots queue up and are synced one cycle at a time, in the order
//! they arrived; a new snapshot never interrupts a cycle in progress.
//!
//! With the `async` feature, [`spawn_mirror`] moves a mirror onto a tokio
//! task that owns the proxy and publishes one report per cycle.

use crate::errors::EditorResult;
use aerial_dom::{LiveTree, SyntheticNode};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, instrument};

/// Outcome of one sync cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MirrorReport {
    /// 1-based cycle number
    pub cycle: u64,
    pub mutations: usize,
    pub skipped: usize,
    pub root_replaced: bool,
}

#[derive(Debug)]
pub struct Mirror {
    proxy: LiveTree,
    queue: VecDeque<SyntheticNode>,
    cycles: u64,
}

impl Mirror {
    pub fn new(proxy: LiveTree) -> Self {
        Self {
            proxy,
            queue: VecDeque::new(),
            cycles: 0,
        }
    }

    pub fn proxy(&self) -> &LiveTree {
        &self.proxy
    }

    /// For subscribing to the proxy's mutation events
    pub fn proxy_mut(&mut self) -> &mut LiveTree {
        &mut self.proxy
    }

    pub fn into_proxy(self) -> LiveTree {
        self.proxy
    }

    /// Queue a snapshot; returns the number waiting
    pub fn push(&mut self, snapshot: SyntheticNode) -> usize {
        self.queue.push_back(snapshot);
        self.queue.len()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Sync the proxy to the oldest queued snapshot
    #[instrument(skip_all, fields(cycle = self.cycles + 1))]
    pub fn process_next(&mut self) -> Option<EditorResult<MirrorReport>> {
        let snapshot = self.queue.pop_front()?;
        self.cycles += 1;

        let result: EditorResult<MirrorReport> =
            self.proxy.sync_to(&snapshot).map_err(Into::into).map(|batch| MirrorReport {
                cycle: self.cycles,
                mutations: batch.mutations.len(),
                skipped: batch.report.skipped.len(),
                root_replaced: batch.root_replaced,
            });
        if let Ok(report) = &result {
            debug!(mutations = report.mutations, root_replaced = report.root_replaced, "mirror cycle done");
        }
        Some(result)
    }

    /// Drain the queue, stopping at the first failed cycle
    pub fn process_all(&mut self) -> EditorResult<Vec<MirrorReport>> {
        let mut reports = Vec::new();
        while let Some(result) = self.process_next() {
            reports.push(result?);
        }
        Ok(reports)
    }
}

#[cfg(feature = "async")]
pub use task::{spawn_mirror, MirrorHandle};

#[cfg(feature = "async")]
mod task {
    use super::{Mirror, MirrorReport};
    use crate::errors::{EditorError, EditorResult};
    use aerial_dom::SyntheticNode;
    use tokio::sync::mpsc;
    use tokio::task::JoinHandle;
    use tracing::{debug, warn};

    const CHANNEL_CAPACITY: usize = 32;

    /// Feeds snapshots to a spawned mirror and reads its reports
    #[derive(Debug)]
    pub struct MirrorHandle {
        snapshots: mpsc::Sender<SyntheticNode>,
        reports: mpsc::Receiver<EditorResult<MirrorReport>>,
    }

    impl MirrorHandle {
        pub async fn send(&self, snapshot: SyntheticNode) -> EditorResult<()> {
            self.snapshots
                .send(snapshot)
                .await
                .map_err(|_| EditorError::MirrorClosed)
        }

        /// The next cycle's report; `None` once the task has stopped
        pub async fn next_report(&mut self) -> Option<EditorResult<MirrorReport>> {
            self.reports.recv().await
        }

        /// Stop feeding snapshots and hand back the report receiver. The
        /// task finishes the queued snapshots; the mirror comes back from its
        /// `JoinHandle`.
        pub fn close(self) -> mpsc::Receiver<EditorResult<MirrorReport>> {
            self.reports
        }
    }

    /// Run `mirror` on its own task
    pub fn spawn_mirror(mut mirror: Mirror) -> (MirrorHandle, JoinHandle<Mirror>) {
        let (snapshot_tx, mut snapshot_rx) = mpsc::channel::<SyntheticNode>(CHANNEL_CAPACITY);
        let (report_tx, report_rx) = mpsc::channel(CHANNEL_CAPACITY);

        let task = tokio::spawn(async move {
            while let Some(snapshot) = snapshot_rx.recv().await {
                mirror.push(snapshot);
                while let Some(result) = mirror.process_next() {
                    if let Err(err) = &result {
                        warn!(%err, "mirror cycle failed");
                    }
                    if report_tx.send(result).await.is_err() {
                        debug!("report receiver dropped");
                    }
                }
            }
            debug!(cycles = mirror.cycles(), "mirror task stopped");
            mirror
        });

        (
            MirrorHandle {
                snapshots: snapshot_tx,
                reports: report_rx,
            },
            task,
        )
    }
}
