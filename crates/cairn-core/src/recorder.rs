//! Fire-and-forget activity recording.
//!
//! Handlers call [`ActivityRecorder::record`] after the primary mutation
//! commits. The entry goes onto a bounded queue drained by a detached
//! writer task; a full queue or a store failure is logged and dropped,
//! never surfaced to the caller. An audit-trail failure must not fail or
//! roll back the mutation it describes.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{error, warn};

use crate::model::NewActivity;
use crate::store::ActivityStore;

enum Msg {
    Record(Box<NewActivity>),
    Flush(oneshot::Sender<()>),
}

/// Handle to the activity writer task. Cheap to clone.
#[derive(Clone)]
pub struct ActivityRecorder {
    tx: mpsc::Sender<Msg>,
}

impl ActivityRecorder {
    /// Spawns the writer task on the current tokio runtime.
    ///
    /// `capacity` bounds the queue; entries offered while it is full are
    /// dropped with a warning.
    #[must_use]
    pub fn spawn(store: Arc<dyn ActivityStore>, capacity: usize) -> Self {
        let (tx, mut rx) = mpsc::channel(capacity.max(1));
        tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                match msg {
                    Msg::Record(entry) => {
                        if let Err(err) = store.append_activity(*entry) {
                            error!(error = %err, "failed to append activity record");
                        }
                    }
                    Msg::Flush(ack) => {
                        // Queue is FIFO, so every record enqueued before the
                        // flush has been written by the time we ack.
                        let _ = ack.send(());
                    }
                }
            }
        });
        Self { tx }
    }

    /// Enqueues an activity record. Never blocks, never fails the caller.
    pub fn record(&self, entry: NewActivity) {
        if let Err(err) = self.tx.try_send(Msg::Record(Box::new(entry))) {
            warn!(error = %err, "activity record dropped");
        }
    }

    /// Waits until every record enqueued before this call has been handed
    /// to the store. Used by tests and by shutdown to drain the queue.
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(Msg::Flush(ack_tx)).await.is_ok() {
            let _ = ack_rx.await;
        }
    }
}
