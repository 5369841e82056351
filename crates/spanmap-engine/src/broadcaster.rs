//! Fans graph snapshots and deltas out to real-time subscribers.
//!
//! Each subscriber owns a bounded channel. Delivery never waits: a full
//! channel drops the frame for that subscriber only, and a closed channel
//! removes the subscriber.

use std::sync::Arc;

use dashmap::DashMap;
use spanmap_core::{ServiceMapDelta, ServiceMapResponse, UpdateFrame};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::aggregator::UpdateSink;
use crate::materializer::Materializer;

/// A registered subscriber and the frames queued for it.
pub struct Subscription {
    pub id: Uuid,
    pub frames: mpsc::Receiver<UpdateFrame>,
}

struct Subscriber {
    tx: mpsc::Sender<UpdateFrame>,
    /// Updates held back until the initial snapshot is queued.
    backlog: Option<Vec<UpdateFrame>>,
}

pub struct Broadcaster {
    subscribers: DashMap<Uuid, Subscriber>,
    materializer: Arc<Materializer>,
    buffer: usize,
}

impl Broadcaster {
    /// `buffer` is the number of frames queued per subscriber; at least one.
    pub fn new(materializer: Arc<Materializer>, buffer: usize) -> Self {
        Self { subscribers: DashMap::new(), materializer, buffer: buffer.max(1) }
    }

    /// Registers a subscriber whose first frame is a full snapshot.
    ///
    /// Updates broadcast while the snapshot renders are held in a backlog
    /// and queued right behind it. A failed render yields an empty snapshot.
    pub async fn subscribe(&self) -> Subscription {
        let (id, frames) = self.register();

        let snapshot = match self.materializer.render_graph().await {
            Ok(graph) => graph,
            Err(e) => {
                error!("Failed to render initial snapshot: {}", e);
                ServiceMapResponse::empty()
            }
        };
        self.activate(id, snapshot);

        info!(subscriber = %id, subscribers = self.subscribers.len(), "Subscriber connected");
        Subscription { id, frames }
    }

    fn register(&self) -> (Uuid, mpsc::Receiver<UpdateFrame>) {
        let (tx, rx) = mpsc::channel(self.buffer);
        let id = Uuid::new_v4();
        self.subscribers.insert(id, Subscriber { tx, backlog: Some(Vec::new()) });
        (id, rx)
    }

    fn activate(&self, id: Uuid, snapshot: ServiceMapResponse) {
        let closed = {
            let Some(mut subscriber) = self.subscribers.get_mut(&id) else { return };
            let backlog = subscriber.backlog.take().unwrap_or_default();
            let tx = &subscriber.tx;

            // the shard lock is held, so no broadcast can slip in between
            std::iter::once(UpdateFrame::Initial(snapshot))
                .chain(backlog)
                .any(|frame| matches!(tx.try_send(frame), Err(TrySendError::Closed(_))))
        };
        if closed {
            self.unsubscribe(&id);
        }
    }

    pub fn unsubscribe(&self, id: &Uuid) {
        if self.subscribers.remove(id).is_some() {
            info!(subscriber = %id, subscribers = self.subscribers.len(), "Subscriber disconnected");
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Offers `frame` to every subscriber; returns how many accepted it.
    pub fn broadcast(&self, frame: &UpdateFrame) -> usize {
        let mut delivered = 0;
        let mut closed = Vec::new();

        for mut entry in self.subscribers.iter_mut() {
            let id = *entry.key();
            let subscriber = entry.value_mut();
            if subscriber.tx.is_closed() {
                closed.push(id);
                continue;
            }

            // one slot of the channel is reserved for the initial snapshot
            if let Some(backlog) = subscriber.backlog.as_mut() {
                if backlog.len() + 1 < self.buffer {
                    backlog.push(frame.clone());
                    delivered += 1;
                } else {
                    debug!(subscriber = %id, "Subscriber backlog full, dropping frame");
                }
                continue;
            }

            match subscriber.tx.try_send(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    debug!(subscriber = %id, "Subscriber lagging, dropping frame");
                }
                Err(TrySendError::Closed(_)) => closed.push(id),
            }
        }

        // removal must happen after the iterator releases its shard locks
        for id in closed {
            self.unsubscribe(&id);
        }
        delivered
    }
}

impl UpdateSink for Broadcaster {
    fn notify(&self, delta: &ServiceMapDelta) {
        if delta.is_empty() || self.subscribers.is_empty() {
            return;
        }
        let delivered = self.broadcast(&UpdateFrame::Update(delta.to_relationships()));
        debug!(edges = delta.len(), delivered, "Broadcast service map update");
    }
}
