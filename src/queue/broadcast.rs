//! Status broadcaster.
//!
//! Keeps the set of live subscribers and pushes the serialized queue head to
//! each of them. An empty queue is sent as JSON `null`.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::domain::QueueEntry;

/// Fan-out of head updates to live connections
#[derive(Default)]
pub struct StatusBroadcaster {
    subscribers: Mutex<HashMap<Uuid, UnboundedSender<String>>>,
}

impl StatusBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    fn subscribers(&self) -> MutexGuard<'_, HashMap<Uuid, UnboundedSender<String>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a new connection
    pub fn subscribe(&self) -> (Uuid, UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        self.subscribers().insert(id, tx);
        debug!(subscriber = %id, "Subscriber connected");
        (id, rx)
    }

    /// Register a new connection and queue the current head as its first message
    pub fn subscribe_with_head(&self, head: Option<&QueueEntry>) -> (Uuid, UnboundedReceiver<String>) {
        let (id, rx) = self.subscribe();
        if let Some(payload) = Self::payload(head) {
            if let Some(tx) = self.subscribers().get(&id) {
                let _ = tx.send(payload);
            }
        }
        (id, rx)
    }

    /// Deregister a connection
    pub fn unsubscribe(&self, id: &Uuid) {
        if self.subscribers().remove(id).is_some() {
            debug!(subscriber = %id, "Subscriber disconnected");
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers().len()
    }

    /// Serialize the head as a status message
    pub fn payload(head: Option<&QueueEntry>) -> Option<String> {
        match serde_json::to_string(&head) {
            Ok(json) => Some(json),
            Err(e) => {
                error!("Failed to serialize queue head: {}", e);
                None
            }
        }
    }

    /// Push the head to every subscriber.
    ///
    /// Returns the number of subscribers reached. Subscribers whose receiver
    /// is gone are dropped.
    pub fn broadcast(&self, head: Option<&QueueEntry>) -> usize {
        let Some(payload) = Self::payload(head) else {
            return 0;
        };

        let mut subscribers = self.subscribers();
        let mut delivered = 0;
        subscribers.retain(|id, tx| match tx.send(payload.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(_) => {
                warn!(subscriber = %id, "Failed to push status, dropping subscriber");
                false
            }
        });

        debug!(delivered, "Broadcast queue head");
        delivered
    }
}
