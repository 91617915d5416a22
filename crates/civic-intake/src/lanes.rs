// SPDX-FileCopyrightText: 2026 Civic Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-identity event lanes.
//!
//! Each chat identity gets a lane: a bounded mailbox drained by one task, so
//! events from one identity are handled strictly in arrival order while
//! different identities proceed concurrently. A lane exits after sitting idle
//! and is recreated on the next event.

use std::sync::Arc;
use std::time::Duration;

use civic_core::{ExternalId, InboundEvent};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::future::BoxFuture;
use tokio::sync::mpsc;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// Processes one event to completion.
pub type LaneHandler = Arc<dyn Fn(InboundEvent) -> BoxFuture<'static, ()> + Send + Sync>;

type Mailboxes = Arc<DashMap<ExternalId, mpsc::Sender<InboundEvent>>>;

/// Routes events into per-identity mailboxes.
pub struct Lanes {
    mailboxes: Mailboxes,
    tracker: TaskTracker,
    handler: LaneHandler,
    capacity: usize,
    idle: Duration,
}

impl Lanes {
    pub fn new(capacity: usize, idle: Duration, handler: LaneHandler) -> Self {
        Self {
            mailboxes: Arc::new(DashMap::new()),
            tracker: TaskTracker::new(),
            handler,
            capacity: capacity.max(1),
            idle,
        }
    }

    /// Number of lanes currently alive.
    pub fn active(&self) -> usize {
        self.mailboxes.len()
    }

    /// Queues `event` on its sender's lane, spawning the lane if needed.
    ///
    /// Never waits: an event for a lane whose mailbox is full is dropped so
    /// one busy identity cannot hold up the others. Returns whether the event
    /// was queued.
    pub fn dispatch(&self, event: InboundEvent) -> bool {
        let mut event = event;
        // A lane may retire between lookup and send. The replacement lane is
        // fresh, so one retry suffices.
        for _ in 0..2 {
            let identity = event.sender.id.clone();
            let sender = self.sender_for(&identity);
            match sender.try_send(event) {
                Ok(()) => return true,
                Err(mpsc::error::TrySendError::Full(dropped)) => {
                    warn!(
                        identity = %dropped.sender.id,
                        capacity = self.capacity,
                        "lane mailbox full, dropping event"
                    );
                    return false;
                }
                Err(mpsc::error::TrySendError::Closed(returned)) => {
                    self.mailboxes
                        .remove_if(&identity, |_, current| current.same_channel(&sender));
                    event = returned;
                }
            }
        }
        warn!(identity = %event.sender.id, "dropping event, lane closed twice");
        false
    }

    fn sender_for(&self, identity: &ExternalId) -> mpsc::Sender<InboundEvent> {
        match self.mailboxes.entry(identity.clone()) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                let (tx, rx) = mpsc::channel(self.capacity);
                entry.insert(tx.clone());
                debug!(identity = %identity, "lane opened");
                self.tracker.spawn(run_lane(
                    identity.clone(),
                    rx,
                    self.mailboxes.clone(),
                    self.idle,
                    self.handler.clone(),
                ));
                tx
            }
        }
    }

    /// Stops accepting events and waits up to `drain` for every lane to
    /// finish the events already queued.
    pub async fn shutdown(&self, drain: Duration) {
        let open = self.mailboxes.len();
        // Dropping the senders lets each lane exit once its mailbox is empty.
        self.mailboxes.clear();
        self.tracker.close();

        if open > 0 {
            info!(lanes = open, "draining conversation lanes");
        }
        match tokio::time::timeout(drain, self.tracker.wait()).await {
            Ok(()) => info!("all lanes drained"),
            Err(_) => warn!(
                remaining = self.tracker.len(),
                "drain timeout reached, abandoning in-flight events"
            ),
        }
    }
}

async fn run_lane(
    identity: ExternalId,
    mut rx: mpsc::Receiver<InboundEvent>,
    mailboxes: Mailboxes,
    idle: Duration,
    handler: LaneHandler,
) {
    loop {
        match tokio::time::timeout(idle, rx.recv()).await {
            Ok(Some(event)) => handler(event).await,
            Ok(None) => break,
            Err(_) => {
                // Deregister only if nothing arrived meanwhile. Closing the
                // receiver makes racing senders fail over to a new lane.
                let retired = mailboxes
                    .remove_if(&identity, |_, _| {
                        if rx.is_empty() {
                            rx.close();
                            true
                        } else {
                            false
                        }
                    })
                    .is_some();
                if retired {
                    while let Ok(event) = rx.try_recv() {
                        handler(event).await;
                    }
                    break;
                }
            }
        }
    }
    debug!(identity = %identity, "lane closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use civic_core::{ChatIdentity, EventKind};
    use std::sync::Mutex;

    fn text(from: &str, body: &str) -> InboundEvent {
        InboundEvent {
            sender: ChatIdentity {
                id: ExternalId::from(from),
                username: None,
                display_name: from.to_string(),
            },
            kind: EventKind::Text(body.to_string()),
        }
    }

    fn recorder() -> (Arc<Mutex<Vec<(String, String)>>>, LaneHandler) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let handler: LaneHandler = Arc::new(move |event: InboundEvent| {
            let sink = sink.clone();
            Box::pin(async move {
                tokio::task::yield_now().await;
                if let EventKind::Text(body) = event.kind {
                    sink.lock().unwrap().push((event.sender.id.0, body));
                }
            })
        });
        (seen, handler)
    }

    #[tokio::test]
    async fn events_from_one_identity_stay_in_order() {
        let (seen, handler) = recorder();
        let lanes = Lanes::new(32, Duration::from_secs(60), handler);
        for i in 0..20 {
            assert!(lanes.dispatch(text("a", &i.to_string())));
        }
        lanes.shutdown(Duration::from_secs(5)).await;

        let bodies: Vec<String> = seen.lock().unwrap().iter().map(|(_, b)| b.clone()).collect();
        let expected: Vec<String> = (0..20).map(|i| i.to_string()).collect();
        assert_eq!(bodies, expected);
    }

    #[tokio::test]
    async fn identities_get_separate_lanes() {
        let (seen, handler) = recorder();
        let lanes = Lanes::new(4, Duration::from_secs(60), handler);
        for id in ["a", "b", "c"] {
            assert!(lanes.dispatch(text(id, "hi")));
        }
        assert_eq!(lanes.active(), 3);
        lanes.shutdown(Duration::from_secs(5)).await;
        assert_eq!(seen.lock().unwrap().len(), 3);
        assert_eq!(lanes.active(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_lane_retires_and_reopens() {
        let (seen, handler) = recorder();
        let lanes = Lanes::new(4, Duration::from_secs(10), handler);

        assert!(lanes.dispatch(text("a", "1")));
        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(lanes.active(), 0);

        assert!(lanes.dispatch(text("a", "2")));
        lanes.shutdown(Duration::from_secs(5)).await;

        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn full_mailbox_does_not_hold_up_other_identities() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let handler: LaneHandler = Arc::new(move |event: InboundEvent| {
            let sink = sink.clone();
            Box::pin(async move {
                if event.sender.id.as_str() == "slow" {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                }
                sink.lock().unwrap().push(event.sender.id.0);
            })
        });
        let lanes = Lanes::new(1, Duration::from_secs(600), handler);

        // The first event occupies the handler, the second fills the
        // mailbox, the rest overflow.
        assert!(lanes.dispatch(text("slow", "1")));
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(lanes.dispatch(text("slow", "2")));
        assert!(!lanes.dispatch(text("slow", "3")));
        assert!(!lanes.dispatch(text("slow", "4")));
        assert!(lanes.dispatch(text("fast", "hi")));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(*seen.lock().unwrap(), vec!["fast".to_string()]);

        lanes.shutdown(Duration::from_secs(120)).await;
        let slow = seen.lock().unwrap().iter().filter(|id| *id == "slow").count();
        assert_eq!(slow, 2);
    }
}
