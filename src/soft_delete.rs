//! Deferred removal with an undo window.
//!
//! Each pending item owns one timer task. When the window elapses the task
//! takes its own entry out of the timer map and reports an [`Expired`] event
//! to the owner; [`SoftDeleteManager::cancel`] takes the same entry out under
//! the same lock. Whichever side removes the entry wins, so a canceled timer
//! can never report an expiry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info};

use crate::models::ItemKind;

pub const UNDO_WINDOW: Duration = Duration::from_millis(10_000);

/// Display phase of an item that still exists in its decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemPhase {
    Visible,
    ConfirmPending,
    DeletionPending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDeletion {
    pub item_id: String,
    pub kind: ItemKind,
    pub expires_at: Instant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expired {
    pub item_id: String,
    pub kind: ItemKind,
}

struct ArmedTimer {
    pending: PendingDeletion,
    token: u64,
    handle: JoinHandle<()>,
}

type TimerMap = Arc<Mutex<HashMap<String, ArmedTimer>>>;

fn lock(timers: &Mutex<HashMap<String, ArmedTimer>>) -> MutexGuard<'_, HashMap<String, ArmedTimer>> {
    timers.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Must be used from inside a tokio runtime; timers are spawned tasks.
pub struct SoftDeleteManager {
    window: Duration,
    timers: TimerMap,
    next_token: u64,
    confirming: Option<String>,
    expired_tx: mpsc::UnboundedSender<Expired>,
    expired_rx: mpsc::UnboundedReceiver<Expired>,
}

impl SoftDeleteManager {
    pub fn new(window: Duration) -> Self {
        let (expired_tx, expired_rx) = mpsc::unbounded_channel();
        Self {
            window,
            timers: Arc::new(Mutex::new(HashMap::new())),
            next_token: 0,
            confirming: None,
            expired_tx,
            expired_rx,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Opens the confirmation gate for `item_id`, replacing any other item
    /// awaiting confirmation. Returns `false` when the item is already pending.
    pub fn begin_confirm(&mut self, item_id: &str) -> bool {
        if self.is_pending(item_id) {
            return false;
        }
        self.confirming = Some(item_id.to_string());
        true
    }

    pub fn abort_confirm(&mut self) -> Option<String> {
        self.confirming.take()
    }

    /// Arms the undo timer for `item_id`.
    ///
    /// A second request for an item that is already pending is a no-op and
    /// returns `false`; the original timer keeps running.
    pub fn request_delete(&mut self, item_id: &str, kind: ItemKind) -> bool {
        self.arm(item_id, kind, self.window)
    }

    /// Puts an expired item back in the pending set with an immediate expiry,
    /// for when its removal could not be applied.
    pub fn rearm(&mut self, expired: Expired) -> bool {
        self.arm(&expired.item_id, expired.kind, Duration::ZERO)
    }

    fn arm(&mut self, item_id: &str, kind: ItemKind, delay: Duration) -> bool {
        if self.confirming.as_deref() == Some(item_id) {
            self.confirming = None;
        }

        let mut timers = lock(&self.timers);
        if timers.contains_key(item_id) {
            debug!(item_id, "deletion already pending");
            return false;
        }

        let token = self.next_token;
        self.next_token += 1;
        let expires_at = Instant::now() + delay;
        let handle = tokio::spawn(fire_after(
            self.timers.clone(),
            self.expired_tx.clone(),
            item_id.to_string(),
            kind,
            token,
            expires_at,
        ));
        timers.insert(
            item_id.to_string(),
            ArmedTimer {
                pending: PendingDeletion {
                    item_id: item_id.to_string(),
                    kind,
                    expires_at,
                },
                token,
                handle,
            },
        );
        info!(item_id, ?kind, window_ms = delay.as_millis() as u64, "deletion scheduled");
        true
    }

    /// Undo. Returns `false` if nothing was pending, including after expiry.
    pub fn cancel(&mut self, item_id: &str) -> bool {
        let removed = lock(&self.timers).remove(item_id);
        match removed {
            Some(armed) => {
                armed.handle.abort();
                info!(item_id, "deletion canceled");
                true
            }
            None => false,
        }
    }

    /// Cancels every outstanding timer. Returns how many were canceled.
    pub fn cancel_all(&mut self) -> usize {
        self.confirming = None;
        let drained: Vec<ArmedTimer> = lock(&self.timers).drain().map(|(_, armed)| armed).collect();
        for armed in &drained {
            armed.handle.abort();
        }
        if !drained.is_empty() {
            debug!(count = drained.len(), "canceled outstanding deletions");
        }
        drained.len()
    }

    pub fn is_pending(&self, item_id: &str) -> bool {
        lock(&self.timers).contains_key(item_id)
    }

    pub fn pending_count(&self) -> usize {
        lock(&self.timers).len()
    }

    pub fn pending(&self) -> Vec<PendingDeletion> {
        lock(&self.timers)
            .values()
            .map(|armed| armed.pending.clone())
            .collect()
    }

    pub fn phase(&self, item_id: &str) -> ItemPhase {
        if self.is_pending(item_id) {
            ItemPhase::DeletionPending
        } else if self.confirming.as_deref() == Some(item_id) {
            ItemPhase::ConfirmPending
        } else {
            ItemPhase::Visible
        }
    }

    /// Waits for the next expiry. Returns `None` once nothing is pending and
    /// every delivered expiry has been taken.
    pub async fn next_expired(&mut self) -> Option<Expired> {
        // Timers remove their entry and send under the same lock, so with an
        // empty map every expiry is already queued.
        if self.pending_count() == 0 {
            return self.expired_rx.try_recv().ok();
        }
        self.expired_rx.recv().await
    }

    pub fn try_next_expired(&mut self) -> Option<Expired> {
        self.expired_rx.try_recv().ok()
    }
}

impl Drop for SoftDeleteManager {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

async fn fire_after(
    timers: TimerMap,
    expired_tx: mpsc::UnboundedSender<Expired>,
    item_id: String,
    kind: ItemKind,
    token: u64,
    expires_at: Instant,
) {
    sleep_until(expires_at).await;

    let mut timers = lock(&timers);
    let still_armed = timers
        .get(&item_id)
        .is_some_and(|armed| armed.token == token);
    if !still_armed {
        return;
    }
    timers.remove(&item_id);
    // The owner may already be gone; nothing left to notify then.
    let _ = expired_tx.send(Expired { item_id, kind });
}
