use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;
use uuid::Uuid;

/// One exclusive lock per professional. Holding the guard serializes
/// bookings and status transitions for that professional within this
/// process.
#[derive(Default)]
pub struct BookingLocks {
    locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl BookingLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, professional_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            Arc::clone(locks.entry(professional_id).or_default())
        };

        let guard = lock.lock_owned().await;
        debug!("Booking lock acquired for professional {}", professional_id);
        guard
    }
}
