mod error;

pub use error::Denial;

use std::collections::HashMap;

use tokio::sync::Mutex;

use crate::model::{Ms, Slot};

/// Max simultaneous assignees per slot.
pub const DEFAULT_CAPACITY: u32 = 2;
/// Max allocation attempts per client per reset window.
pub const DEFAULT_QUOTA_LIMIT: u32 = 2;

struct AllocState {
    /// Per-slot assignee count, indexed like `Allocator::slots`.
    /// Incremented on assignment, never decremented.
    occupancy: Vec<u32>,
    /// Per-client attempts since the last quota reset.
    quota: HashMap<String, u32>,
}

/// Hands out slots from a fixed daily schedule.
///
/// The schedule is immutable after construction and lives outside the lock.
/// Occupancy and quota live together behind one `Mutex` so a request's quota
/// check, quota increment, slot scan, and slot increment execute as a single
/// atomic unit relative to all other requests and to the reset loop.
pub struct Allocator {
    slots: Vec<Slot>,
    capacity: u32,
    quota_limit: u32,
    state: Mutex<AllocState>,
}

impl Allocator {
    pub fn new(slots: Vec<Slot>, capacity: u32, quota_limit: u32) -> Self {
        let occupancy = vec![0; slots.len()];
        Self {
            slots,
            capacity,
            quota_limit,
            state: Mutex::new(AllocState {
                occupancy,
                quota: HashMap::new(),
            }),
        }
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn quota_limit(&self) -> u32 {
        self.quota_limit
    }

    /// Find the best slot for `client` at wall-clock `now`.
    ///
    /// The slot containing `now` is preferred; otherwise the soonest future
    /// slot with remaining capacity wins. Quota is consumed by the attempt,
    /// not the grant — a request that ends Exhausted still spent one attempt.
    /// A rate-limited request mutates nothing.
    pub async fn request_slot(&self, client: &str, now: Ms) -> Result<Slot, Denial> {
        let mut state = self.state.lock().await;

        if state.quota.get(client).copied().unwrap_or(0) >= self.quota_limit {
            return Err(Denial::RateLimited {
                client: client.to_string(),
            });
        }
        *state.quota.entry(client.to_string()).or_insert(0) += 1;

        match self.scan(&state.occupancy, now) {
            Some(idx) => {
                state.occupancy[idx] += 1;
                Ok(self.slots[idx])
            }
            None => Err(Denial::Exhausted),
        }
    }

    /// Two-pass scan: the slot containing `now` if it has room, else the first
    /// future slot under capacity. Slots are sorted and non-overlapping, so
    /// the candidate containing `now` sits at the partition point.
    fn scan(&self, occupancy: &[u32], now: Ms) -> Option<usize> {
        let split = self.slots.partition_point(|s| s.end <= now);
        if let Some(slot) = self.slots.get(split)
            && slot.contains_instant(now)
            && occupancy[split] < self.capacity
        {
            return Some(split);
        }
        (split..self.slots.len())
            .find(|&i| now < self.slots[i].start && occupancy[i] < self.capacity)
    }

    /// Drop all accumulated client quota. Returns how many entries were cleared.
    pub async fn reset_quotas(&self) -> usize {
        let mut state = self.state.lock().await;
        let cleared = state.quota.len();
        state.quota.clear();
        cleared
    }

    /// Attempts `client` has spent in the current reset window.
    pub async fn quota_used(&self, client: &str) -> u32 {
        self.state
            .lock()
            .await
            .quota
            .get(client)
            .copied()
            .unwrap_or(0)
    }

    /// Snapshot of per-slot assignee counts, indexed like `slots()`.
    pub async fn occupancy(&self) -> Vec<u32> {
        self.state.lock().await.occupancy.clone()
    }
}
