use tracing::warn;

use crate::core::storage::{Storage, StorageError, GUEST_MESSAGE_COUNT_KEY};

pub const DEFAULT_FREE_MESSAGE_LIMIT: u32 = 8;

/// Free messages a guest has used on this machine.
///
/// The counter lives in storage so it survives restarts; only an explicit
/// [`GuestQuota::reset`] clears it. `used` never exceeds `limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuestQuota {
    limit: u32,
    used: u32,
}

impl GuestQuota {
    pub fn new(limit: u32) -> Self {
        Self { limit, used: 0 }
    }

    /// Read the persisted counter. Unreadable values count as zero.
    pub fn load<S: Storage + ?Sized>(storage: &S, limit: u32) -> Self {
        let used = match storage.get(GUEST_MESSAGE_COUNT_KEY) {
            Ok(Some(raw)) => raw.trim().parse::<u32>().unwrap_or_else(|_| {
                warn!(value = %raw, "ignoring malformed guest message counter");
                0
            }),
            Ok(None) => 0,
            Err(err) => {
                warn!(error = %err, "could not read guest message counter");
                0
            }
        };
        Self {
            limit,
            used: used.min(limit),
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn used(&self) -> u32 {
        self.used
    }

    pub fn remaining(&self) -> u32 {
        self.limit.saturating_sub(self.used)
    }

    pub fn is_exhausted(&self) -> bool {
        self.used >= self.limit
    }

    /// Count one message against the quota and persist the new total.
    pub fn record<S: Storage + ?Sized>(&mut self, storage: &mut S) -> Result<(), StorageError> {
        self.used = self.used.saturating_add(1).min(self.limit);
        storage.set(GUEST_MESSAGE_COUNT_KEY, &self.used.to_string())
    }

    pub fn reset<S: Storage + ?Sized>(&mut self, storage: &mut S) -> Result<(), StorageError> {
        self.used = 0;
        storage.remove(GUEST_MESSAGE_COUNT_KEY)
    }
}
