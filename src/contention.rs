// Copyright 2020-2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! The contention-manager collaborator named out of scope by the core: the
//! crate wires a trait so the commit path never hard-codes a policy, and
//! ships one conservative default.

use std::sync::atomic::{AtomicU32, Ordering};

/// Decides what a transaction should do when [`crate::commit::lock_write_set`]
/// finds a stripe's write-owner lock already held by another transaction.
pub trait ContentionManager: Send + Sync {
    /// `true` tells the caller to give up and return `RestartRunning`; `false`
    /// tells it to reload the lock and keep trying.
    fn should_abort_write(&self, owner_tx_id: usize) -> bool;

    /// Called once `succ_aborts` has crossed the configured threshold.
    fn wait_on_abort(&self);
}

/// Grounded in the teacher's `BusyBreaker`: a bounded spin-wait rather than a
/// named policy (contention-manager policy choice is a Non-goal). A
/// write-write race is tolerated for a bounded number of consultations
/// before `should_abort_write` gives up, which keeps `lock_write_set` from
/// spinning forever against a owner that never releases; `wait_on_abort`
/// separately backs off with a doubling spin budget each time the
/// transaction's own `succ_aborts` crosses the configured threshold.
pub struct BackoffContentionManager {
    unit: AtomicU32,
    write_wait_attempts: AtomicU32,
}

const MAX_WAIT_UNITS: u32 = 7;
const MAX_WRITE_WAIT_ATTEMPTS: u32 = 64;

impl BackoffContentionManager {
    pub fn new() -> Self {
        BackoffContentionManager {
            unit: AtomicU32::new(0),
            write_wait_attempts: AtomicU32::new(0),
        }
    }

    fn spin(&self) {
        let unit = self.unit.load(Ordering::Relaxed);
        let iterations = 1u32 << unit;
        for _ in 0..iterations {
            std::hint::spin_loop();
        }
        if unit < MAX_WAIT_UNITS {
            self.unit.fetch_add(1, Ordering::Relaxed);
        }
    }
}

impl Default for BackoffContentionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentionManager for BackoffContentionManager {
    fn should_abort_write(&self, _owner_tx_id: usize) -> bool {
        self.write_wait_attempts.fetch_add(1, Ordering::Relaxed) >= MAX_WRITE_WAIT_ATTEMPTS
    }

    fn wait_on_abort(&self) {
        self.spin();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_manager_tolerates_brief_contention() {
        let cm = BackoffContentionManager::new();
        assert!(!cm.should_abort_write(1));
        assert!(!cm.should_abort_write(1));
    }

    #[test]
    fn default_manager_eventually_gives_up_on_sustained_contention() {
        let cm = BackoffContentionManager::new();
        let mut gave_up = false;
        for _ in 0..(MAX_WRITE_WAIT_ATTEMPTS as usize + 5) {
            if cm.should_abort_write(1) {
                gave_up = true;
                break;
            }
        }
        assert!(gave_up, "contention manager never asked to abort a held write lock");
    }

    #[test]
    fn wait_on_abort_saturates_spin_budget() {
        let cm = BackoffContentionManager::new();
        for _ in 0..(MAX_WAIT_UNITS as usize + 5) {
            cm.wait_on_abort();
        }
        assert_eq!(cm.unit.load(Ordering::Relaxed), MAX_WAIT_UNITS);
    }
}
