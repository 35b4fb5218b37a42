// Copyright 2020-2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! The privatization-quiescence scaffolding named out of scope by the core
//! beyond its interaction points: a registry of live transactions' last
//! validated timestamp, consulted by a committer that wants to be sure no
//! other transaction can still observe the pre-commit version.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::stripe::Timestamp;
use crate::sync::Mutex;

/// Sentinel meaning "not currently inside a live snapshot" — either not yet
/// started or already finished.
pub const MINIMUM_TS: Timestamp = 0;

#[derive(Default)]
pub struct QuiescenceRegistry {
    slots: Mutex<HashMap<usize, Arc<AtomicUsize>>>,
}

impl QuiescenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, tx_id: usize, initial_ts: Timestamp) -> Arc<AtomicUsize> {
        let slot = Arc::new(AtomicUsize::new(initial_ts));
        self.slots.lock().unwrap().insert(tx_id, Arc::clone(&slot));
        slot
    }

    pub fn unregister(&self, tx_id: usize) {
        self.slots.lock().unwrap().remove(&tx_id);
    }

    /// Block until every *other* registered transaction's quiescence slot is
    /// either [`MINIMUM_TS`] or strictly greater than `ts`.
    pub fn wait_for_quiescence(&self, this_tx_id: usize, ts: Timestamp) {
        let others: Vec<Arc<AtomicUsize>> = {
            let slots = self.slots.lock().unwrap();
            slots
                .iter()
                .filter(|(id, _)| **id != this_tx_id)
                .map(|(_, slot)| Arc::clone(slot))
                .collect()
        };
        for slot in others {
            while {
                let v = slot.load(Ordering::Acquire);
                v != MINIMUM_TS && v <= ts
            } {
                std::hint::spin_loop();
            }
        }
    }
}
