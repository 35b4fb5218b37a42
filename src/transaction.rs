// Copyright 2020-2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! The transaction descriptor: per-transaction logs, snapshot timestamp and
//! status, plus the read/write word operations that are the hot path.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use log::trace;

use crate::contention::BackoffContentionManager;
use crate::error::{TxError, TxResult};
use crate::stripe::{is_read_locked, version_of, Timestamp};
use crate::txlog::{ReadLog, ReadLogEntry, WriteLog, WriteLogEntry};
use crate::universe::Universe;
use crate::word::{merge, Address, Mask, Word, UNMASKED};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    Active,
    Committed,
    Aborted,
    Restarted,
}

pub struct Transaction {
    pub id: usize,
    pub valid_ts: Timestamp,
    pub tx_status: TxStatus,
    pub rolled_back: bool,
    pub succ_aborts: u32,
    pub read_log: ReadLog,
    pub write_log: WriteLog,
    pub(crate) universe: Arc<Universe>,
    pub(crate) quiescence_slot: Arc<AtomicUsize>,
    pub(crate) contention: BackoffContentionManager,
}

impl Transaction {
    pub(crate) fn new(id: usize, universe: Arc<Universe>) -> Self {
        let valid_ts = universe.clock.read_current_ts_acquire();
        let quiescence_slot = universe.quiescence.register(id, valid_ts);
        Transaction {
            id,
            valid_ts,
            tx_status: TxStatus::Active,
            rolled_back: false,
            succ_aborts: 0,
            read_log: ReadLog::new(),
            write_log: WriteLog::new(),
            universe,
            quiescence_slot,
            contention: BackoffContentionManager::new(),
        }
    }

    /// Idempotent lookup-or-create of the buffered-write slot for `stripe`.
    /// Does not touch any shared lock.
    pub fn lock_memory_stripe(&mut self, stripe: usize) -> &mut WriteLogEntry {
        self.write_log.get_or_insert(stripe)
    }

    pub fn write_word(&mut self, addr: Address, value: Word, mask: Mask) {
        let stripe = self.universe.stripes.map_address_to_stripe(addr);
        let entry = self.lock_memory_stripe(stripe);
        entry.merge_word(addr, value, mask);
    }

    pub fn read_word(&mut self, addr: Address) -> TxResult<Word> {
        let stripe = self.universe.stripes.map_address_to_stripe(addr);
        if let Some(entry) = self.write_log.find(stripe) {
            if let Some(w) = entry.find_word(addr) {
                if w.mask == UNMASKED {
                    return Ok(w.value);
                }
                let (logged_value, logged_mask) = (w.value, w.mask);
                let mem = self.read_word_inner(stripe, addr)?;
                return Ok(merge(mem, logged_value, logged_mask));
            }
        }
        self.read_word_inner(stripe, addr)
    }

    /// The version-consistent double-check read loop of §4.D step 3.
    fn read_word_inner(&mut self, stripe_idx: usize, addr: Address) -> TxResult<Word> {
        loop {
            let stripe = self.universe.stripes.stripe(stripe_idx);
            let mut v1 = stripe.load_read_lock(Ordering::Acquire);
            while is_read_locked(v1) {
                std::hint::spin_loop();
                v1 = stripe.load_read_lock(Ordering::Acquire);
            }
            let value = self.universe.memory.load(addr, Ordering::Acquire);
            let v2 = stripe.load_read_lock(Ordering::Acquire);
            if v1 != v2 {
                continue;
            }
            self.read_log.push(ReadLogEntry { stripe: stripe_idx, version: v1 });

            if self.should_extend(v1) {
                if !crate::commit::extend(self) {
                    trace!("tx {} extend failed, restarting from read path", self.id);
                    crate::commit::restart_running(self);
                    return Err(TxError::Retry);
                }
            }
            return Ok(value);
        }
    }

    pub fn should_extend(&self, stripe_read_lock_value: Word) -> bool {
        version_of(stripe_read_lock_value) > self.valid_ts
    }

    /// Plain validation: every read-log entry must still match the stripe's
    /// current read-lock value exactly.
    pub fn validate(&self) -> bool {
        self.read_log.iter().all(|entry| {
            let stripe = self.universe.stripes.stripe(entry.stripe);
            stripe.load_read_lock(Ordering::Acquire) == entry.version
        })
    }

    /// Committer-side variant: a stripe locked by *this* transaction (because
    /// it is also in the write set) is accepted if its recorded
    /// pre-acquisition version matches the read-log snapshot.
    pub fn validate_with_read_lock_versions(&self) -> bool {
        self.read_log.iter().all(|entry| {
            let stripe = self.universe.stripes.stripe(entry.stripe);
            let current = stripe.load_read_lock(Ordering::Acquire);
            if current == entry.version {
                return true;
            }
            if is_read_locked(current) {
                if let Some(write_entry) = self.write_log.find(entry.stripe) {
                    return write_entry.old_version == entry.version;
                }
            }
            false
        })
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        self.universe.quiescence.unregister(self.id);
    }
}
