// Copyright 2020-2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! The lock-write-set, commit and abort/restart phases (§4.E-G). Everything
//! here operates on an already-populated [`Transaction`]; nothing here
//! touches the user-facing driver loop in [`crate::universe`].

use std::sync::atomic::Ordering;

use log::trace;

use crate::clock::ClockScheme;
use crate::quiescence::MINIMUM_TS;
use crate::stripe::{get_version_lock, Timestamp, READ_LOCK_SET, WRITE_LOCK_CLEAR};
use crate::transaction::{Transaction, TxStatus};
use crate::word::{merge, Word, UNMASKED};

/// Outcome of a commit attempt, handed to [`commit_after_try`] by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TryCommitResult {
    Commit,
    RestartRunning,
    RestartCommitting,
    JumpRestart,
}

/// §4.E. Acquires every write-owner lock in the write set, in insertion
/// order. Returns `Ok(())` once every entry is locked and `old_version` has
/// been snapshotted into it, or `Err(())` if the contention manager decided
/// to give up partway through (the locks already taken have been released).
fn lock_write_set(tx: &mut Transaction) -> Result<(), ()> {
    let len = tx.write_log.len();
    for i in 0..len {
        let stripe_idx = tx.write_log.entry(i).stripe;
        // Speculative, barrier-free peek: a retry with an acquire load
        // follows any non-clear observation, so this one may be relaxed.
        let mut current = tx.universe.stripes.stripe(stripe_idx).load_write_lock(Ordering::Relaxed);
        loop {
            let stripe = tx.universe.stripes.stripe(stripe_idx);

            if current != WRITE_LOCK_CLEAR {
                if tx.contention.should_abort_write(current) {
                    tx.universe.stats.restart_running();
                    unlock_write_set(tx, i);
                    return Err(());
                }
                std::hint::spin_loop();
                current = stripe.load_write_lock(Ordering::Acquire);
                continue;
            }

            match stripe.try_acquire_write_lock(tx.id) {
                Ok(()) => {
                    let old_version = stripe.load_read_lock(Ordering::Acquire);
                    stripe.store_read_lock(READ_LOCK_SET, Ordering::Release);
                    tx.write_log.entry_mut(i).old_version = old_version;
                    break;
                }
                Err(actual) => {
                    current = actual;
                    continue;
                }
            }
        }
    }
    Ok(())
}

/// §4.E `UnlockWriteSet`. Releases every lock acquired for entries strictly
/// before `first_not_locked`, restoring each stripe's pre-acquisition
/// version before clearing its write-owner lock.
fn unlock_write_set(tx: &Transaction, first_not_locked: usize) {
    for i in 0..first_not_locked {
        let entry = tx.write_log.entry(i);
        let stripe = tx.universe.stripes.stripe(entry.stripe);
        stripe.store_read_lock(entry.old_version, Ordering::Release);
        stripe.store_write_lock(WRITE_LOCK_CLEAR, Ordering::Release);
    }
}

/// §4.F step 5: install every buffered word and release both locks per
/// stripe, in write-log order.
fn install_and_release(tx: &Transaction, commit_version: Word) {
    for entry in tx.write_log.iter() {
        for word in entry.words() {
            let installed = if word.mask == UNMASKED {
                word.value
            } else {
                let mem = tx.universe.memory.load(word.address, Ordering::Relaxed);
                merge(mem, word.value, word.mask)
            };
            tx.universe.memory.store(word.address, installed, Ordering::Relaxed);
        }
        let stripe = tx.universe.stripes.stripe(entry.stripe);
        stripe.store_read_lock(commit_version, Ordering::Release);
        stripe.store_write_lock(WRITE_LOCK_CLEAR, Ordering::Release);
    }
}

/// §4.F step 7: publish that this transaction is done consulting its
/// snapshot, then wait for every other live transaction to either be idle or
/// have validated past `ts`.
fn privatization_quiescence(tx: &Transaction, ts: Timestamp) {
    if !tx.universe.config.privatization_quiescence {
        return;
    }
    tx.quiescence_slot.store(MINIMUM_TS, Ordering::Release);
    tx.universe.quiescence.wait_for_quiescence(tx.id, ts);
}

/// §4.F `TxTryCommit`: the full two-phase commit for a transaction that may
/// have buffered writes.
pub fn try_commit(tx: &mut Transaction) -> TryCommitResult {
    if lock_write_set(tx).is_err() {
        return TryCommitResult::RestartRunning;
    }

    let ts = tx.universe.clock.increment_commit_ts();
    if ts >= tx.universe.config.maximum_ts {
        tx.tx_status = TxStatus::Aborted;
        if tx.universe.config.privatization_quiescence {
            tx.quiescence_slot.store(MINIMUM_TS, Ordering::Release);
        }
        rollback_committing(tx);
        if tx.universe.clock.start_synchronization() {
            tx.universe.clock.restart_commit_ts();
            tx.universe.clock.end_synchronization();
            tx.universe.stats.clock_overflow();
        }
        return TryCommitResult::JumpRestart;
    }

    let must_validate = match tx.universe.config.clock_scheme {
        ClockScheme::StrictInc => ts != tx.valid_ts + 1,
        ClockScheme::Gv4 => true,
    };
    if must_validate && !tx.validate_with_read_lock_versions() {
        return TryCommitResult::RestartCommitting;
    }

    let commit_version = get_version_lock(ts);
    install_and_release(tx, commit_version);
    tx.tx_status = TxStatus::Committed;

    privatization_quiescence(tx, ts);

    tx.write_log.clear();
    tx.read_log.clear();
    tx.universe.mm.tx_commit(ts);
    tx.universe.stats.commit();
    tx.succ_aborts = 0;
    trace!("tx {} committed at ts {}", tx.id, ts);
    TryCommitResult::Commit
}

/// `TxTryCommitStatic`: identical to [`try_commit`], but if the write log
/// turns out to be empty it skips the lock/validate/install phases entirely
/// and commits at `valid_ts` instead of allocating a fresh timestamp.
pub fn try_commit_static(tx: &mut Transaction) -> TryCommitResult {
    if !tx.write_log.is_empty() {
        return try_commit(tx);
    }

    let ts = tx.valid_ts;
    if tx.universe.config.privatization_quiescence {
        tx.quiescence_slot.store(MINIMUM_TS, Ordering::Release);
        tx.universe.quiescence.wait_for_quiescence(tx.id, ts);
    }
    tx.tx_status = TxStatus::Committed;
    tx.read_log.clear();
    tx.universe.mm.tx_commit(ts);
    tx.universe.stats.commit_read_only();
    tx.succ_aborts = 0;
    TryCommitResult::Commit
}

/// `TxTryCommitReadOnly`: the caller asserts no writes occurred, so this
/// skips even the write-log emptiness check that [`try_commit_static`]
/// performs. Per §9's open question, the quiescence wait uses `valid_ts`
/// (the source references an unassigned `ts` here; `valid_ts` is clearly
/// the intended value).
pub fn try_commit_read_only(tx: &mut Transaction) -> TryCommitResult {
    let ts = tx.valid_ts;
    if tx.universe.config.privatization_quiescence {
        tx.quiescence_slot.store(MINIMUM_TS, Ordering::Release);
        tx.universe.quiescence.wait_for_quiescence(tx.id, ts);
    }
    tx.tx_status = TxStatus::Committed;
    tx.read_log.clear();
    tx.write_log.clear();
    tx.universe.mm.tx_commit(ts);
    tx.universe.stats.commit_read_only();
    tx.succ_aborts = 0;
    TryCommitResult::Commit
}

/// §4.F `Extend`: re-samples the global clock and revalidates the read set
/// against it. On success the transaction's snapshot advances to `ts`
/// without restarting.
pub fn extend(tx: &mut Transaction) -> bool {
    let ts = tx.universe.clock.read_current_ts_acquire();
    if !tx.validate() {
        if tx.universe.config.ts_extend_stats {
            tx.universe.stats.extend_failure();
        }
        return false;
    }
    tx.valid_ts = ts;
    if tx.universe.config.privatization_quiescence {
        tx.quiescence_slot.store(ts, Ordering::Release);
    }
    if tx.universe.config.ts_extend_stats {
        tx.universe.stats.extend_success();
    }
    true
}

/// §4.G `RollbackRunningInline`. No stripe locks are ever acquired outside
/// of commit, so this only needs to clear thread-private state.
pub fn rollback_running_inline(tx: &mut Transaction) {
    if tx.rolled_back {
        return;
    }
    tx.rolled_back = true;
    tx.read_log.clear();
    tx.write_log.clear();
    std::thread::yield_now();
    tx.universe.mm.tx_abort();
}

/// §4.G `RollbackCommitting`. Restores every stripe the failed committer had
/// locked, in the order the invariants demand: version first, owner second.
pub fn rollback_committing(tx: &mut Transaction) {
    if tx.rolled_back {
        return;
    }
    tx.rolled_back = true;
    for entry in tx.write_log.iter() {
        let stripe = tx.universe.stripes.stripe(entry.stripe);
        stripe.store_read_lock(entry.old_version, Ordering::Release);
        stripe.store_write_lock(WRITE_LOCK_CLEAR, Ordering::Release);
    }
    tx.read_log.clear();
    tx.write_log.clear();
    std::thread::yield_now();
    tx.universe.mm.tx_abort();
}

fn backoff(tx: &mut Transaction) {
    let max = tx.universe.config.succ_aborts_max;
    tx.succ_aborts = (tx.succ_aborts + 1).min(max);
    if tx.universe.config.wait_on_succ_aborts && tx.succ_aborts >= tx.universe.config.succ_aborts_threshold {
        tx.contention.wait_on_abort();
    }
}

/// §4.G: rollback, publish `Restarted`, then apply the backoff policy. The
/// non-local "restart jump" of the source becomes, per §9, a plain return
/// to the driver loop in [`crate::universe::Universe`]; there is nothing
/// left to do here but prepare the transaction's own bookkeeping for that.
pub fn restart_running(tx: &mut Transaction) {
    rollback_running_inline(tx);
    tx.tx_status = TxStatus::Restarted;
    tx.universe.stats.restart_running();
    backoff(tx);
}

pub fn restart_committing(tx: &mut Transaction) {
    rollback_committing(tx);
    tx.tx_status = TxStatus::Restarted;
    tx.universe.stats.restart_committing();
    backoff(tx);
}

/// `TxCommitAfterTry`: the post-try action dispatcher. The driver loop calls
/// this immediately after [`try_commit`]/[`try_commit_static`]/
/// [`try_commit_read_only`] and then decides, from the same `result`,
/// whether to return to the caller or re-enter the transaction body.
pub fn commit_after_try(tx: &mut Transaction, result: TryCommitResult) {
    match result {
        TryCommitResult::JumpRestart => {
            tx.universe.stats.jump_restart();
        }
        TryCommitResult::RestartRunning => restart_running(tx),
        TryCommitResult::RestartCommitting => restart_committing(tx),
        TryCommitResult::Commit => {}
    }
}
