// Copyright 2020-2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! The transaction driver (§4's component M): the process-wide (or
//! per-test) context bundling the stripe table, global clock, transactional
//! memory, quiescence registry and configuration, plus the loop that runs a
//! user-supplied transaction body to completion.
//!
//! The source's non-local "restart jump" becomes, per §9's design notes, an
//! ordinary loop: the transaction body is a closure returned to on every
//! `TxError::Retry` or non-`Commit` `TryCommitResult`, instead of a setjmp
//! target.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use log::trace;

use crate::clock::GlobalClock;
use crate::commit::{self, TryCommitResult};
use crate::config::StmConfig;
use crate::error::{TxError, TxResult};
use crate::memory::TxMemory;
use crate::mm::{MemoryReclaimer, NoopReclaimer};
use crate::quiescence::QuiescenceRegistry;
use crate::stats::{AtomicStats, NullStats, Stats};
use crate::stripe::StripeTable;
use crate::transaction::Transaction;
use crate::word::Address;

/// The shared universe a set of threads transact against. Tests typically
/// build independent universes so that runs don't interfere.
pub struct Universe {
    pub(crate) stripes: StripeTable,
    pub(crate) clock: GlobalClock,
    pub(crate) memory: TxMemory,
    pub(crate) quiescence: QuiescenceRegistry,
    pub(crate) config: StmConfig,
    pub(crate) stats: Arc<dyn Stats>,
    pub(crate) mm: Box<dyn MemoryReclaimer>,
    next_tx_id: AtomicUsize,
    next_address: AtomicUsize,
}

impl Universe {
    /// Builds a fresh universe with `memory_words` words of transactional
    /// heap, governed by `config`.
    pub fn new(config: StmConfig, memory_words: usize) -> Arc<Self> {
        let stats: Arc<dyn Stats> = if config.detailed_stats || config.ts_extend_stats {
            Arc::new(AtomicStats::default())
        } else {
            Arc::new(NullStats)
        };
        Self::with_stats(config, memory_words, stats)
    }

    /// Like [`new`](Self::new), but takes the stats sink explicitly instead
    /// of deriving it from `config`. Lets a caller (typically a test) keep
    /// its own handle on a concrete [`AtomicStats`] to assert against after
    /// driving transactions through the returned `Universe`.
    pub fn with_stats(config: StmConfig, memory_words: usize, stats: Arc<dyn Stats>) -> Arc<Self> {
        Arc::new(Universe {
            stripes: StripeTable::new(config.num_stripes),
            clock: GlobalClock::new(),
            memory: TxMemory::new(memory_words),
            quiescence: QuiescenceRegistry::new(),
            stats,
            mm: Box::new(NoopReclaimer),
            config,
            next_tx_id: AtomicUsize::new(1),
            next_address: AtomicUsize::new(0),
        })
    }

    /// Convenience constructor for tests and examples that don't care about
    /// tuning [`StmConfig`].
    pub fn with_memory(memory_words: usize) -> Arc<Self> {
        Self::new(StmConfig::default(), memory_words)
    }

    pub fn config(&self) -> &StmConfig {
        &self.config
    }

    pub fn stats(&self) -> &dyn Stats {
        self.stats.as_ref()
    }

    fn next_tx_id(&self) -> usize {
        self.next_tx_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Bump-allocates `count` contiguous words for a [`crate::tvar::TVar`].
    /// Panics if `memory_words` was undersized at construction; there is no
    /// transactional object allocator in this crate (§1 Non-goals), so
    /// reservation is a one-shot, non-transactional operation done once per
    /// `TVar` at construction time.
    pub fn reserve_words(&self, count: usize) -> Address {
        let base = self.next_address.fetch_add(count, Ordering::Relaxed);
        assert!(
            base + count <= self.memory.len(),
            "TxMemory exhausted: increase memory_words passed to Universe::new"
        );
        base
    }

    /// Runs `body` to completion, looping through `TxError::Retry` and any
    /// non-`Commit` `TryCommitResult` by re-entering with a fresh
    /// [`Transaction`]. `body` may also return a genuine `TxError`, which is
    /// propagated to the caller without retrying.
    pub fn read_write<F, R>(self: &Arc<Self>, body: F) -> TxResult<R>
    where
        F: Fn(&mut Transaction) -> TxResult<R>,
    {
        loop {
            let id = self.next_tx_id();
            let mut tx = Transaction::new(id, Arc::clone(self));
            match body(&mut tx) {
                Ok(value) => {
                    let result = commit::try_commit_static(&mut tx);
                    commit::commit_after_try(&mut tx, result);
                    if result == TryCommitResult::Commit {
                        return Ok(value);
                    }
                    trace!("tx {} restarting: {:?}", id, result);
                }
                Err(TxError::Retry) => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Like [`read_write`](Self::read_write), but for a `body` the caller
    /// asserts performs no writes: commit skips straight to the read-only
    /// fast path (`TxTryCommitReadOnly`) without inspecting the write log.
    pub fn read_only<F, R>(self: &Arc<Self>, body: F) -> TxResult<R>
    where
        F: Fn(&mut Transaction) -> TxResult<R>,
    {
        loop {
            let id = self.next_tx_id();
            let mut tx = Transaction::new(id, Arc::clone(self));
            match body(&mut tx) {
                Ok(value) => {
                    let result = commit::try_commit_read_only(&mut tx);
                    commit::commit_after_try(&mut tx, result);
                    if result == TryCommitResult::Commit {
                        return Ok(value);
                    }
                    trace!("tx {} restarting: {:?}", id, result);
                }
                Err(TxError::Retry) => continue,
                Err(e) => return Err(e),
            }
        }
    }
}
