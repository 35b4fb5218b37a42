// Copyright 2020-2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! The memory-reclamation collaborator (`mm.TxCommit`/`mm.TxAbort`) named
//! out of scope by the core. Wired as a trait so the commit path never
//! hard-codes an allocator.

use crate::stripe::Timestamp;

pub trait MemoryReclaimer: Send + Sync {
    fn tx_commit(&self, ts: Timestamp);
    fn tx_abort(&self);
}

/// The default: no transactional-object allocator is part of this crate.
#[derive(Default)]
pub struct NoopReclaimer;

impl MemoryReclaimer for NoopReclaimer {
    fn tx_commit(&self, _ts: Timestamp) {}
    fn tx_abort(&self) {}
}
