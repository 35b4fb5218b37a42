// Copyright 2020-2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! # Word-Level Software Transactional Memory
//!
//! A lazy-versioning, word-granularity software transactional memory: writes
//! are buffered in a per-transaction log and installed into shared memory
//! only at commit time, guarded by per-stripe version locks and a global
//! commit timestamp (a TL2-style design, in the spirit of this workspace's
//! [`stronghold_rlu`](https://docs.rs/stronghold-rlu) crate, but committing
//! at word rather than object granularity).
//!
//! The hard part of this crate is the commit/abort/read path: [`commit`]
//! implements the two-phase lock-write-set/validate/install commit, and
//! [`transaction::Transaction::read_word`] implements the version-consistent
//! double-checked read with dynamic read-set extension. [`universe::Universe`]
//! is the process-wide (or per-test) context every transaction runs
//! against; [`tvar::TVar`] is the typed convenience wrapper most call sites
//! use instead of raw word addresses.
//!
//! ```
//! use wstm::Universe;
//! use wstm::TVar;
//!
//! let universe = Universe::with_memory(4);
//! let balance: TVar<usize> = TVar::new(&universe, 100);
//!
//! universe
//!     .read_write(|tx| {
//!         let current = balance.get(tx)?;
//!         balance.set(tx, current - 10);
//!         Ok(())
//!     })
//!     .expect("transaction failed");
//!
//! assert_eq!(universe.read_only(|tx| balance.get(tx)).unwrap(), 90);
//! ```
#![allow(clippy::type_complexity)]

pub mod clock;
pub mod commit;
pub mod config;
pub mod contention;
pub mod error;
pub mod memory;
pub mod mm;
pub mod quiescence;
pub mod stats;
pub mod stripe;
mod sync;
pub mod transaction;
pub mod tvar;
pub mod txlog;
pub mod universe;
pub mod word;

pub use clock::ClockScheme;
pub use commit::TryCommitResult;
pub use config::{StmConfig, StmConfigBuilder};
pub use contention::{BackoffContentionManager, ContentionManager};
pub use error::{TxError, TxResult};
pub use mm::{MemoryReclaimer, NoopReclaimer};
pub use stats::{AtomicStats, NullStats, Stats};
pub use transaction::{Transaction, TxStatus};
pub use tvar::TVar;
pub use universe::Universe;
