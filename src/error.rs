// Copyright 2020-2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error as DeriveError;

/// Errors surfaced across the transactional memory veneer.
///
/// `Retry` is not a "real" failure: it is how a failed read-set extension or a
/// lost write-write race signals the driver loop to discard the current
/// attempt and re-enter the transaction body, in place of a non-local jump.
/// It should never escape [`crate::Universe::read_write`] or
/// [`crate::Universe::read_only`].
#[derive(Debug, DeriveError, PartialEq, Eq)]
pub enum TxError {
    #[error("transaction failed")]
    Failed,

    #[error("stripe write-owner lock is held")]
    LockPresent,

    #[error("commit clock has overflown")]
    VersionOverflow,

    #[error("transaction is locked")]
    TransactionLocked,

    #[error("stale object observed outside a valid snapshot")]
    StaleObject,

    #[error("read-log entry version no longer matches the stripe")]
    VersionMismatch,

    /// Internal retry signal. See the type-level docs above.
    #[error("transaction must restart")]
    Retry,
}

pub type TxResult<T> = Result<T, TxError>;
