// Copyright 2020-2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! The statistics collaborator named out of scope by the core as policy, but
//! still wired as a pluggable trait so `DETAILED_STATS`/`TS_EXTEND_STATS`
//! have somewhere to land.

use std::sync::atomic::{AtomicUsize, Ordering};

pub trait Stats: Send + Sync {
    fn commit(&self) {}
    fn commit_read_only(&self) {}
    fn restart_running(&self) {}
    fn restart_committing(&self) {}
    fn jump_restart(&self) {}
    fn extend_success(&self) {}
    fn extend_failure(&self) {}
    fn clock_overflow(&self) {}
}

/// Always-on counters, cheap enough to leave enabled by default.
#[derive(Default)]
pub struct AtomicStats {
    pub commits: AtomicUsize,
    pub commits_read_only: AtomicUsize,
    pub restarts_running: AtomicUsize,
    pub restarts_committing: AtomicUsize,
    pub jump_restarts: AtomicUsize,
    pub extend_successes: AtomicUsize,
    pub extend_failures: AtomicUsize,
    pub clock_overflows: AtomicUsize,
}

impl Stats for AtomicStats {
    fn commit(&self) {
        self.commits.fetch_add(1, Ordering::Relaxed);
    }
    fn commit_read_only(&self) {
        self.commits_read_only.fetch_add(1, Ordering::Relaxed);
    }
    fn restart_running(&self) {
        self.restarts_running.fetch_add(1, Ordering::Relaxed);
    }
    fn restart_committing(&self) {
        self.restarts_committing.fetch_add(1, Ordering::Relaxed);
    }
    fn jump_restart(&self) {
        self.jump_restarts.fetch_add(1, Ordering::Relaxed);
    }
    fn extend_success(&self) {
        self.extend_successes.fetch_add(1, Ordering::Relaxed);
    }
    fn extend_failure(&self) {
        self.extend_failures.fetch_add(1, Ordering::Relaxed);
    }
    fn clock_overflow(&self) {
        self.clock_overflows.fetch_add(1, Ordering::Relaxed);
    }
}

/// True no-op, selected when both `detailed_stats` and `ts_extend_stats` are
/// off in [`crate::config::StmConfig`].
#[derive(Default)]
pub struct NullStats;

impl Stats for NullStats {}
