// Copyright 2020-2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Runtime-configurable toggles. Compile-time choices (whether
//! `no_deadlocks` mutex instrumentation is linked in, whether `verbose`
//! widens logging) stay at the Cargo feature level; everything that a single
//! `Universe` might reasonably want to vary lives here.

use crate::clock::ClockScheme;
use crate::stripe::Timestamp;

#[derive(Debug, Clone)]
pub struct StmConfig {
    pub clock_scheme: ClockScheme,
    pub num_stripes: usize,
    pub maximum_ts: Timestamp,
    pub privatization_quiescence: bool,
    pub wait_on_succ_aborts: bool,
    pub succ_aborts_threshold: u32,
    pub succ_aborts_max: u32,
    pub detailed_stats: bool,
    pub ts_extend_stats: bool,
}

impl Default for StmConfig {
    fn default() -> Self {
        StmConfig {
            clock_scheme: ClockScheme::StrictInc,
            num_stripes: 1 << 16,
            maximum_ts: (Timestamp::MAX >> 1) - 1,
            privatization_quiescence: true,
            wait_on_succ_aborts: true,
            succ_aborts_threshold: 4,
            succ_aborts_max: 100,
            detailed_stats: true,
            ts_extend_stats: true,
        }
    }
}

pub struct StmConfigBuilder {
    config: StmConfig,
}

impl StmConfigBuilder {
    pub fn new() -> Self {
        StmConfigBuilder { config: StmConfig::default() }
    }

    pub fn clock_scheme(mut self, scheme: ClockScheme) -> Self {
        self.config.clock_scheme = scheme;
        self
    }

    pub fn num_stripes(mut self, num_stripes: usize) -> Self {
        self.config.num_stripes = num_stripes;
        self
    }

    pub fn maximum_ts(mut self, maximum_ts: Timestamp) -> Self {
        self.config.maximum_ts = maximum_ts;
        self
    }

    pub fn privatization_quiescence(mut self, enabled: bool) -> Self {
        self.config.privatization_quiescence = enabled;
        self
    }

    pub fn wait_on_succ_aborts(mut self, enabled: bool) -> Self {
        self.config.wait_on_succ_aborts = enabled;
        self
    }

    pub fn detailed_stats(mut self, enabled: bool) -> Self {
        self.config.detailed_stats = enabled;
        self
    }

    pub fn ts_extend_stats(mut self, enabled: bool) -> Self {
        self.config.ts_extend_stats = enabled;
        self
    }

    pub fn build(self) -> StmConfig {
        self.config
    }
}

impl Default for StmConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
