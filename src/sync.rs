// Copyright 2020-2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! The one incidental lock in this crate — [`crate::quiescence::QuiescenceRegistry`]'s
//! registry map, never held across a stripe-lock acquisition or a blocking
//! wait — routed through `no_deadlocks` when the feature is enabled, so a
//! build with it on gets the same deadlock instrumentation the teacher wires
//! in by default.

#[cfg(feature = "no_deadlocks")]
pub use no_deadlocks::Mutex;

#[cfg(not(feature = "no_deadlocks"))]
pub use std::sync::Mutex;
