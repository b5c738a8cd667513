// SPDX-FileCopyrightText: 2026 Nesach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fulfillment dispatch for the Nesach order backend.
//!
//! Once an order is paid it is handed to an external fulfillment bot over
//! plain HTTP. This crate owns the single implementation of that hand-off:
//! the fixed-shape payload, the capped-exponential-backoff retry chain, and
//! the per-order in-flight claim that keeps automatic and manual triggers
//! from overlapping.

pub mod client;
pub mod dispatcher;
pub mod payload;

pub use client::{backoff_delay, FulfillmentClient};
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use payload::{DispatchPayload, SearchType};
