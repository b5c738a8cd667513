// SPDX-FileCopyrightText: 2026 Nesach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Nesach order backend.
//!
//! This crate provides the order entity, its status state machine, and the
//! error type used throughout the Nesach workspace. Persistence, dispatch,
//! email, and HTTP concerns live in their own crates and all speak in the
//! types defined here.

pub mod error;
pub mod order;

// Re-export key items at crate root for ergonomic imports.
pub use error::NesachError;
pub use order::{now_iso8601, BotStatus, Order, OrderDraft, OrderId, OrderStatus, ServiceType};
