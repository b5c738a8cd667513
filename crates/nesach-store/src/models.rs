// SPDX-FileCopyrightText: 2026 Nesach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model types for storage entities.
//!
//! The canonical types are defined in `nesach-core` for use across crate
//! boundaries. This module re-exports them for convenience within the
//! storage crate.

pub use nesach_core::{BotStatus, Order, OrderId, OrderStatus, ServiceType};

/// Result of a document attach: the recorded URL plus whether this call was
/// the one that attached it (false on an idempotent repeat).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachOutcome {
    pub document_url: String,
    pub newly_attached: bool,
}
