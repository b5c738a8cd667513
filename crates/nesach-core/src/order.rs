// SPDX-FileCopyrightText: 2026 Nesach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The order entity and its status state machine.
//!
//! An order carries exactly one addressing mode: either cadastral
//! (block/parcel, optionally sub-parcel) or street address (city/street/
//! house number). The columns for the unused mode are stored as empty
//! strings so the fulfillment payload always has a fixed shape.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::NesachError;

/// Unique identifier for an order (UUID v4, assigned on creation).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub String);

impl OrderId {
    /// Generate a fresh order id.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Primary order lifecycle status.
///
/// `pending -> paid -> sent` is the happy path. `failed` records a payment
/// failure, `cancelled` an abandoned checkout closed by an operator.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Paid,
    Sent,
    Failed,
    Cancelled,
}

impl OrderStatus {
    /// Terminal states are never regressed by any later event, including a
    /// late-arriving payment-failed webhook.
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Sent | OrderStatus::Cancelled)
    }

    /// Whether the state machine permits advancing from `self` to `next`.
    ///
    /// Transitions and their sole writers:
    /// - `pending -> paid`: payment webhook, keyed by payment id
    /// - `paid -> sent`: first document attach (bot callback or admin upload)
    /// - `pending|paid -> failed`: payment-failure webhook
    /// - `pending -> cancelled`: operator closing an abandoned checkout
    pub fn can_advance_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Paid) | (Paid, Sent) | (Pending, Failed) | (Paid, Failed) | (Pending, Cancelled)
        )
    }
}

/// Side-channel flag tracking dispatch to the external fulfillment bot.
///
/// Decoupled from [`OrderStatus`]: a payment can succeed while fulfillment
/// dispatch is still retrying or has been handed off to manual processing.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BotStatus {
    Unset,
    Sent,
    Failed,
}

/// The kind of land-registry extract being purchased.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ServiceType {
    Regular,
    Historical,
    Concentrated,
    ByAddress,
    PropertyReport,
}

impl Default for ServiceType {
    fn default() -> Self {
        ServiceType::Regular
    }
}

/// A purchase order for a land-registry extract.
///
/// `price` and `service_type` are immutable after creation. `document_url`
/// is set at most once, by the first successful fulfillment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: String,
    pub email: String,
    pub block: String,
    pub parcel: String,
    pub subparcel: String,
    pub city: String,
    pub street: String,
    pub house_number: String,
    pub service_type: ServiceType,
    pub price: f64,
    pub status: OrderStatus,
    pub bot_status: BotStatus,
    pub document_url: Option<String>,
    pub payment_id: Option<String>,
    /// ISO 8601 creation timestamp, immutable.
    pub created_at: String,
    /// ISO 8601 timestamp bumped on every mutation.
    pub updated_at: String,
}

impl Order {
    /// True when both city and street are populated (address mode).
    pub fn has_address(&self) -> bool {
        !self.city.is_empty() && !self.street.is_empty()
    }

    /// True when cadastral identifiers are populated (block mode).
    pub fn has_block(&self) -> bool {
        !self.block.is_empty() && !self.parcel.is_empty()
    }
}

/// Input for creating a new order. Validated and stamped into an [`Order`]
/// via [`OrderDraft::into_order`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderDraft {
    #[serde(default)]
    pub block: String,
    #[serde(default)]
    pub parcel: String,
    #[serde(default)]
    pub subparcel: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub house_number: String,
    #[serde(default)]
    pub service_type: Option<ServiceType>,
    pub price: f64,
    pub email: String,
}

impl OrderDraft {
    /// Validate the draft and produce a pending order owned by `user_id`.
    ///
    /// Exactly one addressing mode must be populated, the price must be
    /// strictly positive, and the delivery email must be non-empty. The
    /// fields of the unused addressing mode are normalized to empty strings.
    pub fn into_order(self, user_id: &str) -> Result<Order, NesachError> {
        let address_mode = !self.city.trim().is_empty() && !self.street.trim().is_empty();
        let block_mode = !self.block.trim().is_empty() && !self.parcel.trim().is_empty();

        if address_mode == block_mode {
            return Err(NesachError::Validation(
                "exactly one of block/parcel or city/street must be provided".to_string(),
            ));
        }
        if self.price <= 0.0 {
            return Err(NesachError::Validation(format!(
                "price must be positive, got {}",
                self.price
            )));
        }
        if self.email.trim().is_empty() || !self.email.contains('@') {
            return Err(NesachError::Validation(
                "a delivery email address is required".to_string(),
            ));
        }

        let now = now_iso8601();
        let order = if address_mode {
            Order {
                id: OrderId::new(),
                user_id: user_id.to_string(),
                email: self.email.trim().to_string(),
                block: String::new(),
                parcel: String::new(),
                subparcel: String::new(),
                city: self.city.trim().to_string(),
                street: self.street.trim().to_string(),
                house_number: self.house_number.trim().to_string(),
                service_type: self.service_type.unwrap_or_default(),
                price: self.price,
                status: OrderStatus::Pending,
                bot_status: BotStatus::Unset,
                document_url: None,
                payment_id: None,
                created_at: now.clone(),
                updated_at: now,
            }
        } else {
            Order {
                id: OrderId::new(),
                user_id: user_id.to_string(),
                email: self.email.trim().to_string(),
                block: self.block.trim().to_string(),
                parcel: self.parcel.trim().to_string(),
                subparcel: self.subparcel.trim().to_string(),
                city: String::new(),
                street: String::new(),
                house_number: String::new(),
                service_type: self.service_type.unwrap_or_default(),
                price: self.price,
                status: OrderStatus::Pending,
                bot_status: BotStatus::Unset,
                document_url: None,
                payment_id: None,
                created_at: now.clone(),
                updated_at: now,
            }
        };
        Ok(order)
    }
}

/// Current UTC time in the ISO 8601 format used throughout the database.
pub fn now_iso8601() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}
