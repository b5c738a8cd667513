// SPDX-FileCopyrightText: 2026 Nesach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The fulfillment dispatcher.
//!
//! Single shared implementation behind both triggers: the automatic
//! post-payment dispatch and the manual operator re-trigger. A per-order
//! in-flight claim prevents the two from ever running overlapping retry
//! chains for the same order.
//!
//! Exhausting retries is not a fatal error: the order stays `paid` and only
//! the side-channel `bot_status` records the failed hand-off, so payment
//! success is never hidden by a downstream notification failure.

use std::sync::Arc;

use dashmap::DashMap;
use nesach_core::{BotStatus, NesachError, Order, OrderStatus};
use nesach_store::queries::orders;
use nesach_store::Database;
use serde::Serialize;
use tracing::{info, warn};

use crate::client::FulfillmentClient;
use crate::payload::DispatchPayload;

/// Terminal result of one dispatch trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// The bot acknowledged the hand-off; `bot_status` is now `sent`.
    Sent,
    /// All attempts failed; `bot_status` is now `failed` and the order will
    /// be handled manually. The order itself remains `paid`.
    Failed,
    /// Another dispatch chain for this order is still running; nothing was
    /// sent and no state changed.
    AlreadyInFlight,
}

/// Shared dispatcher used by every dispatch call site.
pub struct Dispatcher {
    client: FulfillmentClient,
    db: Database,
    in_flight: DashMap<String, ()>,
}

/// Holds the in-flight claim for one order id, releasing it on drop.
///
/// The dispatch future can be dropped mid-send (the HTTP handler driving it
/// is cancelled when the client disconnects); releasing in `Drop` keeps a
/// cancelled chain from wedging every later trigger for the same order.
struct InFlightClaim<'a> {
    map: &'a DashMap<String, ()>,
    key: String,
}

impl Drop for InFlightClaim<'_> {
    fn drop(&mut self) {
        self.map.remove(&self.key);
    }
}

impl Dispatcher {
    pub fn new(client: FulfillmentClient, db: Database) -> Arc<Self> {
        Arc::new(Self {
            client,
            db,
            in_flight: DashMap::new(),
        })
    }

    /// Dispatch a paid order to the fulfillment bot.
    ///
    /// Claims the order id for the duration of the retry chain, posts the
    /// flattened payload with capped exponential backoff, and records the
    /// outcome in `bot_status`. A manual re-trigger calls this same function
    /// and therefore restarts from attempt 0.
    pub async fn dispatch_order(&self, order: &Order) -> Result<DispatchOutcome, NesachError> {
        if order.status != OrderStatus::Paid {
            return Err(NesachError::Validation(format!(
                "only paid orders are dispatched, order {} is {}",
                order.id, order.status
            )));
        }

        // Claim the order; a concurrent trigger loses and changes nothing.
        if self.in_flight.insert(order.id.0.clone(), ()).is_some() {
            warn!(order_id = %order.id, "dispatch already in flight, skipping");
            return Ok(DispatchOutcome::AlreadyInFlight);
        }
        let _claim = InFlightClaim {
            map: &self.in_flight,
            key: order.id.0.clone(),
        };

        let payload = DispatchPayload::from(order);
        let result = self.client.send(&payload).await;

        match result {
            Ok(()) => {
                orders::set_bot_status(&self.db, &order.id, BotStatus::Sent).await?;
                info!(order_id = %order.id, "fulfillment dispatch acknowledged");
                Ok(DispatchOutcome::Sent)
            }
            Err(e) => {
                // Non-fatal: payment stands, fulfillment falls back to manual.
                warn!(order_id = %order.id, error = %e, "fulfillment dispatch exhausted retries");
                orders::set_bot_status(&self.db, &order.id, BotStatus::Failed).await?;
                Ok(DispatchOutcome::Failed)
            }
        }
    }
}
