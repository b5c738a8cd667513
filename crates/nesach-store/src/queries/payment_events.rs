// SPDX-FileCopyrightText: 2026 Nesach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Payment webhook dedupe ledger.
//!
//! One row per unique gateway payment id, written in the same transaction
//! as the `pending -> paid` transition it guards. A delivery that does not
//! apply leaves no ledger row, so the gateway's redelivery can still land
//! once the order is in the right state.

use nesach_core::NesachError;
use rusqlite::params;

use crate::database::Database;

/// What a paid-event delivery did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaidEventOutcome {
    /// First delivery of this payment id; the order moved to `paid`.
    Applied,
    /// This payment id was already applied; nothing changed.
    Duplicate,
    /// The order is missing or not pending. The payment id was not
    /// recorded, so a later delivery is free to retry.
    NotPending,
}

/// Record a successful-payment event and transition its order to `paid`,
/// atomically.
///
/// The ledger insert and the conditional UPDATE commit together: either
/// the payment id is recorded and the order is paid, or neither happened.
pub async fn record_and_mark_paid(
    db: &Database,
    payment_id: &str,
    order_id: &str,
    event_type: &str,
) -> Result<PaidEventOutcome, NesachError> {
    let payment_id = payment_id.to_string();
    let order_id = order_id.to_string();
    let event_type = event_type.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            let inserted = tx.execute(
                "INSERT OR IGNORE INTO payment_events (payment_id, order_id, event_type)
                 VALUES (?1, ?2, ?3)",
                params![payment_id, order_id, event_type],
            )?;
            if inserted == 0 {
                tx.commit()?;
                return Ok(PaidEventOutcome::Duplicate);
            }

            let changed = tx.execute(
                "UPDATE orders SET status = 'paid', payment_id = ?2,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1 AND status = 'pending'",
                params![order_id, payment_id],
            )?;
            if changed == 0 {
                // Do not burn the payment id on an order that could not
                // take the transition.
                tx.rollback()?;
                return Ok(PaidEventOutcome::NotPending);
            }

            tx.commit()?;
            Ok(PaidEventOutcome::Applied)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
