// SPDX-FileCopyrightText: 2026 Nesach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Order CRUD and status-transition operations.
//!
//! Status transitions are enforced here with conditional UPDATEs, so the
//! state machine holds even under concurrent writers: `paid` is only
//! reachable from `pending`, `failed` never overwrites a terminal state,
//! and `document_url` is set at most once.

use std::str::FromStr;

use nesach_core::{BotStatus, NesachError, Order, OrderId, OrderStatus, ServiceType};
use rusqlite::params;

use crate::database::Database;
use crate::models::AttachOutcome;

const ORDER_COLUMNS: &str = "id, user_id, email, block, parcel, subparcel, city, street, \
     house_number, service_type, price, status, bot_status, document_url, payment_id, \
     created_at, updated_at";

fn order_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Order> {
    let service_type: String = row.get(9)?;
    let status: String = row.get(11)?;
    let bot_status: String = row.get(12)?;
    Ok(Order {
        id: OrderId(row.get(0)?),
        user_id: row.get(1)?,
        email: row.get(2)?,
        block: row.get(3)?,
        parcel: row.get(4)?,
        subparcel: row.get(5)?,
        city: row.get(6)?,
        street: row.get(7)?,
        house_number: row.get(8)?,
        service_type: ServiceType::from_str(&service_type).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(9, rusqlite::types::Type::Text, Box::new(e))
        })?,
        price: row.get(10)?,
        status: OrderStatus::from_str(&status).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(11, rusqlite::types::Type::Text, Box::new(e))
        })?,
        bot_status: BotStatus::from_str(&bot_status).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(12, rusqlite::types::Type::Text, Box::new(e))
        })?,
        document_url: row.get(13)?,
        payment_id: row.get(14)?,
        created_at: row.get(15)?,
        updated_at: row.get(16)?,
    })
}

/// Insert a newly created order.
pub async fn create_order(db: &Database, order: &Order) -> Result<(), NesachError> {
    let order = order.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO orders (id, user_id, email, block, parcel, subparcel, city, street, \
                 house_number, service_type, price, status, bot_status, document_url, payment_id, \
                 created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
                params![
                    order.id.0,
                    order.user_id,
                    order.email,
                    order.block,
                    order.parcel,
                    order.subparcel,
                    order.city,
                    order.street,
                    order.house_number,
                    order.service_type.to_string(),
                    order.price,
                    order.status.to_string(),
                    order.bot_status.to_string(),
                    order.document_url,
                    order.payment_id,
                    order.created_at,
                    order.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get an order by id.
pub async fn get_order(db: &Database, id: &OrderId) -> Result<Option<Order>, NesachError> {
    let id = id.0.clone();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1"
            ))?;
            let result = stmt.query_row(params![id], order_from_row);
            match result {
                Ok(order) => Ok(Some(order)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get an order by id, but only if it belongs to `user_id`.
pub async fn get_order_for_user(
    db: &Database,
    id: &OrderId,
    user_id: &str,
) -> Result<Option<Order>, NesachError> {
    let id = id.0.clone();
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1 AND user_id = ?2"
            ))?;
            let result = stmt.query_row(params![id, user_id], order_from_row);
            match result {
                Ok(order) => Ok(Some(order)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List one user's orders, newest first.
pub async fn list_orders_for_user(db: &Database, user_id: &str) -> Result<Vec<Order>, NesachError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = ?1 \
                 ORDER BY created_at DESC, rowid DESC"
            ))?;
            let rows = stmt.query_map(params![user_id], order_from_row)?;
            let mut orders = Vec::new();
            for row in rows {
                orders.push(row?);
            }
            Ok(orders)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List every order, newest first (operator view).
pub async fn list_all_orders(db: &Database) -> Result<Vec<Order>, NesachError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC, rowid DESC"
            ))?;
            let rows = stmt.query_map([], order_from_row)?;
            let mut orders = Vec::new();
            for row in rows {
                orders.push(row?);
            }
            Ok(orders)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Transition `pending -> paid`, recording the gateway payment id.
///
/// The conditional UPDATE is the sole writer of the paid transition; it
/// returns `false` when the order was not pending (already paid, terminal,
/// or missing), which callers treat as "no side effects to run".
pub async fn mark_paid(
    db: &Database,
    id: &OrderId,
    payment_id: &str,
) -> Result<bool, NesachError> {
    let id = id.0.clone();
    let payment_id = payment_id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE orders SET status = 'paid', payment_id = ?2,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1 AND status = 'pending'",
                params![id, payment_id],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Record a payment failure. Terminal states (`sent`, `cancelled`) are
/// never regressed by a late-arriving failure event.
pub async fn mark_payment_failed(db: &Database, id: &OrderId) -> Result<bool, NesachError> {
    let id = id.0.clone();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE orders SET status = 'failed',
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1 AND status IN ('pending', 'paid')",
                params![id],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Close an abandoned checkout. Only pending orders can be cancelled.
pub async fn mark_cancelled(db: &Database, id: &OrderId) -> Result<bool, NesachError> {
    let id = id.0.clone();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE orders SET status = 'cancelled',
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1 AND status = 'pending'",
                params![id],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Attach a fulfillment document URL, set-once.
///
/// The first attach records the URL and advances a paid order to `sent`;
/// any later attach is a no-op that returns the already-recorded URL.
/// Returns `None` when no order with this id exists.
pub async fn attach_document(
    db: &Database,
    id: &OrderId,
    document_url: &str,
) -> Result<Option<AttachOutcome>, NesachError> {
    let id = id.0.clone();
    let document_url = document_url.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            let existing: Result<Option<String>, rusqlite::Error> = tx.query_row(
                "SELECT document_url FROM orders WHERE id = ?1",
                params![id],
                |row| row.get(0),
            );

            match existing {
                Ok(Some(url)) => {
                    tx.commit()?;
                    Ok(Some(AttachOutcome {
                        document_url: url,
                        newly_attached: false,
                    }))
                }
                Ok(None) => {
                    tx.execute(
                        "UPDATE orders SET document_url = ?2,
                         status = CASE WHEN status = 'paid' THEN 'sent' ELSE status END,
                         updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                         WHERE id = ?1 AND document_url IS NULL",
                        params![id, document_url],
                    )?;
                    tx.commit()?;
                    Ok(Some(AttachOutcome {
                        document_url,
                        newly_attached: true,
                    }))
                }
                Err(rusqlite::Error::QueryReturnedNoRows) => {
                    tx.commit()?;
                    Ok(None)
                }
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Record the side-channel fulfillment dispatch outcome.
pub async fn set_bot_status(
    db: &Database,
    id: &OrderId,
    bot_status: BotStatus,
) -> Result<(), NesachError> {
    let id = id.0.clone();
    let bot_status = bot_status.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE orders SET bot_status = ?2,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![id, bot_status],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}
