// SPDX-FileCopyrightText: 2026 Nesach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transactional email for the Nesach order backend.
//!
//! Two messages exist: a payment confirmation when an order becomes paid,
//! and a document-ready notice when the extract is first attached. Both are
//! bilingual (Hebrew then English) plain text.

pub mod mailer;
pub mod messages;

pub use mailer::{Mailer, NoopMailer, SmtpMailer};
pub use messages::{document_ready, payment_confirmation, EmailMessage};
