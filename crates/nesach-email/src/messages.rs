// SPDX-FileCopyrightText: 2026 Nesach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bilingual transactional message bodies.
//!
//! Buyers are Hebrew-speaking but orders can come through English-language
//! storefronts, so every message carries a Hebrew section followed by an
//! English one. Plain text only.

use nesach_core::{Order, ServiceType};

/// A rendered message ready to hand to a [`crate::Mailer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub subject: String,
    pub body: String,
}

/// Sent when a payment webhook moves the order to `paid`.
pub fn payment_confirmation(order: &Order) -> EmailMessage {
    let subject = format!(
        "אישור תשלום – הזמנה {id} / Payment confirmed – order {id}",
        id = order.id
    );
    let body = format!(
        "שלום,\n\
         \n\
         התשלום על סך {price:.2} ש\"ח עבור הזמנה {id} התקבל בהצלחה.\n\
         סוג השירות: {service_he}\n\
         הנכס: {property_he}\n\
         הנסח יישלח לכתובת דוא\"ל זו מיד עם הפקתו.\n\
         \n\
         ---\n\
         \n\
         Hello,\n\
         \n\
         Your payment of {price:.2} ILS for order {id} was received.\n\
         Service: {service_en}\n\
         Property: {property_en}\n\
         The extract will be delivered to this address as soon as it is produced.\n",
        id = order.id,
        price = order.price,
        service_he = service_name_he(order.service_type),
        service_en = service_name_en(order.service_type),
        property_he = property_line_he(order),
        property_en = property_line_en(order),
    );
    EmailMessage { subject, body }
}

/// Sent once, when the first document is attached to the order.
pub fn document_ready(order: &Order, document_url: &str) -> EmailMessage {
    let subject = format!(
        "הנסח שלך מוכן – הזמנה {id} / Your extract is ready – order {id}",
        id = order.id
    );
    let body = format!(
        "שלום,\n\
         \n\
         הנסח שהזמנת מוכן להורדה.\n\
         הנכס: {property_he}\n\
         קישור להורדה: {url}\n\
         \n\
         ---\n\
         \n\
         Hello,\n\
         \n\
         The extract you ordered is ready for download.\n\
         Property: {property_en}\n\
         Download link: {url}\n",
        property_he = property_line_he(order),
        property_en = property_line_en(order),
        url = document_url,
    );
    EmailMessage { subject, body }
}

fn service_name_he(service: ServiceType) -> &'static str {
    match service {
        ServiceType::Regular => "נסח רגיל",
        ServiceType::Historical => "נסח היסטורי",
        ServiceType::Concentrated => "נסח מרוכז",
        ServiceType::ByAddress => "נסח לפי כתובת",
        ServiceType::PropertyReport => "דוח נכס",
    }
}

fn service_name_en(service: ServiceType) -> &'static str {
    match service {
        ServiceType::Regular => "Regular extract",
        ServiceType::Historical => "Historical extract",
        ServiceType::Concentrated => "Concentrated extract",
        ServiceType::ByAddress => "Extract by address",
        ServiceType::PropertyReport => "Property report",
    }
}

fn property_line_he(order: &Order) -> String {
    if order.has_address() {
        format!(
            "{} {}, {}",
            order.street, order.house_number, order.city
        )
    } else if order.subparcel.is_empty() {
        format!("גוש {}, חלקה {}", order.block, order.parcel)
    } else {
        format!(
            "גוש {}, חלקה {}, תת-חלקה {}",
            order.block, order.parcel, order.subparcel
        )
    }
}

fn property_line_en(order: &Order) -> String {
    if order.has_address() {
        format!(
            "{} {}, {}",
            order.street, order.house_number, order.city
        )
    } else if order.subparcel.is_empty() {
        format!("Block {}, Parcel {}", order.block, order.parcel)
    } else {
        format!(
            "Block {}, Parcel {}, Sub-parcel {}",
            order.block, order.parcel, order.subparcel
        )
    }
}
