// SPDX-FileCopyrightText: 2026 Nesach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The fixed-shape payload posted to the external fulfillment bot.
//!
//! The bot always receives every field: whichever addressing mode the order
//! does not use is flattened to empty strings rather than omitted, so the
//! receiving side never has to branch on payload shape.

use nesach_core::Order;
use serde::{Deserialize, Serialize};

/// Which lookup mode the fulfillment bot should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    Address,
    Block,
}

/// JSON body for `POST <fulfillment.endpoint>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchPayload {
    pub user_id: String,
    pub email: String,
    pub search_type: SearchType,
    pub city: String,
    pub street: String,
    pub house_number: String,
    pub block: String,
    pub parcel: String,
    pub subparcel: String,
    pub service_type: String,
}

impl From<&Order> for DispatchPayload {
    fn from(order: &Order) -> Self {
        // Address mode wins when both city and street are present; every
        // other combination falls back to a cadastral lookup.
        if order.has_address() {
            Self {
                user_id: order.user_id.clone(),
                email: order.email.clone(),
                search_type: SearchType::Address,
                city: order.city.clone(),
                street: order.street.clone(),
                house_number: order.house_number.clone(),
                block: String::new(),
                parcel: String::new(),
                subparcel: String::new(),
                service_type: order.service_type.to_string(),
            }
        } else {
            Self {
                user_id: order.user_id.clone(),
                email: order.email.clone(),
                search_type: SearchType::Block,
                city: String::new(),
                street: String::new(),
                house_number: String::new(),
                block: order.block.clone(),
                parcel: order.parcel.clone(),
                subparcel: order.subparcel.clone(),
                service_type: order.service_type.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nesach_core::{OrderDraft, ServiceType};

    #[test]
    fn block_order_flattens_address_fields() {
        let order = OrderDraft {
            block: "6941".into(),
            parcel: "198".into(),
            service_type: Some(ServiceType::Historical),
            price: 69.0,
            email: "buyer@example.com".into(),
            ..Default::default()
        }
        .into_order("user-1")
        .unwrap();

        let payload = DispatchPayload::from(&order);
        assert_eq!(payload.search_type, SearchType::Block);
        assert_eq!(payload.block, "6941");
        assert_eq!(payload.parcel, "198");
        assert_eq!(payload.subparcel, "");
        assert_eq!(payload.city, "");
        assert_eq!(payload.street, "");
        assert_eq!(payload.house_number, "");
        assert_eq!(payload.service_type, "historical");
    }

    #[test]
    fn address_order_flattens_cadastral_fields() {
        let order = OrderDraft {
            city: "Tel Aviv".into(),
            street: "Allenby".into(),
            house_number: "10".into(),
            price: 89.0,
            email: "buyer@example.com".into(),
            ..Default::default()
        }
        .into_order("user-1")
        .unwrap();

        let payload = DispatchPayload::from(&order);
        assert_eq!(payload.search_type, SearchType::Address);
        assert_eq!(payload.city, "Tel Aviv");
        assert_eq!(payload.street, "Allenby");
        assert_eq!(payload.house_number, "10");
        assert_eq!(payload.block, "");
        assert_eq!(payload.parcel, "");
    }

    #[test]
    fn unset_service_type_serializes_as_regular() {
        let order = OrderDraft {
            block: "100".into(),
            parcel: "1".into(),
            price: 39.0,
            email: "buyer@example.com".into(),
            ..Default::default()
        }
        .into_order("user-1")
        .unwrap();

        let payload = DispatchPayload::from(&order);
        assert_eq!(payload.service_type, "regular");
    }

    #[test]
    fn payload_wire_shape_is_stable() {
        let order = OrderDraft {
            block: "6941".into(),
            parcel: "198".into(),
            price: 69.0,
            email: "buyer@example.com".into(),
            ..Default::default()
        }
        .into_order("user-7")
        .unwrap();

        let json = serde_json::to_value(DispatchPayload::from(&order)).unwrap();
        assert_eq!(json["search_type"], "block");
        assert_eq!(json["user_id"], "user-7");
        // Every field is present even when empty.
        for key in [
            "user_id",
            "email",
            "search_type",
            "city",
            "street",
            "house_number",
            "block",
            "parcel",
            "subparcel",
            "service_type",
        ] {
            assert!(json.get(key).is_some(), "missing key {key}");
        }
    }
}
