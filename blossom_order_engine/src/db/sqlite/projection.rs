//! Row types for the relational schema and the pure projection from rows to [`Order`].
//!
//! Rows written by this crate are fully normalised: the order row plus its item rows. Rows migrated from the
//! document store may instead carry a JSON `snapshot` and no item rows. Both are projected into the same `Order`
//! shape; for snapshot rows the payment and fulfillment fields are always taken from the columns, which are the
//! authoritative copy.
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::FromRow;

use crate::{
    db_types::{
        split_channels,
        AddOnSelection,
        CustomerContact,
        DeliveryDetails,
        District,
        FulfillmentStatus,
        GeoPin,
        Order,
        OrderId,
        OrderItem,
        OrderTotals,
        PaymentMethod,
        PaymentStatus,
        Recipient,
    },
    traits::StoreError,
};

#[derive(Debug, Clone, FromRow)]
pub struct OrderRow {
    pub order_id: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: Option<String>,
    pub contact_channels: String,
    pub delivery_address: String,
    pub geo_lat: Option<f64>,
    pub geo_lng: Option<f64>,
    pub map_link: Option<String>,
    pub district: String,
    pub is_central: bool,
    pub delivery_window: Option<String>,
    pub recipient_name: Option<String>,
    pub recipient_phone: Option<String>,
    pub items_total: i64,
    pub delivery_fee: i64,
    pub discount: i64,
    pub grand_total: i64,
    pub currency: String,
    pub payment_method: String,
    pub payment_status: String,
    pub fulfillment_status: String,
    pub payment_session_id: Option<String>,
    pub payment_intent_id: Option<String>,
    pub paid_amount: Option<i64>,
    pub paid_currency: Option<String>,
    pub locale: Option<String>,
    pub snapshot: Option<String>,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct OrderItemRow {
    pub order_id: String,
    pub position: i64,
    pub bouquet_id: String,
    pub title: String,
    pub size: String,
    pub unit_price: i64,
    pub add_ons: String,
    pub image_url: Option<String>,
}

fn parse<T: FromStr>(value: &str, column: &str) -> Result<T, StoreError>
where T::Err: std::fmt::Display {
    value.parse::<T>().map_err(|e| StoreError::SerializationError(format!("Invalid {column} column. {e}")))
}

/// Builds an [`Order`] from an order row and its item rows.
pub fn project_order(row: OrderRow, items: Vec<OrderItemRow>) -> Result<Order, StoreError> {
    if items.is_empty() && row.snapshot.is_some() {
        from_snapshot(row)
    } else {
        from_columns(row, items)
    }
}

fn project_item(row: OrderItemRow) -> Result<OrderItem, StoreError> {
    let add_ons: Vec<AddOnSelection> = serde_json::from_str(&row.add_ons)?;
    Ok(OrderItem {
        bouquet_id: row.bouquet_id,
        title: row.title,
        size: row.size,
        unit_price: row.unit_price.into(),
        add_ons,
        image_url: row.image_url,
    })
}

fn from_columns(row: OrderRow, mut items: Vec<OrderItemRow>) -> Result<Order, StoreError> {
    items.sort_by_key(|i| i.position);
    let items = items.into_iter().map(project_item).collect::<Result<Vec<_>, _>>()?;
    let geo_pin = match (row.geo_lat, row.geo_lng) {
        (Some(lat), Some(lng)) => Some(GeoPin { lat, lng }),
        _ => None,
    };
    let recipient = row.recipient_name.map(|name| Recipient { name, phone: row.recipient_phone });
    let contact_channels = split_channels(&row.contact_channels)
        .map_err(|e| StoreError::SerializationError(format!("Invalid contact_channels column. {e}")))?;
    Ok(Order {
        order_id: OrderId(row.order_id),
        customer: CustomerContact {
            name: row.customer_name,
            phone: row.customer_phone,
            email: row.customer_email,
            contact_channels,
        },
        items,
        delivery: DeliveryDetails {
            address: row.delivery_address,
            geo_pin,
            map_link: row.map_link,
            district: parse::<District>(&row.district, "district")?,
            is_central: row.is_central,
            delivery_window: row.delivery_window,
            recipient,
        },
        totals: OrderTotals {
            items_total: row.items_total.into(),
            delivery_fee: row.delivery_fee.into(),
            discount: row.discount.into(),
            grand_total: row.grand_total.into(),
        },
        currency: row.currency,
        payment_method: parse::<PaymentMethod>(&row.payment_method, "payment_method")?,
        payment_status: parse::<PaymentStatus>(&row.payment_status, "payment_status")?,
        fulfillment_status: parse::<FulfillmentStatus>(&row.fulfillment_status, "fulfillment_status")?,
        payment_session_id: row.payment_session_id,
        payment_intent_id: row.payment_intent_id,
        paid_amount: row.paid_amount,
        paid_currency: row.paid_currency,
        locale: row.locale,
        created_at: row.created_at,
        paid_at: row.paid_at,
        updated_at: row.updated_at,
    })
}

fn from_snapshot(row: OrderRow) -> Result<Order, StoreError> {
    let snapshot = row.snapshot.as_deref().unwrap_or("{}");
    let mut order: Order = serde_json::from_str(snapshot)?;
    order.order_id = OrderId(row.order_id);
    order.payment_status = parse::<PaymentStatus>(&row.payment_status, "payment_status")?;
    order.fulfillment_status = parse::<FulfillmentStatus>(&row.fulfillment_status, "fulfillment_status")?;
    order.payment_session_id = row.payment_session_id;
    order.payment_intent_id = row.payment_intent_id;
    order.paid_amount = row.paid_amount;
    order.paid_currency = row.paid_currency;
    order.paid_at = row.paid_at;
    order.updated_at = row.updated_at;
    Ok(order)
}

fn set_or_remove<T: serde::Serialize>(
    doc: &mut serde_json::Map<String, Value>,
    key: &str,
    value: Option<&T>,
) -> Result<(), StoreError> {
    match value {
        Some(v) => {
            doc.insert(key.to_string(), serde_json::to_value(v)?);
        },
        None => {
            doc.remove(key);
        },
    }
    Ok(())
}

/// Rewrites the payment fields of a legacy JSON snapshot so that it agrees with `order`. All other fields in the
/// snapshot, including ones this crate does not know about, are left untouched.
pub fn patch_snapshot_payment_fields(snapshot: &str, order: &Order) -> Result<String, StoreError> {
    let mut value: Value = serde_json::from_str(snapshot)?;
    let doc = value
        .as_object_mut()
        .ok_or_else(|| StoreError::SerializationError("The order snapshot is not a JSON object".into()))?;
    doc.insert("paymentStatus".into(), serde_json::to_value(order.payment_status)?);
    doc.insert("updatedAt".into(), serde_json::to_value(order.updated_at)?);
    set_or_remove(doc, "paymentSessionId", order.payment_session_id.as_ref())?;
    set_or_remove(doc, "paymentIntentId", order.payment_intent_id.as_ref())?;
    set_or_remove(doc, "paidAmount", order.paid_amount.as_ref())?;
    set_or_remove(doc, "paidCurrency", order.paid_currency.as_ref())?;
    set_or_remove(doc, "paidAt", order.paid_at.as_ref())?;
    Ok(value.to_string())
}
