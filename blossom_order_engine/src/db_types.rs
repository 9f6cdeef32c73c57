use std::{fmt::Display, str::FromStr};

use blossom_common::Baht;
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid value: {0}")]
pub struct ConversionError(String);

/// Implements `Display` and `FromStr` for a unit-only enum using the given wire names.
macro_rules! wire_names {
    ($t:ty { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $t {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $name),+
                }
            }
        }

        impl Display for $t {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $t {
            type Err = ConversionError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $($name => Ok(Self::$variant),)+
                    s => Err(ConversionError(format!("'{s}' is not a valid {}", stringify!($t)))),
                }
            }
        }
    };
}

//--------------------------------------        OrderId        ---------------------------------------------------------
/// Human-shareable order identifier of the form `PREFIX-YEAR-RANDOM`, e.g. `BLS-2026-7K3QXZ`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl FromStr for OrderId {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ConversionError("An order id cannot be empty".into()));
        }
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------     PaymentStatus     ---------------------------------------------------------
/// The payment lifecycle of an order. `Paid` is terminal: once reached, nothing moves the order away from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    PendingPayment,
    Paid,
    PaymentFailed,
}

wire_names!(PaymentStatus {
    PendingPayment => "pending_payment",
    Paid => "paid",
    PaymentFailed => "payment_failed",
});

//--------------------------------------   FulfillmentStatus   ---------------------------------------------------------
/// The operational lifecycle of an order, independent of payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentStatus {
    #[default]
    New,
    Confirmed,
    Preparing,
    Dispatched,
    Delivered,
    Cancelled,
    Issue,
}

wire_names!(FulfillmentStatus {
    New => "new",
    Confirmed => "confirmed",
    Preparing => "preparing",
    Dispatched => "dispatched",
    Delivered => "delivered",
    Cancelled => "cancelled",
    Issue => "issue",
});

impl FulfillmentStatus {
    /// Delivered and cancelled orders only move on when something went wrong afterwards.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }
}

//--------------------------------------     PaymentMethod     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Paid through the payment processor's hosted checkout
    Online,
    /// Bank transfer or cash on delivery, confirmed by an admin
    #[default]
    Offline,
}

wire_names!(PaymentMethod {
    Online => "online",
    Offline => "offline",
});

//--------------------------------------     ContactChannel    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactChannel {
    Phone,
    Line,
    Whatsapp,
    Email,
}

wire_names!(ContactChannel {
    Phone => "phone",
    Line => "line",
    Whatsapp => "whatsapp",
    Email => "email",
});

/// Contact channels are persisted as a comma separated list in the relational store.
pub fn join_channels(channels: &[ContactChannel]) -> String {
    channels.iter().map(ContactChannel::as_str).collect::<Vec<_>>().join(",")
}

pub fn split_channels(s: &str) -> Result<Vec<ContactChannel>, ConversionError> {
    s.split(',').map(str::trim).filter(|c| !c.is_empty()).map(ContactChannel::from_str).collect()
}

//--------------------------------------        District       ---------------------------------------------------------
/// Delivery districts around Chiang Mai. `Unknown` is used when an address cannot be classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum District {
    Mueang,
    Saraphi,
    SanSai,
    SanKamphaeng,
    MaeRim,
    DoiSaket,
    HangDong,
    SanPaTong,
    Unknown,
}

wire_names!(District {
    Mueang => "MUEANG",
    Saraphi => "SARAPHI",
    SanSai => "SAN_SAI",
    SanKamphaeng => "SAN_KAMPHAENG",
    MaeRim => "MAE_RIM",
    DoiSaket => "DOI_SAKET",
    HangDong => "HANG_DONG",
    SanPaTong => "SAN_PA_TONG",
    Unknown => "UNKNOWN",
});

//--------------------------------------     Order details     ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerContact {
    pub name: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub contact_channels: Vec<ContactChannel>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPin {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryDetails {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geo_pin: Option<GeoPin>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_link: Option<String>,
    pub district: District,
    #[serde(default)]
    pub is_central: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_window: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<Recipient>,
}

/// A priced add-on, snapshotted at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddOnSelection {
    pub id: String,
    pub label: String,
    pub price: Baht,
}

/// A line item. Title, unit price, add-on prices and image are copies of the catalog at the time the order was
/// placed, so later catalog edits never change a placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub bouquet_id: String,
    pub title: String,
    pub size: String,
    pub unit_price: Baht,
    #[serde(default)]
    pub add_ons: Vec<AddOnSelection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl OrderItem {
    pub fn line_total(&self) -> Baht {
        self.unit_price + self.add_ons.iter().map(|a| a.price).sum::<Baht>()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTotals {
    pub items_total: Baht,
    pub delivery_fee: Baht,
    #[serde(default)]
    pub discount: Baht,
    pub grand_total: Baht,
}

impl OrderTotals {
    pub fn is_consistent(&self) -> bool {
        !self.discount.is_negative() && self.grand_total == self.items_total + self.delivery_fee - self.discount
    }
}

//--------------------------------------        Order          ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub order_id: OrderId,
    pub customer: CustomerContact,
    pub items: Vec<OrderItem>,
    pub delivery: DeliveryDetails,
    pub totals: OrderTotals,
    pub currency: String,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub fulfillment_status: FulfillmentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_intent_id: Option<String>,
    /// Amount in minor units, exactly as reported by the payment processor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_amount: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Builds the immutable snapshot of a freshly placed order.
    pub fn from_new(order_id: OrderId, order: NewOrder, now: DateTime<Utc>) -> Self {
        Self {
            order_id,
            customer: order.customer,
            items: order.items,
            delivery: order.delivery,
            totals: order.totals,
            currency: order.currency,
            payment_method: order.payment_method,
            payment_status: PaymentStatus::PendingPayment,
            fulfillment_status: FulfillmentStatus::New,
            payment_session_id: None,
            payment_intent_id: None,
            paid_amount: None,
            paid_currency: None,
            locale: order.locale,
            created_at: now,
            paid_at: None,
            updated_at: now,
        }
    }

    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
    }

    pub fn creation_year(&self) -> i32 {
        self.created_at.year()
    }
}

//--------------------------------------       NewOrder        ---------------------------------------------------------
/// A priced, validated order that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub customer: CustomerContact,
    pub items: Vec<OrderItem>,
    pub delivery: DeliveryDetails,
    pub totals: OrderTotals,
    pub currency: String,
    pub payment_method: PaymentMethod,
    pub locale: Option<String>,
}

//--------------------------------------     PaymentUpdate     ---------------------------------------------------------
/// A requested change to the payment dimension of an order. Fields that are `None` leave the stored value alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentUpdate {
    pub status: PaymentStatus,
    pub session_id: Option<String>,
    pub payment_intent_id: Option<String>,
    pub amount: Option<i64>,
    pub currency: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl PaymentUpdate {
    pub fn new(status: PaymentStatus) -> Self {
        Self { status, session_id: None, payment_intent_id: None, amount: None, currency: None, paid_at: None }
    }

    pub fn with_session_id<S: Into<String>>(mut self, session_id: S) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_payment_intent_id<S: Into<String>>(mut self, intent: S) -> Self {
        self.payment_intent_id = Some(intent.into());
        self
    }

    pub fn with_amount<S: Into<String>>(mut self, amount: i64, currency: S) -> Self {
        self.amount = Some(amount);
        self.currency = Some(currency.into());
        self
    }

    pub fn with_paid_at(mut self, paid_at: DateTime<Utc>) -> Self {
        self.paid_at = Some(paid_at);
        self
    }
}

/// The outcome of applying a [`PaymentUpdate`] or a fulfillment change to an order.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Nothing changed. Re-applying the current state is a successful no-op.
    Unchanged(Order),
    /// Correlation fields were filled in, but the status stayed the same.
    FieldsUpdated(Order),
    /// The status moved. `from` and `to` are history labels, e.g. `payment:pending_payment`.
    StatusChanged { order: Order, from: String, to: String },
}

impl Transition {
    pub fn order(&self) -> &Order {
        match self {
            Transition::Unchanged(o) => o,
            Transition::FieldsUpdated(o) => o,
            Transition::StatusChanged { order, .. } => order,
        }
    }

    pub fn into_order(self) -> Order {
        match self {
            Transition::Unchanged(o) => o,
            Transition::FieldsUpdated(o) => o,
            Transition::StatusChanged { order, .. } => order,
        }
    }

    pub fn is_change(&self) -> bool {
        !matches!(self, Transition::Unchanged(_))
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Cannot move an order from {from} to {to}")]
pub struct ForbiddenTransition {
    pub from: String,
    pub to: String,
}

pub fn payment_label(status: PaymentStatus) -> String {
    format!("payment:{status}")
}

pub fn fulfillment_label(status: FulfillmentStatus) -> String {
    format!("fulfillment:{status}")
}

/// Applies a payment update to `order` following the payment state machine.
///
/// * A paid order never changes, whatever the update says.
/// * `paid_at` and `payment_session_id` are only ever set once.
/// * A failed payment may still be followed by a successful one.
pub fn apply_payment_update(order: &Order, update: &PaymentUpdate, now: DateTime<Utc>) -> Transition {
    if order.is_paid() {
        return Transition::Unchanged(order.clone());
    }
    let mut next = order.clone();
    if next.payment_session_id.is_none() {
        next.payment_session_id = update.session_id.clone();
    }
    if update.payment_intent_id.is_some() {
        next.payment_intent_id = update.payment_intent_id.clone();
    }
    next.payment_status = update.status;
    if update.status == PaymentStatus::Paid {
        if update.amount.is_some() {
            next.paid_amount = update.amount;
            next.paid_currency = update.currency.clone();
        }
        if next.paid_at.is_none() {
            next.paid_at = Some(update.paid_at.unwrap_or(now));
        }
    }
    if next == *order {
        return Transition::Unchanged(next);
    }
    next.updated_at = now;
    if next.payment_status == order.payment_status {
        Transition::FieldsUpdated(next)
    } else {
        let from = payment_label(order.payment_status);
        let to = payment_label(next.payment_status);
        Transition::StatusChanged { order: next, from, to }
    }
}

/// Moves the fulfillment status of `order`. Closed orders (delivered or cancelled) can only be flagged with `issue`.
pub fn apply_fulfillment_update(
    order: &Order,
    status: FulfillmentStatus,
    now: DateTime<Utc>,
) -> Result<Transition, ForbiddenTransition> {
    if order.fulfillment_status == status {
        return Ok(Transition::Unchanged(order.clone()));
    }
    if order.fulfillment_status.is_closed() && status != FulfillmentStatus::Issue {
        return Err(ForbiddenTransition {
            from: fulfillment_label(order.fulfillment_status),
            to: fulfillment_label(status),
        });
    }
    let mut next = order.clone();
    next.fulfillment_status = status;
    next.updated_at = now;
    Ok(Transition::StatusChanged {
        order: next,
        from: fulfillment_label(order.fulfillment_status),
        to: fulfillment_label(status),
    })
}

/// Mirrors, backfills and re-imports replace whole orders. A stale copy must never un-pay an order, so when the
/// stored order is paid and the incoming one is not, the stored payment fields win.
pub fn preserve_paid_state(incoming: &mut Order, existing: &Order) {
    if !existing.is_paid() || incoming.is_paid() {
        return;
    }
    incoming.payment_status = existing.payment_status;
    incoming.payment_session_id = existing.payment_session_id.clone();
    incoming.payment_intent_id = existing.payment_intent_id.clone();
    incoming.paid_amount = existing.paid_amount;
    incoming.paid_currency = existing.paid_currency.clone();
    incoming.paid_at = existing.paid_at;
}

//-------------------------------------- StatusHistoryEntry   ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusHistoryEntry {
    pub order_id: OrderId,
    pub from_status: Option<String>,
    pub to_status: String,
    pub changed_at: DateTime<Utc>,
}

//--------------------------------------    PaymentEvent       ---------------------------------------------------------
/// A webhook notification as recorded in the deduplication ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentEvent {
    pub event_id: String,
    pub event_type: String,
    pub order_id: Option<OrderId>,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPaymentEvent {
    pub event_id: String,
    pub event_type: String,
    pub order_id: Option<OrderId>,
}

impl NewPaymentEvent {
    pub fn new<S: Into<String>, T: Into<String>>(event_id: S, event_type: T, order_id: Option<OrderId>) -> Self {
        Self { event_id: event_id.into(), event_type: event_type.into(), order_id }
    }
}

#[cfg(test)]
mod test {
    use chrono::TimeZone;

    use super::*;

    fn sample_order() -> Order {
        crate::test_utils::sample_order("BLS-2026-AAAAAA")
    }

    #[test]
    fn enum_wire_names() {
        assert_eq!(PaymentStatus::PendingPayment.to_string(), "pending_payment");
        assert_eq!("payment_failed".parse::<PaymentStatus>().unwrap(), PaymentStatus::PaymentFailed);
        assert_eq!("SAN_PA_TONG".parse::<District>().unwrap(), District::SanPaTong);
        assert_eq!(serde_json::to_string(&District::DoiSaket).unwrap(), "\"DOI_SAKET\"");
        assert_eq!(serde_json::to_string(&FulfillmentStatus::Dispatched).unwrap(), "\"dispatched\"");
        assert!("shipped".parse::<FulfillmentStatus>().is_err());
    }

    #[test]
    fn channels_round_trip_through_csv() {
        let channels = vec![ContactChannel::Phone, ContactChannel::Whatsapp];
        assert_eq!(join_channels(&channels), "phone,whatsapp");
        assert_eq!(split_channels("phone, whatsapp").unwrap(), channels);
        assert!(split_channels("phone,pigeon").is_err());
    }

    #[test]
    fn order_serializes_camel_case() {
        let order = sample_order();
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["orderId"], "BLS-2026-AAAAAA");
        assert_eq!(json["totals"]["grandTotal"], 1690);
        assert_eq!(json["paymentStatus"], "pending_payment");
        assert_eq!(json["delivery"]["district"], "HANG_DONG");
        assert!(json.get("paidAt").is_none());
        let back: Order = serde_json::from_value(json).unwrap();
        assert_eq!(back, order);
    }

    #[test]
    fn successful_payment_sets_paid_fields_once() {
        let order = sample_order();
        let t1 = Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap();
        let update = PaymentUpdate::new(PaymentStatus::Paid)
            .with_session_id("cs_1")
            .with_amount(169_000, "thb")
            .with_paid_at(t1);
        let transition = apply_payment_update(&order, &update, t1);
        let Transition::StatusChanged { order: paid, from, to } = transition else {
            panic!("expected a status change")
        };
        assert_eq!(from, "payment:pending_payment");
        assert_eq!(to, "payment:paid");
        assert_eq!(paid.paid_at, Some(t1));
        assert_eq!(paid.payment_session_id.as_deref(), Some("cs_1"));
        assert_eq!(paid.paid_amount, Some(169_000));

        // Nothing moves a paid order
        let t2 = Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap();
        let again = PaymentUpdate::new(PaymentStatus::Paid).with_session_id("cs_2").with_paid_at(t2);
        assert_eq!(apply_payment_update(&paid, &again, t2), Transition::Unchanged(paid.clone()));
        let failed = PaymentUpdate::new(PaymentStatus::PaymentFailed);
        assert_eq!(apply_payment_update(&paid, &failed, t2), Transition::Unchanged(paid.clone()));
    }

    #[test]
    fn failed_payment_can_still_succeed() {
        let order = sample_order();
        let now = order.created_at;
        let failed = apply_payment_update(&order, &PaymentUpdate::new(PaymentStatus::PaymentFailed), now).into_order();
        assert_eq!(failed.payment_status, PaymentStatus::PaymentFailed);
        assert!(failed.paid_at.is_none());
        // Same status again is a no-op
        let repeat = apply_payment_update(&failed, &PaymentUpdate::new(PaymentStatus::PaymentFailed), now);
        assert!(!repeat.is_change());
        let paid = apply_payment_update(&failed, &PaymentUpdate::new(PaymentStatus::Paid), now).into_order();
        assert!(paid.is_paid());
        assert_eq!(paid.paid_at, Some(now));
    }

    #[test]
    fn binding_a_session_keeps_status() {
        let order = sample_order();
        let update = PaymentUpdate::new(PaymentStatus::PendingPayment).with_session_id("cs_9");
        let t = apply_payment_update(&order, &update, order.created_at);
        assert!(matches!(t, Transition::FieldsUpdated(_)));
        let bound = t.into_order();
        // the session id is only ever set once
        let other = PaymentUpdate::new(PaymentStatus::PendingPayment).with_session_id("cs_10");
        let t = apply_payment_update(&bound, &other, bound.created_at);
        assert_eq!(t.order().payment_session_id.as_deref(), Some("cs_9"));
    }

    #[test]
    fn stale_copies_never_unpay() {
        let order = sample_order();
        let paid_update = PaymentUpdate::new(PaymentStatus::Paid);
        let paid = apply_payment_update(&order, &paid_update, order.created_at).into_order();
        let mut stale = order.clone();
        stale.fulfillment_status = FulfillmentStatus::Preparing;
        preserve_paid_state(&mut stale, &paid);
        assert!(stale.is_paid());
        assert_eq!(stale.paid_at, paid.paid_at);
        assert_eq!(stale.fulfillment_status, FulfillmentStatus::Preparing);
        // a pending order is simply replaced
        let mut newer = paid.clone();
        preserve_paid_state(&mut newer, &order);
        assert_eq!(newer, paid);
    }

    #[test]
    fn closed_orders_only_accept_issue() {
        let order = sample_order();
        let now = order.created_at;
        let delivered = apply_fulfillment_update(&order, FulfillmentStatus::Delivered, now).unwrap().into_order();
        let err = apply_fulfillment_update(&delivered, FulfillmentStatus::Preparing, now).unwrap_err();
        assert_eq!(err.from, "fulfillment:delivered");
        let issue = apply_fulfillment_update(&delivered, FulfillmentStatus::Issue, now).unwrap();
        assert_eq!(issue.order().fulfillment_status, FulfillmentStatus::Issue);
        assert!(!apply_fulfillment_update(&delivered, FulfillmentStatus::Delivered, now).unwrap().is_change());
    }

    #[test]
    fn totals_consistency() {
        let order = sample_order();
        assert!(order.totals.is_consistent());
        let mut bad = order.totals;
        bad.discount = Baht::from(-5);
        assert!(!bad.is_consistent());
        assert_eq!(order.items[0].line_total(), Baht::from(1290));
    }
}
