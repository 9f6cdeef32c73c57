//! Pricing for bouquet orders.
//!
//! [`compute_totals`] is a pure function of the price schedule and the caller's selections. It resolves every item
//! and add-on against the schedule, classifies the delivery district and looks up the delivery fee.
mod catalog;
mod district;
mod fees;

use blossom_common::Baht;
pub use catalog::{AddOn, Bouquet, PriceSchedule, ScheduleLoadError, SizePrice};
pub use district::{detect_district, normalise};
pub use fees::{delivery_fee, UNKNOWN_DISTRICT_FEE};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db_types::{AddOnSelection, District, OrderItem, OrderTotals};

/// A cart line as sent by the storefront: identifiers only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRequest {
    pub bouquet_id: String,
    pub size: String,
    #[serde(default)]
    pub add_ons: Vec<String>,
}

impl ItemRequest {
    pub fn new<S: Into<String>, T: Into<String>>(bouquet_id: S, size: T) -> Self {
        Self { bouquet_id: bouquet_id.into(), size: size.into(), add_ons: vec![] }
    }

    pub fn with_add_on<S: Into<String>>(mut self, add_on: S) -> Self {
        self.add_ons.push(add_on.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryInput {
    pub address: Option<String>,
    /// An explicit district wins over whatever the address text suggests.
    pub district: Option<District>,
    pub is_central: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricingOutcome {
    pub items: Vec<OrderItem>,
    pub district: District,
    pub totals: OrderTotals,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PricingError {
    #[error("Your cart is empty")]
    EmptyCart,
    #[error("We don't have a bouquet called '{0}'")]
    UnknownBouquet(String),
    #[error("Bouquet '{bouquet}' is not available in size '{size}'")]
    UnknownSize { bouquet: String, size: String },
    #[error("We don't offer the add-on '{0}'")]
    UnknownAddOn(String),
    #[error("A discount cannot be negative")]
    NegativeDiscount,
    #[error("The order total cannot be negative")]
    NegativeTotal,
}

pub fn resolve_district(input: &DeliveryInput) -> District {
    match (input.district, input.address.as_deref()) {
        (Some(district), _) => district,
        (None, Some(address)) => detect_district(address),
        (None, None) => District::Unknown,
    }
}

fn price_item(schedule: &PriceSchedule, item: &ItemRequest) -> Result<OrderItem, PricingError> {
    let bouquet =
        schedule.bouquet(&item.bouquet_id).ok_or_else(|| PricingError::UnknownBouquet(item.bouquet_id.clone()))?;
    let unit_price = bouquet
        .price_for(&item.size)
        .ok_or_else(|| PricingError::UnknownSize { bouquet: bouquet.id.clone(), size: item.size.clone() })?;
    let add_ons = item
        .add_ons
        .iter()
        .map(|id| {
            schedule
                .add_on(id)
                .map(|a| AddOnSelection { id: a.id.clone(), label: a.label.clone(), price: a.price })
                .ok_or_else(|| PricingError::UnknownAddOn(id.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(OrderItem {
        bouquet_id: bouquet.id.clone(),
        title: bouquet.title.clone(),
        size: item.size.trim().to_uppercase(),
        unit_price,
        add_ons,
        image_url: bouquet.image_url.clone(),
    })
}

/// Prices a cart and its delivery.
///
/// The returned totals always satisfy `grand_total == items_total + delivery_fee - discount`.
pub fn compute_totals(
    schedule: &PriceSchedule,
    items: &[ItemRequest],
    delivery: &DeliveryInput,
    discount: Baht,
) -> Result<PricingOutcome, PricingError> {
    if items.is_empty() {
        return Err(PricingError::EmptyCart);
    }
    if discount.is_negative() {
        return Err(PricingError::NegativeDiscount);
    }
    let items = items.iter().map(|i| price_item(schedule, i)).collect::<Result<Vec<_>, _>>()?;
    let items_total = items.iter().map(OrderItem::line_total).sum::<Baht>();
    let district = resolve_district(delivery);
    let delivery_fee = delivery_fee(district, delivery.is_central);
    let grand_total = items_total + delivery_fee - discount;
    if items_total.is_negative() || grand_total.is_negative() {
        return Err(PricingError::NegativeTotal);
    }
    let totals = OrderTotals { items_total, delivery_fee, discount, grand_total };
    Ok(PricingOutcome { items, district, totals })
}
