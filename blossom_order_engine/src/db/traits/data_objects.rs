use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::{District, FulfillmentStatus, Order, PaymentStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertEventResult {
    Inserted,
    AlreadyProcessed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderQueryFilter {
    pub payment_status: Option<PaymentStatus>,
    pub fulfillment_status: Option<FulfillmentStatus>,
    pub district: Option<District>,
    pub phone: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
}

impl OrderQueryFilter {
    pub fn with_payment_status(mut self, status: PaymentStatus) -> Self {
        self.payment_status = Some(status);
        self
    }

    pub fn with_fulfillment_status(mut self, status: FulfillmentStatus) -> Self {
        self.fulfillment_status = Some(status);
        self
    }

    pub fn with_district(mut self, district: District) -> Self {
        self.district = Some(district);
        self
    }

    pub fn with_phone<S: Into<String>>(mut self, phone: S) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.payment_status.is_none() &&
            self.fulfillment_status.is_none() &&
            self.district.is_none() &&
            self.phone.is_none() &&
            self.since.is_none() &&
            self.until.is_none()
    }

    /// In-memory equivalent of the SQL `WHERE` clause, for backends that cannot query.
    pub fn matches(&self, order: &Order) -> bool {
        self.payment_status.map_or(true, |s| order.payment_status == s) &&
            self.fulfillment_status.map_or(true, |s| order.fulfillment_status == s) &&
            self.district.map_or(true, |d| order.delivery.district == d) &&
            self.phone.as_ref().map_or(true, |p| order.customer.phone == *p) &&
            self.since.map_or(true, |t| order.created_at >= t) &&
            self.until.map_or(true, |t| order.created_at <= t)
    }
}

impl Display for OrderQueryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            write!(f, "No filters. ")?;
        }
        if let Some(status) = &self.payment_status {
            write!(f, "payment_status: {status}. ")?;
        }
        if let Some(status) = &self.fulfillment_status {
            write!(f, "fulfillment_status: {status}. ")?;
        }
        if let Some(district) = &self.district {
            write!(f, "district: {district}. ")?;
        }
        if let Some(phone) = &self.phone {
            write!(f, "phone: {phone}. ")?;
        }
        if let Some(since) = &self.since {
            write!(f, "since {since}. ")?;
        }
        if let Some(until) = &self.until {
            write!(f, "until {until}. ")?;
        }
        if let Some(limit) = &self.limit {
            write!(f, "limit {limit}. ")?;
        }
        Ok(())
    }
}
