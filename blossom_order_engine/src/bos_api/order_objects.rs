use blossom_common::Baht;
use serde::{Deserialize, Serialize};

use crate::{
    bos_api::errors::OrderFlowError,
    db_types::{
        ContactChannel,
        CustomerContact,
        DeliveryDetails,
        District,
        FulfillmentStatus,
        GeoPin,
        Order,
        OrderId,
        OrderItem,
        OrderTotals,
        PaymentStatus,
        Recipient,
    },
    pricing::{DeliveryInput, ItemRequest},
};

pub const MIN_PHONE_DIGITS: usize = 9;
pub const MAX_PHONE_DIGITS: usize = 16;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRequest {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub contact_channels: Vec<ContactChannel>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryRequest {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub district: Option<District>,
    #[serde(default)]
    pub is_central: bool,
    #[serde(default)]
    pub geo_pin: Option<GeoPin>,
    #[serde(default)]
    pub map_link: Option<String>,
    #[serde(default)]
    pub delivery_window: Option<String>,
    #[serde(default)]
    pub recipient: Option<Recipient>,
}

/// An order as submitted by the storefront. Items are identifiers only; prices are always resolved server-side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub customer: CustomerRequest,
    #[serde(default)]
    pub items: Vec<ItemRequest>,
    #[serde(default)]
    pub delivery: DeliveryRequest,
    #[serde(default)]
    pub locale: Option<String>,
}

/// Strips spaces and dashes, then requires 9 to 16 ASCII digits.
///
/// Spaces and dashes are the only separators accepted, because that is how customers type Thai numbers
/// ("081-234-5678"). The stored number is digits only. Anything else is rejected rather than cleaned up, including
/// dots, brackets and a leading `+` country code.
pub fn normalise_phone(phone: &str) -> Option<String> {
    let digits = phone.chars().filter(|c| !c.is_whitespace() && *c != '-').collect::<String>();
    let in_range = (MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&digits.len());
    (in_range && digits.chars().all(|c| c.is_ascii_digit())).then_some(digits)
}

fn non_blank(s: &Option<String>) -> Option<&str> {
    s.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl OrderRequest {
    /// Checks everything that can be checked without the price schedule. Returns the first problem found.
    pub fn validate(&self) -> Result<(), OrderFlowError> {
        let invalid = |msg: &str| Err(OrderFlowError::ValidationError(msg.to_string()));
        if self.items.is_empty() {
            return invalid("Your cart is empty");
        }
        if self.customer.name.trim().is_empty() {
            return invalid("Please tell us your name");
        }
        if normalise_phone(&self.customer.phone).is_none() {
            return invalid("Phone numbers must contain only digits, 9 to 16 of them");
        }
        if self.customer.contact_channels.is_empty() {
            return invalid("Please choose at least one way for us to contact you");
        }
        if non_blank(&self.delivery.address).is_none() && self.delivery.district.is_none() {
            return invalid("A delivery address or district is required");
        }
        if let Some(recipient) = &self.delivery.recipient {
            if recipient.name.trim().is_empty() {
                return invalid("The recipient needs a name");
            }
            if recipient.phone.as_deref().is_some_and(|p| normalise_phone(p).is_none()) {
                return invalid("The recipient's phone number must contain only digits, 9 to 16 of them");
            }
        }
        Ok(())
    }

    pub fn delivery_input(&self) -> DeliveryInput {
        DeliveryInput {
            address: non_blank(&self.delivery.address).map(String::from),
            district: self.delivery.district,
            is_central: self.delivery.is_central,
        }
    }

    /// The customer contact as stored. Call [`Self::validate`] first.
    pub fn customer_contact(&self) -> CustomerContact {
        let mut channels = Vec::with_capacity(self.customer.contact_channels.len());
        for channel in &self.customer.contact_channels {
            if !channels.contains(channel) {
                channels.push(*channel);
            }
        }
        CustomerContact {
            name: self.customer.name.trim().to_string(),
            phone: normalise_phone(&self.customer.phone).unwrap_or_else(|| self.customer.phone.clone()),
            email: non_blank(&self.customer.email).map(String::from),
            contact_channels: channels,
        }
    }

    pub fn delivery_details(&self, district: District) -> DeliveryDetails {
        let recipient = self.delivery.recipient.as_ref().map(|r| Recipient {
            name: r.name.trim().to_string(),
            phone: r.phone.as_deref().and_then(normalise_phone),
        });
        DeliveryDetails {
            address: non_blank(&self.delivery.address).unwrap_or_default().to_string(),
            geo_pin: self.delivery.geo_pin,
            map_link: non_blank(&self.delivery.map_link).map(String::from),
            district,
            is_central: self.delivery.is_central,
            delivery_window: non_blank(&self.delivery.delivery_window).map(String::from),
            recipient,
        }
    }
}

//--------------------------------------   Public order view   ---------------------------------------------------------
/// The label shown on the public order page for each payment status.
pub fn payment_state_label(status: PaymentStatus) -> &'static str {
    match status {
        PaymentStatus::PendingPayment => "awaiting payment",
        PaymentStatus::Paid => "paid",
        PaymentStatus::PaymentFailed => "payment not completed",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliverySummary {
    pub district: District,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_window: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_name: Option<String>,
}

/// What anyone holding the order link may see. Contact details and the street address are left out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicOrderView {
    pub order_id: OrderId,
    pub items: Vec<OrderItem>,
    pub totals: OrderTotals,
    pub currency: String,
    pub delivery: DeliverySummary,
    pub payment_status: PaymentStatus,
    pub payment_state: String,
    pub fulfillment_status: FulfillmentStatus,
}

impl From<&Order> for PublicOrderView {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.order_id.clone(),
            items: order.items.clone(),
            totals: order.totals,
            currency: order.currency.clone(),
            delivery: DeliverySummary {
                district: order.delivery.district,
                delivery_window: order.delivery.delivery_window.clone(),
                recipient_name: order.delivery.recipient.as_ref().map(|r| r.name.clone()),
            },
            payment_status: order.payment_status,
            payment_state: payment_state_label(order.payment_status).to_string(),
            fulfillment_status: order.fulfillment_status,
        }
    }
}

impl PublicOrderView {
    pub fn grand_total(&self) -> Baht {
        self.totals.grand_total
    }
}
