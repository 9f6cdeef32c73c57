use std::time::Duration;

use blossom_order_engine::db_types::{Order, OrderId};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

pub type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("No signing secret has been configured")]
    NotConfigured,
    #[error("The signature header is missing")]
    MissingHeader,
    #[error("The signature header is malformed. {0}")]
    MalformedHeader(String),
    #[error("The signature timestamp is {0}s away from the server clock")]
    StaleTimestamp(i64),
    #[error("No signature in the header matches the payload")]
    Mismatch,
}

/// The parts of a `Stripe-Signature` header that matter: `t=<unix seconds>` and one or more `v1=<hex>` entries.
/// Other schemes (e.g. `v0`) are skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    pub timestamp: i64,
    pub signatures: Vec<String>,
}

impl SignatureHeader {
    pub fn parse(header: &str) -> Result<Self, SignatureError> {
        let mut timestamp = None;
        let mut signatures = Vec::new();
        for part in header.split(',') {
            let Some((key, value)) = part.trim().split_once('=') else {
                return Err(SignatureError::MalformedHeader(format!("'{part}' is not a key=value pair")));
            };
            match key {
                "t" => {
                    let t = value
                        .parse::<i64>()
                        .map_err(|e| SignatureError::MalformedHeader(format!("Invalid timestamp. {e}")))?;
                    timestamp = Some(t);
                },
                "v1" => signatures.push(value.to_string()),
                _ => {},
            }
        }
        let timestamp = timestamp.ok_or_else(|| SignatureError::MalformedHeader("No timestamp".into()))?;
        if signatures.is_empty() {
            return Err(SignatureError::MalformedHeader("No v1 signature".into()));
        }
        Ok(Self { timestamp, signatures })
    }
}

fn keyed_mac(secret: &str, timestamp: i64, payload: &[u8]) -> Result<HmacSha256, SignatureError> {
    if secret.is_empty() {
        return Err(SignatureError::NotConfigured);
    }
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::NotConfigured)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

/// Hex-encoded HMAC-SHA256 of `"{timestamp}.{payload}"`.
pub fn sign_payload(secret: &str, timestamp: i64, payload: &[u8]) -> Result<String, SignatureError> {
    let mac = keyed_mac(secret, timestamp, payload)?;
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// A complete `Stripe-Signature` header value for `payload`.
pub fn signature_header(secret: &str, timestamp: i64, payload: &[u8]) -> Result<String, SignatureError> {
    let signature = sign_payload(secret, timestamp, payload)?;
    Ok(format!("t={timestamp},v1={signature}"))
}

/// Checks the header against the raw request body. Signatures are compared in constant time.
pub fn verify_signature(
    secret: &str,
    header: &str,
    payload: &[u8],
    now: i64,
    tolerance: Duration,
) -> Result<(), SignatureError> {
    let header = SignatureHeader::parse(header)?;
    let skew = (now - header.timestamp).abs();
    if skew > tolerance.as_secs() as i64 {
        return Err(SignatureError::StaleTimestamp(skew));
    }
    let mac = keyed_mac(secret, header.timestamp, payload)?;
    let matched = header
        .signatures
        .iter()
        .filter_map(|s| hex::decode(s).ok())
        .any(|expected| mac.clone().verify_slice(&expected).is_ok());
    if matched {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

//--------------------------------------------   Public links   --------------------------------------------------------
/// Builds the customer-facing links for an order.
#[derive(Debug, Clone)]
pub struct PublicLinks {
    base_url: String,
}

impl PublicLinks {
    pub fn new(base_url: &str) -> Self {
        Self { base_url: base_url.trim_end_matches('/').to_string() }
    }

    pub fn order_url(&self, order_id: &OrderId) -> String {
        format!("{}/orders/{order_id}", self.base_url)
    }

    pub fn checkout_success_url(&self, order_id: &OrderId) -> String {
        format!("{}?checkout=success", self.order_url(order_id))
    }

    pub fn checkout_cancel_url(&self, order_id: &OrderId) -> String {
        format!("{}?checkout=cancelled", self.order_url(order_id))
    }

    /// A short message the customer can paste into a chat app.
    pub fn share_text(&self, order: &Order) -> String {
        let url = self.order_url(&order.order_id);
        let total = order.totals.grand_total;
        match order.locale.as_deref() {
            Some(locale) if locale.starts_with("th") => {
                format!("คำสั่งซื้อดอกไม้ {} ยอดรวม {total} ติดตามสถานะได้ที่ {url}", order.order_id)
            },
            _ => format!("Blossom order {}, total {total}. Track it here: {url}", order.order_id),
        }
    }
}
