use std::path::Path;

use blossom_common::{Baht, THAI_BAHT_CURRENCY_CODE};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizePrice {
    pub label: String,
    pub price: Baht,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bouquet {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub sizes: Vec<SizePrice>,
}

impl Bouquet {
    pub fn price_for(&self, size: &str) -> Option<Baht> {
        self.sizes.iter().find(|s| s.label.eq_ignore_ascii_case(size.trim())).map(|s| s.price)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddOn {
    pub id: String,
    pub label: String,
    pub price: Baht,
}

#[derive(Debug, Error)]
pub enum ScheduleLoadError {
    #[error("Could not read the price schedule file. {0}")]
    Io(#[from] std::io::Error),
    #[error("The price schedule file is not valid JSON. {0}")]
    Json(#[from] serde_json::Error),
    #[error("The price schedule is invalid. {0}")]
    Invalid(String),
}

/// The authoritative prices for bouquets (per size) and add-ons. Caller input only ever names items; prices always
/// come from here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceSchedule {
    pub currency: String,
    pub bouquets: Vec<Bouquet>,
    #[serde(default)]
    pub add_ons: Vec<AddOn>,
}

impl PriceSchedule {
    pub fn from_json(json: &str) -> Result<Self, ScheduleLoadError> {
        let schedule: Self = serde_json::from_str(json)?;
        schedule.validate()?;
        Ok(schedule)
    }

    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScheduleLoadError> {
        let json = tokio::fs::read_to_string(path).await?;
        Self::from_json(&json)
    }

    pub fn bouquet(&self, id: &str) -> Option<&Bouquet> {
        self.bouquets.iter().find(|b| b.id == id.trim())
    }

    pub fn add_on(&self, id: &str) -> Option<&AddOn> {
        self.add_ons.iter().find(|a| a.id == id.trim())
    }

    fn validate(&self) -> Result<(), ScheduleLoadError> {
        if self.bouquets.is_empty() {
            return Err(ScheduleLoadError::Invalid("There are no bouquets in the schedule".into()));
        }
        let negative_bouquet = self.bouquets.iter().flat_map(|b| b.sizes.iter()).find(|s| s.price.is_negative());
        if let Some(size) = negative_bouquet {
            return Err(ScheduleLoadError::Invalid(format!("Size {} has a negative price", size.label)));
        }
        if let Some(add_on) = self.add_ons.iter().find(|a| a.price.is_negative()) {
            return Err(ScheduleLoadError::Invalid(format!("Add-on {} has a negative price", add_on.id)));
        }
        Ok(())
    }
}

fn bouquet(id: &str, title: &str, sizes: &[(&str, i64)]) -> Bouquet {
    Bouquet {
        id: id.to_string(),
        title: title.to_string(),
        image_url: Some(format!("/images/bouquets/{id}.jpg")),
        sizes: sizes
            .iter()
            .map(|(label, price)| SizePrice { label: label.to_string(), price: Baht::from(*price) })
            .collect(),
    }
}

fn add_on(id: &str, label: &str, price: i64) -> AddOn {
    AddOn { id: id.to_string(), label: label.to_string(), price: Baht::from(price) }
}

impl Default for PriceSchedule {
    /// The built-in schedule, used when no schedule file is configured.
    fn default() -> Self {
        Self {
            currency: THAI_BAHT_CURRENCY_CODE.to_string(),
            bouquets: vec![
                bouquet("sunrise-roses", "Sunrise Roses", &[("S", 890), ("M", 1290), ("L", 1890)]),
                bouquet("lanna-orchids", "Lanna Orchids", &[("S", 990), ("M", 1490), ("L", 2190)]),
                bouquet("white-jasmine", "White Jasmine Garland", &[("M", 690), ("L", 990)]),
                bouquet("sunflower-field", "Sunflower Field", &[("S", 790), ("M", 1190), ("L", 1690)]),
            ],
            add_ons: vec![
                add_on("card", "Greeting card", 50),
                add_on("vase", "Glass vase", 350),
                add_on("chocolate", "Chocolate box", 250),
            ],
        }
    }
}
