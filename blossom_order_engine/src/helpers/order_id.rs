use chrono::{DateTime, Datelike, Utc};
use rand::{thread_rng, Rng};

use crate::db_types::OrderId;

pub const DEFAULT_ORDER_ID_PREFIX: &str = "BLS";
const RANDOM_LEN: usize = 6;
/// Upper-case letters and digits without the look-alikes (0/O, 1/I/L) so ids survive being read over the phone.
const ALPHABET: [char; 31] = [
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'J', 'K', 'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y',
    'Z', '2', '3', '4', '5', '6', '7', '8', '9',
];

/// Generates `PREFIX-YEAR-RANDOM` order ids.
#[derive(Debug, Clone)]
pub struct OrderIdGenerator {
    prefix: String,
}

impl Default for OrderIdGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_ORDER_ID_PREFIX)
    }
}

impl OrderIdGenerator {
    pub fn new<S: AsRef<str>>(prefix: S) -> Self {
        let prefix = prefix.as_ref().trim().trim_end_matches('-').to_uppercase();
        let prefix = if prefix.is_empty() { DEFAULT_ORDER_ID_PREFIX.to_string() } else { prefix };
        Self { prefix }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn generate(&self, now: DateTime<Utc>) -> OrderId {
        let mut rng = thread_rng();
        let random: String = (0..RANDOM_LEN).map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())]).collect();
        OrderId(format!("{}-{}-{random}", self.prefix, now.year()))
    }
}
