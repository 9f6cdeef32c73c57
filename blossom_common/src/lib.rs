mod baht;

pub mod helpers;
pub mod op;
mod secret;

pub use baht::{Baht, BahtConversionError, THAI_BAHT_CURRENCY_CODE, THAI_BAHT_CURRENCY_CODE_LOWER};
pub use secret::Secret;
