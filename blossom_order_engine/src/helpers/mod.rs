mod order_id;

pub use order_id::{OrderIdGenerator, DEFAULT_ORDER_ID_PREFIX};
