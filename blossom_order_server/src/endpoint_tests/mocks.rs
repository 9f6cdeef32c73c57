use blossom_order_engine::db_types::Order;
use mockall::mock;

use crate::integrations::stripe::{CheckoutError, CheckoutLinks, CheckoutProvider, CheckoutSession};

mock! {
    pub Checkout {}
    impl CheckoutProvider for Checkout {
        async fn create_session(&self, order: &Order, links: &CheckoutLinks) -> Result<CheckoutSession, CheckoutError>;
    }
}

/// A checkout provider that opens `cs_<order id>` for every order.
pub fn working_checkout() -> MockCheckout {
    let mut checkout = MockCheckout::new();
    checkout.expect_create_session().returning(|order, _| {
        Ok(CheckoutSession {
            id: format!("cs_{}", order.order_id),
            url: format!("https://checkout.test/pay/cs_{}", order.order_id),
        })
    });
    checkout
}
