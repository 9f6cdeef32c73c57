use crate::{
    db_types::{NewPaymentEvent, PaymentEvent},
    traits::{InsertEventResult, StoreError},
};

#[allow(async_fn_in_trait)]
pub trait PaymentEventLedger: Clone {
    /// Records a webhook event. A second insert of the same event id must be reported as
    /// [`InsertEventResult::AlreadyProcessed`] rather than silently succeeding.
    async fn record_payment_event(&self, event: &NewPaymentEvent) -> Result<InsertEventResult, StoreError>;

    /// Removes a ledger entry so that a redelivery of the event is processed again. Used when the order mutation that
    /// followed the insert failed.
    async fn release_payment_event(&self, event_id: &str) -> Result<(), StoreError>;

    async fn fetch_payment_event(&self, event_id: &str) -> Result<Option<PaymentEvent>, StoreError>;
}
