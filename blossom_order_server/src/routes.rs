//! Request handler definitions
//!
//! Define each route and its handler here. Handlers only translate between HTTP and the engine APIs; anything more
//! than a few lines of logic belongs in the engine or in `integrations`.
//!
//! A note about performance:
//! Each worker thread processes its requests sequentially, so a handler that blocks the current thread stops the
//! worker from serving anything else. Every store call, checkout call and notification is therefore an `async`
//! operation, and slow side effects (mirroring, backfills, emails) are handed to the background worker instead of
//! being awaited here.
use actix_web::{delete, get, patch, post, web, HttpResponse, Responder};
use blossom_order_engine::{
    db_types::OrderId,
    order_objects::{normalise_phone, OrderRequest, PublicOrderView},
    payment_objects::WebhookOutcome,
    traits::{OrderQueryFilter, PaymentEventLedger},
    OrderFlowApi,
    OrderFlowError,
    PaymentFlowApi,
};
use log::*;

use crate::{
    data_objects::{
        AdminOrderQuery,
        CheckoutResponse,
        FulfillmentUpdate,
        JsonResponse,
        OrderCreatedResponse,
        WebhookAck,
    },
    errors::ServerError,
    helpers::PublicLinks,
    integrations::stripe::{classify_event, parse_event, CheckoutError, CheckoutLinks, CheckoutProvider, EventClass},
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Storefront  ----------------------------------------------------
/// Route handler for order submissions that are paid offline (bank transfer or cash on delivery).
///
/// Prices are resolved from the price schedule; the request only names bouquets, sizes and add-ons. Validation
/// failures come back as `400` with a message that can be shown to the customer as is.
#[post("/orders")]
pub async fn create_order(
    body: web::Json<OrderRequest>,
    api: web::Data<OrderFlowApi>,
    links: web::Data<PublicLinks>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ Received order submission");
    let order = api.create_order(body.into_inner()).await?;
    let response = OrderCreatedResponse {
        public_order_url: links.order_url(&order.order_id),
        share_text: links.share_text(&order),
        order_id: order.order_id,
    };
    info!("💻️ Order [{}] created", response.order_id);
    Ok(HttpResponse::Ok().json(response))
}

route!(checkout => Post "/checkout" impl CheckoutProvider);
/// Route handler for online payments.
///
/// A `pending_payment` order is written first, then a hosted checkout session is opened for it and the session id is
/// bound to the order. If the payment provider cannot be reached, the pending order stays behind unpaid and the
/// customer can simply try again.
pub async fn checkout<C: CheckoutProvider>(
    body: web::Json<OrderRequest>,
    api: web::Data<OrderFlowApi>,
    provider: web::Data<C>,
    links: web::Data<PublicLinks>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ Received checkout request");
    let order = api.create_pending_order(body.into_inner()).await?;
    let order_id = order.order_id.clone();
    let checkout_links = CheckoutLinks {
        success_url: links.checkout_success_url(&order_id),
        cancel_url: links.checkout_cancel_url(&order_id),
    };
    let session = provider.create_session(&order, &checkout_links).await.map_err(|e| {
        error!("💻️ Could not open a checkout session for order [{order_id}]. {e}");
        match e {
            CheckoutError::NotConfigured => ServerError::ConfigurationError("Online payment is not available".into()),
            _ => ServerError::PaymentProviderError("Please try again in a moment".into()),
        }
    })?;
    api.attach_checkout_session(&order_id, &session.id).await?;
    info!("💻️ Checkout session {} opened for order [{order_id}]", session.id);
    Ok(HttpResponse::Ok().json(CheckoutResponse { order_id, checkout_url: session.url }))
}

/// Route handler for the public order page. Contact details and the street address are not included.
#[get("/orders/{order_id}")]
pub async fn public_order(
    path: web::Path<String>,
    api: web::Data<OrderFlowApi>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId::from(path.into_inner());
    trace!("💻️ Public view requested for order [{order_id}]");
    let order = api.fetch_order(&order_id).await?;
    Ok(HttpResponse::Ok().json(PublicOrderView::from(&order)))
}

//----------------------------------------------   Payment webhook  ----------------------------------------------------
route!(payment_webhook => Post "/payments" impl PaymentEventLedger);
/// Route handler for payment processor deliveries.
///
/// The signature has already been checked by the time this runs (see
/// [`crate::middleware::SignatureMiddlewareFactory`]). Every outcome the processor should not retry is a `200` with
/// the outcome label, including duplicates and orders we do not know. Conflicts and malformed events are `400`;
/// storage failures are `500` so that the processor retries.
pub async fn payment_webhook<L: PaymentEventLedger>(
    body: web::Bytes,
    api: web::Data<PaymentFlowApi<L>>,
) -> Result<HttpResponse, ServerError> {
    let event = parse_event(&body).map_err(|e| {
        warn!("🪝️ {e}");
        ServerError::WebhookRejected(e.to_string())
    })?;
    debug!("🪝️ Received {} ({})", event.event_type, event.id);
    let notification = match classify_event(&event) {
        Ok(EventClass::Payment(notification)) => notification,
        Ok(EventClass::Ignored(reason)) => {
            debug!("🪝️ Ignoring {}. {reason}", event.id);
            return Ok(HttpResponse::Ok().json(WebhookAck::new(WebhookOutcome::Ignored.label())));
        },
        Err(e) => {
            warn!("🪝️ Rejecting {}. {e}", event.id);
            return Err(ServerError::WebhookRejected(e.to_string()));
        },
    };
    match api.process_notification(&notification).await {
        Ok(outcome) => {
            info!("🪝️ {} for order [{}]: {}", event.event_type, notification.order_id, outcome.label());
            Ok(HttpResponse::Ok().json(WebhookAck::new(outcome.label())))
        },
        Err(OrderFlowError::ConflictError(msg)) => {
            warn!("🪝️ Rejecting {} for order [{}]. {msg}", event.id, notification.order_id);
            Err(ServerError::WebhookRejected(msg))
        },
        Err(e) => Err(e.into()),
    }
}

//----------------------------------------------   Admin  ----------------------------------------------------
/// Lists orders from the primary store, newest first. The phone filter accepts the same formats as order submission.
#[get("/orders")]
pub async fn admin_orders(
    query: web::Query<AdminOrderQuery>,
    api: web::Data<OrderFlowApi>,
) -> Result<HttpResponse, ServerError> {
    let mut query = query.into_inner();
    if let Some(phone) = query.phone.take() {
        let normalised = normalise_phone(&phone)
            .ok_or_else(|| ServerError::ValidationError(format!("'{phone}' is not a valid phone number")))?;
        query.phone = Some(normalised);
    }
    let filter = OrderQueryFilter::from(query);
    trace!("💻️ Admin order search: {filter:?}");
    let orders = api.search_orders(&filter).await?;
    Ok(HttpResponse::Ok().json(orders))
}

#[get("/orders/{order_id}")]
pub async fn admin_order(path: web::Path<String>, api: web::Data<OrderFlowApi>) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId::from(path.into_inner());
    let order = api.fetch_order(&order_id).await?;
    Ok(HttpResponse::Ok().json(order))
}

#[patch("/orders/{order_id}/fulfillment")]
pub async fn update_fulfillment(
    path: web::Path<String>,
    body: web::Json<FulfillmentUpdate>,
    api: web::Data<OrderFlowApi>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId::from(path.into_inner());
    let order = api.update_fulfillment(&order_id, body.status).await?;
    Ok(HttpResponse::Ok().json(order))
}

/// Records an offline payment. Marking a paid order again is harmless.
#[post("/orders/{order_id}/paid")]
pub async fn mark_paid(path: web::Path<String>, api: web::Data<OrderFlowApi>) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId::from(path.into_inner());
    let order = api.mark_paid_manually(&order_id).await?;
    Ok(HttpResponse::Ok().json(order))
}

#[delete("/orders/{order_id}")]
pub async fn delete_order(path: web::Path<String>, api: web::Data<OrderFlowApi>) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId::from(path.into_inner());
    api.delete_order(&order_id).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Order {order_id} deleted"))))
}
