use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use blossom_order_engine::OrderFlowError;
use log::error;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    /// Caller input that failed validation. The message is shown to the caller verbatim.
    #[error("{0}")]
    ValidationError(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("{0}")]
    Conflict(String),
    /// A webhook delivery that is well-formed but cannot be accepted.
    #[error("{0}")]
    WebhookRejected(String),
    #[error("Signature invalid")]
    InvalidSignature,
    #[error("Admin secret missing or invalid")]
    Unauthorized,
    /// The details are logged where the error is created. Callers only ever see the generic message.
    #[error("An error occurred on the backend of the server. Please try again later.")]
    BackendError(String),
    #[error("The payment provider could not be reached. {0}")]
    PaymentProviderError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::WebhookRejected(_) => StatusCode::BAD_REQUEST,
            Self::InvalidSignature => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::PaymentProviderError(_) => StatusCode::BAD_GATEWAY,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl From<OrderFlowError> for ServerError {
    fn from(e: OrderFlowError) -> Self {
        match e {
            OrderFlowError::ValidationError(msg) => Self::ValidationError(msg),
            OrderFlowError::NotFoundError(id) => Self::NoRecordFound(format!("Order {id} does not exist")),
            OrderFlowError::ConflictError(msg) => Self::Conflict(msg),
            OrderFlowError::DependencyError { order_id, message } => {
                match order_id {
                    Some(id) => error!("💻️ A storage dependency failed for order [{id}]. {message}"),
                    None => error!("💻️ A storage dependency failed. {message}"),
                }
                Self::BackendError(message)
            },
            OrderFlowError::DuplicateEventError(event_id) => {
                Self::Conflict(format!("Payment event {event_id} has already been processed"))
            },
        }
    }
}
