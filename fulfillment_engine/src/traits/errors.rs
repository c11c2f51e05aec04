use panel_common::{Amount, OrderStatus, Quantity};
use provider_tools::ProviderApiError;
use thiserror::Error;

use crate::db_types::{ProviderStatus, RequestKind};

#[derive(Debug, Clone, Error)]
pub enum FulfillmentError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("The requested order #{0} does not exist")]
    OrderNotFound(i64),
    #[error("The requested user #{0} does not exist")]
    UserNotFound(i64),
    #[error("The requested service #{0} does not exist")]
    ServiceNotFound(i64),
    #[error("The requested provider #{0} does not exist")]
    ProviderNotFound(i64),
    #[error("Provider #{id} is {status}")]
    ProviderNotActive { id: i64, status: ProviderStatus },
    #[error("Service #{0} is not linked to a provider")]
    ServiceNotLinked(i64),
    #[error("Quantity {quantity} is outside the allowed range of {min} to {max}")]
    QuantityOutOfBounds { quantity: Quantity, min: Quantity, max: Quantity },
    #[error("Insufficient balance. The order costs {price}, but the balance is {balance}")]
    InsufficientBalance { balance: Amount, price: Amount },
    #[error("Order #{0} has already been forwarded to its provider")]
    OrderAlreadyForwarded(i64),
    #[error("Order #{0} has not been forwarded to a provider")]
    OrderNotForwarded(i64),
    #[error("Cannot {action} order #{id} while it is {status}")]
    InvalidOrderState { id: i64, status: OrderStatus, action: String },
    #[error("Refill is not allowed. {0}")]
    RefillNotAllowed(String),
    #[error("Cancellation is not allowed. {0}")]
    CancelNotAllowed(String),
    #[error("Order #{order_id} already has a {kind} request in progress")]
    LiveRequestExists { kind: RequestKind, order_id: i64 },
    #[error("The {kind} request #{id} does not exist")]
    RequestNotFound { kind: RequestKind, id: i64 },
    #[error("Could not calculate the order price. {0}")]
    PricingError(String),
    #[error("{0}")]
    ProviderError(#[from] ProviderApiError),
    #[error("The provider request limiter has been shut down")]
    LimiterClosed,
}

impl From<sqlx::Error> for FulfillmentError {
    fn from(e: sqlx::Error) -> Self {
        FulfillmentError::DatabaseError(e.to_string())
    }
}
