use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use fulfillment_engine::FulfillmentError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("The request cannot be fulfilled. {0}")]
    InvalidRequest(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Unauthorized. {0}")]
    Unauthorized(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("The upstream provider could not be reached. {0}")]
    ProviderUnavailable(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::ProviderUnavailable(_) => StatusCode::BAD_GATEWAY,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl From<FulfillmentError> for ServerError {
    fn from(e: FulfillmentError) -> Self {
        match e {
            FulfillmentError::DatabaseError(_) | FulfillmentError::LimiterClosed => Self::BackendError(e.to_string()),
            FulfillmentError::OrderNotFound(_)
            | FulfillmentError::UserNotFound(_)
            | FulfillmentError::ServiceNotFound(_)
            | FulfillmentError::ProviderNotFound(_)
            | FulfillmentError::RequestNotFound { .. } => Self::NoRecordFound(e.to_string()),
            FulfillmentError::ProviderError(_) => Self::ProviderUnavailable(e.to_string()),
            _ => Self::InvalidRequest(e.to_string()),
        }
    }
}

#[cfg(test)]
mod test {
    use panel_common::OrderStatus;

    use super::*;

    #[test]
    fn engine_errors_map_to_status_codes() {
        let e = ServerError::from(FulfillmentError::DatabaseError("locked".into()));
        assert_eq!(e.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        let e = ServerError::from(FulfillmentError::OrderNotFound(4));
        assert_eq!(e.status_code(), StatusCode::NOT_FOUND);
        let e = ServerError::from(FulfillmentError::InvalidOrderState {
            id: 4,
            status: OrderStatus::Completed,
            action: "cancel".into(),
        });
        assert_eq!(e.status_code(), StatusCode::BAD_REQUEST);
    }
}
