use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rasayan_order::OrderError;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Order(#[from] OrderError),

    #[error("{0}")]
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Order(err) => match &err {
                OrderError::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
                OrderError::Validation(_)
                | OrderError::MissingDocuments(_)
                | OrderError::EmptyReference
                | OrderError::UnknownPayee(_) => (StatusCode::BAD_REQUEST, err.to_string()),
                OrderError::InvalidTransition { .. }
                | OrderError::InvalidState(_, _)
                | OrderError::AlreadyPaid(_)
                | OrderError::Conflict(_) => (StatusCode::CONFLICT, err.to_string()),
                OrderError::DirectoryUnavailable(_) | OrderError::Storage(_) => {
                    tracing::error!("Internal error: {}", err);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Internal Server Error".to_string(),
                    )
                }
            },
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
