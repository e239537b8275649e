use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

#[derive(thiserror::Error, Debug)]
pub enum ServiceError {
    /// Missing or malformed input. Nothing was written.
    #[error("validation error: {0}")]
    Validation(String),
    /// The request referred to nothing that exists.
    #[error("not found: {0}")]
    NotFound(String),
    #[error("compute error: {0}")]
    Compute(String),
    #[error("store error: {0}")]
    Store(String),
}

impl ServiceError {
    pub fn missing_field(field: &str) -> Self {
        Self::Validation(format!("missing required field: {field}"))
    }

    pub fn invalid_number(field: &str, raw: &str) -> Self {
        Self::Validation(format!("invalid numeric value for field '{field}': '{raw}'"))
    }

    /// Keeps the whole `anyhow` context chain in the message.
    pub fn store(e: impl std::fmt::Display) -> Self {
        Self::Store(format!("{e:#}"))
    }
}

#[derive(serde::Serialize)]
struct ErrorBody {
    level: &'static str,
    message: String,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, level, message) = match &self {
            Self::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, "danger", msg.clone()),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "warning", msg.clone()),
            Self::Compute(_) | Self::Store(_) => {
                tracing::error!(error = %self, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "danger",
                    "internal error while processing the request".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { level, message })).into_response()
    }
}
