//! Handler error type and its HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::{error, warn};

use crate::model::ModelError;
use crate::prompt::TemplateError;
use crate::server::api::ErrorResponse;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Model call failed: {0}")]
    Model(#[from] ModelError),

    #[error("Prompt could not be built: {0}")]
    Template(#[from] TemplateError),

    #[error("Provider returned no embedding")]
    EmptyEmbedding,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Model(_) | ApiError::EmptyEmbedding => StatusCode::BAD_GATEWAY,
            ApiError::Template(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() && status != StatusCode::BAD_GATEWAY {
            error!("{self}");
        } else {
            warn!("{self}");
        }

        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
