use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::chunks::store::ChunkStoreError;

/// Request-path failures, mapped to the nearest HTTP status.
///
/// Peer-transfer failures during replication never surface here: they are
/// retried inline and, on exhaustion, logged and left to the reconciler.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("storage failure: {0}")]
    Io(String),

    #[error("{0}")]
    Upstream(String),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Io(_) | ApiError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("request failed: {}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<ChunkStoreError> for ApiError {
    fn from(err: ChunkStoreError) -> Self {
        match err {
            ChunkStoreError::NotFound { user_id, filename } => {
                ApiError::NotFound(format!("no chunks stored for {}/{}", user_id, filename))
            }
            ChunkStoreError::InvalidName(name) => {
                ApiError::Validation(format!("unusable file name: {:?}", name))
            }
            ChunkStoreError::Io(e) => ApiError::Io(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::Validation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Io("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::Upstream("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_chunk_store_errors_map_to_api_kinds() {
        let not_found = ChunkStoreError::NotFound {
            user_id: "u1".into(),
            filename: "a.bin".into(),
        };
        assert!(matches!(ApiError::from(not_found), ApiError::NotFound(_)));

        let invalid = ChunkStoreError::InvalidName("..".into());
        assert!(matches!(ApiError::from(invalid), ApiError::Validation(_)));
    }
}
