use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::ApiError;

/// Success envelope: `{status, message, data, error: null}`.
///
/// Errors use the same shape through [`ApiError::to_json`], so clients can
/// branch on `status` alone.
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub status_code: StatusCode,
    pub message: String,
}

impl<T: Serialize> ApiResponse<T> {
    /// 200 OK
    pub fn success(data: T) -> Self {
        Self::with_status(data, StatusCode::OK, "OK")
    }

    pub fn with_status(data: T, status_code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            data,
            status_code,
            message: message.into(),
        }
    }

    /// 201 Created
    pub fn created(data: T) -> Self {
        Self::with_status(data, StatusCode::CREATED, "Created")
    }
}

impl ApiResponse<()> {
    /// 200 with a null payload, used for deletes.
    pub fn empty(message: impl Into<String>) -> Self {
        Self::with_status((), StatusCode::OK, message)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let data_value = match serde_json::to_value(&self.data) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("Failed to serialize response data: {}", e);
                return ApiError::internal_server_error("Failed to serialize response data").into_response();
            }
        };

        let envelope = json!({
            "status": self.status_code.as_u16(),
            "message": self.message,
            "data": data_value,
            "error": Value::Null,
        });

        (self.status_code, Json(envelope)).into_response()
    }
}

pub type ApiResult<T> = Result<ApiResponse<T>, ApiError>;
