use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// Uniform response body for every API route.
#[derive(Debug, Serialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// An envelope paired with its HTTP status.
#[derive(Debug)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub envelope: Envelope,
}

impl ApiResponse {
    pub fn ok(data: Value) -> Self {
        Self {
            status: StatusCode::OK,
            envelope: Envelope {
                success: true,
                data: Some(data),
                error: None,
                message: None,
                timestamp: Utc::now(),
            },
        }
    }

    pub fn ok_message(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            envelope: Envelope {
                success: true,
                data: None,
                error: None,
                message: Some(message.into()),
                timestamp: Utc::now(),
            },
        }
    }

    pub fn error(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            status,
            envelope: Envelope {
                success: false,
                data: None,
                error: Some(error.into()),
                message: None,
                timestamp: Utc::now(),
            },
        }
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.envelope)).into_response()
    }
}
