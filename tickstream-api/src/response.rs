//! API response types.
//!
//! This module provides standardized response types for the API.

use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;

/// Standard API response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T>
where
    T: Serialize,
{
    /// Response status
    pub status: &'static str,
    /// Response data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Optional message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response with data.
    #[must_use]
    pub fn success(data: T) -> Self {
        Self {
            status: "success",
            data: Some(data),
            message: None,
        }
    }

    /// Creates a successful response with data and message.
    #[must_use]
    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            status: "success",
            data: Some(data),
            message: Some(message.into()),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> axum::response::Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_response() {
        let response = ApiResponse::success(vec![1, 2, 3]);
        assert_eq!(response.status, "success");
        assert_eq!(response.data, Some(vec![1, 2, 3]));
        assert!(response.message.is_none());
    }

    #[test]
    fn test_success_with_message() {
        let response = ApiResponse::success_with_message(42, "partial results");
        assert_eq!(response.data, Some(42));
        assert_eq!(response.message.as_deref(), Some("partial results"));
    }

    #[test]
    fn test_response_serialization_skips_none() {
        let response: ApiResponse<u32> = ApiResponse::success(7);
        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("message"));
    }
}
