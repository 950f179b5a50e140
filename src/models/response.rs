// src/models/response.rs

use axum::Json;
use serde::{Deserialize, Serialize};

/// Success envelope shared by every endpoint. Failures use the same shape with
/// `success: false` (see `AppError::into_response`).
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
        })
    }
}

/// Bare acknowledgement: `{"success": true}`.
pub fn ack() -> Json<ApiResponse<()>> {
    Json(ApiResponse {
        success: true,
        data: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ack_omits_data() {
        let body = serde_json::to_value(&ack().0).unwrap();
        assert_eq!(body, serde_json::json!({ "success": true }));
    }

    #[test]
    fn ok_wraps_payload() {
        let body = serde_json::to_value(&ApiResponse::ok(serde_json::json!({"id": 7})).0).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["id"], 7);
    }
}
