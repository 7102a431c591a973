//! Response envelope shared by every endpoint: `{statusCode, content, message, dateTime}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEntity {
    pub status_code: u16,
    pub content: Value,
    pub message: String,
    pub date_time: DateTime<Utc>,
}

impl ResponseEntity {
    pub fn new(status: StatusCode, content: Value, message: impl Into<String>) -> Self {
        ResponseEntity {
            status_code: status.as_u16(),
            content,
            message: message.into(),
            date_time: Utc::now(),
        }
    }

    pub fn ok<T: Serialize>(content: T, message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::OK,
            serde_json::to_value(content).unwrap_or_default(),
            message,
        )
    }
}

impl IntoResponse for ResponseEntity {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_field_names() {
        let body = serde_json::to_value(ResponseEntity::ok(json!({"id": 1}), "done")).unwrap();
        assert_eq!(body["statusCode"], 200);
        assert_eq!(body["content"]["id"], 1);
        assert_eq!(body["message"], "done");
        assert!(body["dateTime"].is_string());
    }
}
