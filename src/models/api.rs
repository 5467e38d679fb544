//! JSON bodies exchanged with the browser front-end.

use serde::{ Serialize, Deserialize };
use serde_json::Value;

#[derive(Deserialize, Debug, Default)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

impl ChatRequest {
    /// Reads the fields the front-end may send, ignoring any whose type is
    /// off. A numeric `session_id` is taken as its decimal text.
    pub fn from_value(body: &Value) -> Self {
        let message = body.get("message").and_then(Value::as_str).map(String::from);
        let session_id = match body.get("session_id") {
            Some(Value::String(id)) => Some(id.clone()),
            Some(Value::Number(id)) => Some(id.to_string()),
            _ => None,
        };
        Self { message, session_id }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ChatReply {
    pub reply: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct PhotosResponse {
    pub images: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct HealthResponse {
    pub status: String,
    pub chat_enabled: bool,
    pub sessions: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn mistyped_fields_are_ignored_individually() {
        let request = ChatRequest::from_value(&json!({ "message": "bonjour", "session_id": 42 }));
        assert_eq!(request.message.as_deref(), Some("bonjour"));
        assert_eq!(request.session_id.as_deref(), Some("42"));

        let request = ChatRequest::from_value(&json!({ "message": ["x"], "session_id": { "a": 1 } }));
        assert!(request.message.is_none());
        assert!(request.session_id.is_none());
    }

    #[test]
    fn non_object_body_is_empty() {
        let request = ChatRequest::from_value(&json!("bonjour"));
        assert!(request.message.is_none());
        assert!(request.session_id.is_none());
    }
}
