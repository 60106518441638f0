use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Role of a message in a completion request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for ChatRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A role-tagged message, in the `{role, content}` shape every backend accepts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Body of `POST /api/chat` on the gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Successful gateway response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayReply {
    pub reply: String,
}

/// Error text the gateway answers with when it has no upstream key.
pub const MISSING_UPSTREAM_CREDENTIAL: &str = "QWEN_API_KEY is not configured on server.";

/// Failed gateway response. `details` carries the upstream body verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl GatewayErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn missing_upstream_credential() -> Self {
        Self::new(MISSING_UPSTREAM_CREDENTIAL)
    }

    pub fn is_missing_upstream_credential(&self) -> bool {
        self.error == MISSING_UPSTREAM_CREDENTIAL
    }
}

/// One drafted reply to a received message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplySuggestion {
    pub title: String,
    pub text: String,
    pub rational_analysis: String,
    pub warm_support: String,
}

impl ReplySuggestion {
    /// Wire names of the required fields, in schema order.
    pub const FIELDS: [&'static str; 4] = ["title", "text", "rationalAnalysis", "warmSupport"];

    /// JSON schema for an array of suggestions, for schema-capable providers.
    pub fn schema() -> Value {
        let properties: serde_json::Map<String, Value> = Self::FIELDS
            .iter()
            .map(|field| (field.to_string(), serde_json::json!({ "type": "STRING" })))
            .collect();

        serde_json::json!({
            "type": "ARRAY",
            "items": {
                "type": "OBJECT",
                "properties": properties,
                "required": Self::FIELDS,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_message_wire_shape() {
        let json = serde_json::to_value(ChatMessage::assistant("hi")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"role": "assistant", "content": "hi"})
        );
    }

    #[test]
    fn test_gateway_request_model_is_optional() {
        let request: GatewayRequest =
            serde_json::from_str(r#"{"messages":[{"role":"user","content":"hello"}]}"#).unwrap();
        assert!(request.model.is_none());
        assert_eq!(request.messages[0].role, ChatRole::User);
    }

    #[test]
    fn test_error_body_omits_empty_details() {
        let json = serde_json::to_string(&GatewayErrorBody::new("Request Timeout")).unwrap();
        assert_eq!(json, r#"{"error":"Request Timeout"}"#);
    }

    #[test]
    fn test_missing_credential_body_is_recognized() {
        let body: GatewayErrorBody = serde_json::from_str(
            r#"{"error":"QWEN_API_KEY is not configured on server."}"#,
        )
        .unwrap();
        assert!(body.is_missing_upstream_credential());
        let timeout = GatewayErrorBody::new("Request Timeout");
        assert!(!timeout.is_missing_upstream_credential());
    }

    #[test]
    fn test_suggestion_uses_camel_case() {
        let suggestion = ReplySuggestion {
            title: "A".to_string(),
            text: "B".to_string(),
            rational_analysis: "C".to_string(),
            warm_support: "D".to_string(),
        };
        let json = serde_json::to_value(&suggestion).unwrap();
        assert_eq!(json["rationalAnalysis"], "C");
        assert_eq!(json["warmSupport"], "D");
    }

    #[test]
    fn test_schema_lists_all_fields_as_required() {
        let schema = ReplySuggestion::schema();
        let required = schema["items"]["required"].as_array().unwrap();
        assert_eq!(required.len(), 4);
        assert!(schema["items"]["properties"]["warmSupport"].is_object());
    }
}
