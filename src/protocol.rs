//! Request and response bodies for `POST /api/chat`, shared by the server
//! and the terminal client.

use crate::neighborhood::LocationHint;
use serde::{Deserialize, Serialize};

/// Start of the trailer line carrying the structured reply in a text stream.
pub const SENTINEL_PREFIX: &str = "{\"parsed\":";

/// Shown in place of the assistant reply when a request fails.
pub const APOLOGY: &str = "Sorry, I encountered an error. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<ChatMessage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatEnvelope {
    pub parsed: ParsedReply,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedReply {
    pub response: String,
    pub location: Option<LocationHint>,
}

impl ChatEnvelope {
    pub fn new(response: impl Into<String>, location: Option<LocationHint>) -> Self {
        Self {
            parsed: ParsedReply {
                response: response.into(),
                location,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Finds the last sentinel line in `text` and parses it.
///
/// Returns the text preceding the sentinel (trailing whitespace removed) and
/// the envelope. The sentinel must start a line and run to the end of `text`;
/// anything else is treated as ordinary reply content.
pub fn extract_sentinel(text: &str) -> Option<(&str, ChatEnvelope)> {
    let mut search_end = text.len();
    while let Some(index) = text[..search_end].rfind(SENTINEL_PREFIX) {
        let at_line_start = index == 0 || text[..index].ends_with('\n');
        if at_line_start {
            return serde_json::from_str::<ChatEnvelope>(text[index..].trim_end())
                .ok()
                .map(|envelope| (text[..index].trim_end(), envelope));
        }
        search_end = index;
    }

    None
}

#[cfg(test)]
mod tests {
    use super::{ChatEnvelope, ChatRequest, Role, extract_sentinel};
    use crate::neighborhood::LocationHint;
    use serde_json::json;

    #[test]
    fn request_uses_camel_case_session_id() {
        let request: ChatRequest = serde_json::from_value(json!({
            "message": "hi",
            "sessionId": "abc",
            "history": [{"role": "user", "content": "earlier"}]
        }))
        .expect("request");
        assert_eq!(request.session_id, "abc");
        assert_eq!(request.history[0].role, Role::User);
    }

    #[test]
    fn request_tolerates_missing_fields() {
        let request: ChatRequest = serde_json::from_value(json!({})).expect("request");
        assert!(request.message.is_empty());
        assert!(request.history.is_empty());
    }

    #[test]
    fn envelope_serializes_missing_location_as_null() {
        let value = serde_json::to_value(ChatEnvelope::new("answer", None)).expect("json");
        assert_eq!(value, json!({"parsed": {"response": "answer", "location": null}}));
    }

    #[test]
    fn extract_sentinel_splits_trailer() {
        let trailer = serde_json::to_string(&ChatEnvelope::new(
            "Flooding is common.",
            Some(LocationHint {
                lat: 25.76,
                lon: -80.19,
            }),
        ))
        .expect("json");
        let text = format!("Flooding is common.\n{trailer}\n");

        let (before, envelope) = extract_sentinel(&text).expect("sentinel");
        assert_eq!(before, "Flooding is common.");
        assert_eq!(envelope.parsed.response, "Flooding is common.");
        assert_eq!(envelope.parsed.location.map(|l| l.lat), Some(25.76));
    }

    #[test]
    fn extract_sentinel_accepts_whole_body_envelope() {
        let text = r#"{"parsed":{"response":"ok","location":null}}"#;
        let (before, envelope) = extract_sentinel(text).expect("sentinel");
        assert_eq!(before, "");
        assert_eq!(envelope.parsed.response, "ok");
    }

    #[test]
    fn extract_sentinel_ignores_mid_line_prefix() {
        let text = r#"The model wrote {"parsed": inline and kept going"#;
        assert!(extract_sentinel(text).is_none());
    }

    #[test]
    fn extract_sentinel_falls_back_when_trailer_is_malformed() {
        let text = "Answer\n{\"parsed\":{\"response\":";
        assert!(extract_sentinel(text).is_none());
    }

    #[test]
    fn extract_sentinel_uses_last_line_start_occurrence() {
        let text = "{\"parsed\": is quoted here\nbody\n{\"parsed\":{\"response\":\"final\",\"location\":null}}";
        let (before, envelope) = extract_sentinel(text).expect("sentinel");
        assert_eq!(before, "{\"parsed\": is quoted here\nbody");
        assert_eq!(envelope.parsed.response, "final");
    }
}
