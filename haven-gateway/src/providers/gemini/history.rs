//! Conversion between neutral chat messages and Gemini API contents.

use haven_core::{ChatMessage, ChatRole};
use serde::{Deserialize, Serialize};

/// Gemini API content structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeminiContent {
    pub role: String,
    pub parts: Vec<GeminiPart>,
}

/// Gemini API text part
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeminiPart {
    pub text: String,
}

/// Convert conversation turns to Gemini contents.
///
/// System messages are skipped (they travel as `systemInstruction`) and
/// `assistant` becomes Gemini's `model` role.
pub fn to_gemini_contents(turns: &[ChatMessage]) -> Vec<GeminiContent> {
    turns
        .iter()
        .filter_map(|msg| {
            let role = match msg.role {
                ChatRole::User => "user",
                ChatRole::Assistant => "model",
                ChatRole::System => return None,
            };
            Some(GeminiContent {
                role: role.to_string(),
                parts: vec![GeminiPart {
                    text: msg.content.clone(),
                }],
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roles_are_mapped() {
        let contents = to_gemini_contents(&[
            ChatMessage::system("ignored"),
            ChatMessage::user("hi"),
            ChatMessage::assistant("hello"),
        ]);

        assert_eq!(contents.len(), 2);
        assert_eq!(contents[0].role, "user");
        assert_eq!(contents[1].role, "model");
        assert_eq!(contents[1].parts[0].text, "hello");
    }
}
