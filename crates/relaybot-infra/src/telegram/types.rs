//! Telegram Bot API wire types.
//!
//! Only the fields the relay reads are modelled; serde ignores the rest.

use serde::{Deserialize, Serialize};

/// Envelope every Bot API method answers with.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
    pub error_code: Option<i64>,
}

/// One entry from `getUpdates`.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<IncomingMessage>,
}

impl Update {
    /// Chat id and text if this update is a plain text message.
    pub fn text_message(&self) -> Option<(i64, &str)> {
        let message = self.message.as_ref()?;
        let text = message.text.as_deref()?;
        Some((message.chat.id, text))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IncomingMessage {
    pub message_id: i64,
    pub chat: Chat,
    pub from: Option<User>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: Option<String>,
}

/// Bot identity from `getMe`.
#[derive(Debug, Clone, Deserialize)]
pub struct BotUser {
    pub id: i64,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GetUpdatesRequest {
    pub offset: i64,
    pub timeout: u64,
    pub allowed_updates: Vec<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SendMessageRequest<'a> {
    pub chat_id: i64,
    pub text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SendChatActionRequest {
    pub chat_id: i64,
    pub action: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_updates() {
        let body = r#"{
            "ok": true,
            "result": [
                {"update_id": 10, "message": {"message_id": 1, "date": 0,
                    "chat": {"id": 42, "type": "private"},
                    "from": {"id": 7, "is_bot": false, "first_name": "A", "username": "alice"},
                    "text": "2+2?"}},
                {"update_id": 11, "message": {"message_id": 2, "date": 0,
                    "chat": {"id": 42, "type": "private"},
                    "sticker": {"file_id": "x"}}},
                {"update_id": 12, "edited_message": {"message_id": 1}}
            ]
        }"#;
        let response: ApiResponse<Vec<Update>> = serde_json::from_str(body).unwrap();
        assert!(response.ok);
        let updates = response.result.unwrap();
        assert_eq!(updates.len(), 3);
        assert_eq!(updates[0].text_message(), Some((42, "2+2?")));
        assert_eq!(
            updates[0].message.as_ref().unwrap().from.as_ref().unwrap().username.as_deref(),
            Some("alice")
        );
        assert!(updates[1].text_message().is_none());
        assert!(updates[2].text_message().is_none());
    }

    #[test]
    fn test_parse_error_envelope() {
        let body = r#"{"ok":false,"error_code":401,"description":"Unauthorized"}"#;
        let response: ApiResponse<Vec<Update>> = serde_json::from_str(body).unwrap();
        assert!(!response.ok);
        assert!(response.result.is_none());
        assert_eq!(response.error_code, Some(401));
        assert_eq!(response.description.as_deref(), Some("Unauthorized"));
    }

    #[test]
    fn test_send_message_omits_missing_parse_mode() {
        let plain = SendMessageRequest {
            chat_id: 1,
            text: "hi",
            parse_mode: None,
        };
        let json = serde_json::to_value(&plain).unwrap();
        assert!(json.get("parse_mode").is_none());
    }
}
