use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The conversation partner shown in the header
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatPeer {
    pub id: String,
    pub name: String,
}

impl ChatPeer {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Payload handed to the transport on submit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    /// Already-trimmed message text; may be empty for image-only sends
    pub text: String,
    /// Image attachment as a data URL
    pub image: Option<String>,
}

impl OutgoingMessage {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.image.is_none()
    }
}

/// One chat message as the store exposes it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub sender_id: String,
    pub text: Option<String>,
    /// Image attachment as a data URL
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Build the message a send request turns into.
    pub fn outgoing(sender_id: impl Into<String>, payload: OutgoingMessage) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender_id: sender_id.into(),
            text: if payload.text.is_empty() {
                None
            } else {
                Some(payload.text)
            },
            image: payload.image,
            created_at: Utc::now(),
        }
    }

    pub fn text(sender_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender_id: sender_id.into(),
            text: Some(text.into()),
            image: None,
            created_at: Utc::now(),
        }
    }

    /// Case-insensitive substring match against a live search term.
    ///
    /// An empty term matches every message; a non-empty term never
    /// matches a message without text.
    pub fn matches_search(&self, term: &str) -> bool {
        if term.is_empty() {
            return true;
        }
        match &self.text {
            Some(text) => text.to_lowercase().contains(&term.to_lowercase()),
            None => false,
        }
    }

    /// Timestamp as shown next to the bubble
    pub fn time_label(&self) -> String {
        self.created_at.format("%H:%M").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image_only(sender: &str) -> Message {
        Message {
            id: Uuid::new_v4(),
            sender_id: sender.into(),
            text: None,
            image: Some("data:image/png;base64,AAAA".into()),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_search_is_case_insensitive_substring() {
        let messages = vec![
            Message::text("a", "Hi there"),
            Message::text("b", "Bye"),
            image_only("a"),
        ];

        let hits: Vec<_> = messages.iter().filter(|m| m.matches_search("hi")).collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].text.as_deref(), Some("Hi there"));
    }

    #[test]
    fn test_empty_term_matches_all() {
        let messages = vec![Message::text("a", "Hello"), image_only("b")];
        assert!(messages.iter().all(|m| m.matches_search("")));
    }

    #[test]
    fn test_textless_message_never_matches_nonempty_term() {
        assert!(!image_only("a").matches_search("anything"));
    }

    #[test]
    fn test_outgoing_empty_text_becomes_none() {
        let message = Message::outgoing(
            "me",
            OutgoingMessage {
                text: String::new(),
                image: Some("data:image/png;base64,AAAA".into()),
            },
        );
        assert!(message.text.is_none());
        assert!(message.image.is_some());
    }

    #[test]
    fn test_payload_is_empty() {
        assert!(OutgoingMessage {
            text: String::new(),
            image: None
        }
        .is_empty());
        assert!(!OutgoingMessage {
            text: "hi".into(),
            image: None
        }
        .is_empty());
        assert!(!OutgoingMessage {
            text: String::new(),
            image: Some("data:image/png;base64,AAAA".into())
        }
        .is_empty());
    }
}
