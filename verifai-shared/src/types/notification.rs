use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single inbox notification as the client sees it.
///
/// `id` is the remote document id and never changes; `created_at` is set once
/// by the producer. Read-state is mutated in place; everything else is only
/// ever replaced wholesale by an upsert under the same id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub is_read: bool,
    pub priority: i32,
    pub user_id: String,
    pub group_id: Option<String>,
    pub deep_link: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

/// Type-specific notification payloads.
///
/// Closed set: a new variant is a schema change for both the cache and the
/// remote collection, so serialization is funneled through the tagged serde
/// representation plus [`NotificationKind::tag`] and nowhere else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum NotificationKind {
    Reply {
        question_id: String,
        answer_id: String,
        responder_id: String,
        responder_name: String,
    },
    Like {
        target_id: String,
        // "ANSWER" or "COMMENT"
        target_type: String,
        user_id: String,
        user_name: String,
    },
    Comment {
        target_id: String,
        // "QUESTION" or "ANSWER"
        target_type: String,
        comment_id: String,
        comment_content: String,
    },
    System {
        action_type: String,
        metadata: HashMap<String, String>,
    },
}

impl NotificationKind {
    /// Stable tag stored in the cache `kind` column and the remote `type` field.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Reply { .. } => "REPLY",
            Self::Like { .. } => "LIKE",
            Self::Comment { .. } => "COMMENT",
            Self::System { .. } => "SYSTEM",
        }
    }

    /// Serialize to the payload JSON persisted alongside the tag.
    pub fn to_payload(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_payload(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn payload_carries_the_tag() {
        let kind = NotificationKind::Reply {
            question_id: "q1".into(),
            answer_id: "a1".into(),
            responder_id: "u2".into(),
            responder_name: "Expert".into(),
        };

        assert_eq!(kind.tag(), "REPLY");

        let payload = kind.to_payload().unwrap();
        assert!(payload.contains("\"type\":\"REPLY\""));
        assert_eq!(NotificationKind::from_payload(&payload).unwrap(), kind);
    }

    #[test]
    fn unknown_tag_is_rejected() {
        assert!(NotificationKind::from_payload("{\"type\":\"UPVOTE\"}").is_err());
    }
}
