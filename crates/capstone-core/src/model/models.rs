//! Document types for the Capstone platform.
//!
//! Every type here is a document in one collection of the store. Ids are
//! opaque strings; ownership is by reference (`student_id`, `uploaded_by`)
//! with no cascading enforced by the store itself.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::*;

/// A platform user. Stored in the `users` collection, keyed by uid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub uid: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    /// Free-form client preferences, never interpreted server-side.
    #[serde(default)]
    pub preferences: serde_json::Map<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A student project supervised by one supervisor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub student_id: String,
    pub supervisor_id: String,
    pub status: ProjectStatus,
    /// Ordered milestone timeline, embedded in the project document.
    pub timeline: Vec<Milestone>,
    /// Aggregate progress: rounded mean of `timeline[].progress`, 0 when
    /// the timeline is empty. Must be recomputed on every milestone write.
    pub progress: u8,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A milestone embedded in a project timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Milestone {
    pub id: String,
    pub title: String,
    pub due_date: Option<DateTime<Utc>>,
    pub completed: bool,
    /// Completion percentage, 0..=100.
    pub progress: u8,
}

/// A message in a project's `messages` sub-collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub sender_id: String,
    pub content: String,
    #[serde(default)]
    pub kind: MessageKind,
    /// uid -> timestamp of when that user read the message.
    #[serde(default)]
    pub read_by: BTreeMap<String, DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A stored chatbot exchange, ratable by its creator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatbotInteraction {
    pub id: String,
    pub user_id: String,
    pub query: String,
    pub response: String,
    #[serde(default)]
    pub language: ChatLanguage,
    /// 1..=5, set by `rateChatbotResponse`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    /// Opaque client context, stored but never interpreted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// A notification addressed to a single user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub kind: NotificationKind,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// Metadata for an uploaded file.
///
/// `url` stays empty until the upload is confirmed against the blob store;
/// a document without `url` is an upload that was requested but never
/// completed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileMetadata {
    pub id: String,
    pub name: String,
    pub size: u64,
    pub content_type: String,
    pub uploaded_by: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Project {
    /// Whether `uid` is the project's student or supervisor.
    pub fn is_member(&self, uid: &str) -> bool {
        self.student_id == uid || self.supervisor_id == uid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_membership() {
        let project = Project {
            id: "p1".into(),
            title: "Thesis".into(),
            description: None,
            student_id: "s1".into(),
            supervisor_id: "sup1".into(),
            status: ProjectStatus::Planning,
            timeline: vec![],
            progress: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert!(project.is_member("s1"));
        assert!(project.is_member("sup1"));
        assert!(!project.is_member("other"));
    }

    #[test]
    fn test_message_roundtrip() {
        let mut read_by = BTreeMap::new();
        read_by.insert("s1".to_string(), Utc::now());

        let msg = Message {
            id: "m1".into(),
            sender_id: "s1".into(),
            content: "hello".into(),
            kind: MessageKind::Text,
            read_by,
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["kind"], "text");
        let back: Message = serde_json::from_value(json).unwrap();
        assert!(back.read_by.contains_key("s1"));
    }

    #[test]
    fn test_file_metadata_url_omitted_until_confirmed() {
        let meta = FileMetadata {
            id: "f1".into(),
            name: "report.pdf".into(),
            size: 1024,
            content_type: "application/pdf".into(),
            uploaded_by: "s1".into(),
            project_id: None,
            url: None,
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(&meta).unwrap();
        assert!(json.get("url").is_none());
    }
}
