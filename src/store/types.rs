use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    Free,
    Pro,
    Campus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub display_name: String,
    pub role: Role,
    pub plan: PlanTier,
}

impl UserProfile {
    /// Minimal profile used when no stored record is reachable.
    pub fn default_for(id: &str, display_name: &str) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            role: Role::User,
            plan: PlanTier::Free,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Pdf,
    Docx,
    Txt,
}

/// An uploaded document after text extraction. Content is always plain text;
/// binary payloads never reach this layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub kind: SourceKind,
    pub content: String,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
}

impl DocumentRecord {
    pub fn new(
        owner_id: &str,
        name: &str,
        kind: SourceKind,
        content: String,
        size_bytes: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            name: name.to_string(),
            kind,
            content,
            size_bytes,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestedAction {
    Quiz,
    Rubric,
    Chat,
}

/// A derived follow-up action offered after an assistant response. Persisted
/// with the owning message so it survives reload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub label: String,
    pub action: SuggestedAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_prompt: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: MessageRole,
    pub text: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_error: bool,
    #[serde(default)]
    pub suggestions: Vec<Suggestion>,
}

impl ChatMessage {
    fn new(role: MessageRole, text: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            text: text.to_string(),
            created_at: Utc::now(),
            is_error: false,
            suggestions: Vec::new(),
        }
    }

    pub fn user(text: &str) -> Self {
        Self::new(MessageRole::User, text)
    }

    pub fn assistant(text: &str) -> Self {
        Self::new(MessageRole::Assistant, text)
    }

    /// Empty assistant message created before the first stream chunk arrives.
    pub fn placeholder() -> Self {
        Self::new(MessageRole::Assistant, "")
    }

    pub fn error_reply(text: &str) -> Self {
        let mut msg = Self::new(MessageRole::Assistant, text);
        msg.is_error = true;
        msg
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleEvent {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub date: String,
    pub category: String,
}

impl ScheduleEvent {
    pub fn new(owner_id: &str, title: &str, date: &str, category: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            title: title.to_string(),
            date: date.to_string(),
            category: category.to_string(),
        }
    }
}
