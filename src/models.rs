use serde::{Deserialize, Serialize};

/// Note lifecycle status. The wire strings ("In Progress" with a space) are
/// what the store columns and the frontend expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum NoteStatus {
    #[default]
    Pending,
    #[serde(rename = "In Progress")]
    InProgress,
    Done,
}

impl NoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoteStatus::Pending => "Pending",
            NoteStatus::InProgress => "In Progress",
            NoteStatus::Done => "Done",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NoteCreate {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub status: NoteStatus,
}

#[derive(Debug, Deserialize)]
pub struct NoteUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub status: Option<NoteStatus>,
}

impl NoteUpdate {
    /// Patch body with only the provided fields, or None when the update is
    /// empty (which the handler rejects with 400 before any store call).
    pub fn to_patch(&self) -> Option<serde_json::Value> {
        let mut patch = serde_json::Map::new();
        if let Some(title) = &self.title {
            patch.insert("title".to_string(), serde_json::json!(title));
        }
        if let Some(content) = &self.content {
            patch.insert("content".to_string(), serde_json::json!(content));
        }
        if let Some(status) = &self.status {
            patch.insert("status".to_string(), serde_json::json!(status.as_str()));
        }
        if patch.is_empty() {
            None
        } else {
            Some(serde_json::Value::Object(patch))
        }
    }
}

// Events arrive as form submissions; start/end are passed through to the
// store as the client sent them, matching the listing contract.
#[derive(Debug, Deserialize)]
pub struct EventForm {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatForm {
    pub message: String,
}
