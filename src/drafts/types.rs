use serde::{Deserialize, Serialize};

const DRAFT_KEY_PREFIX: &str = "draft_";

/// An unsaved edit buffer kept locally for one document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    pub document: String,
    pub content: String,
    pub updated_at: i64,
}

impl Draft {
    /// Worth offering back to the user instead of `loaded`
    pub fn should_offer(&self, loaded: &str) -> bool {
        !self.content.trim().is_empty() && self.content != loaded
    }
}

/// Storage key for a document's draft
pub fn draft_key(document: &str) -> String {
    format!("{}{}", DRAFT_KEY_PREFIX, document)
}
