use serde::{Deserialize, Serialize};

/// A post as submitted by the content owner. Vote counters are not part of
/// it: they start at zero and only the vote engine moves them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedPost {
    pub id: uuid::Uuid,
    pub title: String,
    pub body: String,
    pub author_id: Option<uuid::Uuid>,
}

impl PersistedPost {
    pub fn new(title: String, body: String, author_id: Option<uuid::Uuid>) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            title,
            body,
            author_id,
        }
    }
}
