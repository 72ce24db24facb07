use catalog_store::Record;
use serde::{Deserialize, Serialize};

/// Stored author record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Author {
    /// Server-assigned identifier
    pub id: i64,
    /// Author's display name
    pub name: String,
    /// Contact email, unique across authors
    pub email: String,
}

impl Record for Author {
    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }
}

/// Request payload for creating or replacing an author.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorPayload {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}
