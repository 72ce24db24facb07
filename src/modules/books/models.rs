use catalog_store::Record;
use serde::{Deserialize, Serialize};
use time::Date;

/// Stored book record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    /// Server-assigned identifier
    pub id: i64,
    /// Title of the book
    pub title: String,
    /// Publication date, serialized as `YYYY-MM-DD`
    pub published_date: Date,
    /// Id of the referenced author, when any
    pub author: Option<i64>,
}

impl Record for Book {
    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }
}

/// Request payload for creating or replacing a book.
///
/// `published_date` stays a raw string here so a malformed date surfaces
/// as a field-level validation error rather than a body rejection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookPayload {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub published_date: String,
    #[serde(default)]
    pub author: Option<i64>,
}
