//! In-memory record store for the catalog API.
//!
//! Each entity type gets one [`Table`], keyed by a server-assigned
//! sequential integer id. Reads and writes go through a `tokio` RwLock,
//! so concurrent requests serialize at the table level.

use std::collections::BTreeMap;

use tokio::sync::RwLock;

/// A row type storable in a [`Table`].
///
/// Implementors carry their own id field; the table assigns it on insert
/// and keeps it consistent on update.
pub trait Record: Clone + Send + Sync {
    fn id(&self) -> i64;
    fn set_id(&mut self, id: i64);
}

/// One entity table: ordered rows plus the id counter.
pub struct Table<T> {
    inner: RwLock<Inner<T>>,
}

struct Inner<T> {
    rows: BTreeMap<i64, T>,
    next_id: i64,
}

impl<T: Record> Table<T> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                rows: BTreeMap::new(),
                next_id: 1,
            }),
        }
    }

    /// All rows in id order.
    pub async fn list(&self) -> Vec<T> {
        let inner = self.inner.read().await;
        inner.rows.values().cloned().collect()
    }

    /// Rows matching the predicate, in id order.
    pub async fn filter<F>(&self, pred: F) -> Vec<T>
    where
        F: Fn(&T) -> bool,
    {
        let inner = self.inner.read().await;
        inner.rows.values().filter(|row| pred(row)).cloned().collect()
    }

    /// First row matching the predicate, if any.
    pub async fn find<F>(&self, pred: F) -> Option<T>
    where
        F: Fn(&T) -> bool,
    {
        let inner = self.inner.read().await;
        inner.rows.values().find(|row| pred(row)).cloned()
    }

    pub async fn get(&self, id: i64) -> Option<T> {
        let inner = self.inner.read().await;
        inner.rows.get(&id).cloned()
    }

    pub async fn contains(&self, id: i64) -> bool {
        let inner = self.inner.read().await;
        inner.rows.contains_key(&id)
    }

    /// Insert a new row, assigning the next id. Returns the stored row.
    pub async fn insert(&self, mut row: T) -> T {
        let mut inner = self.inner.write().await;
        let id = inner.next_id;
        inner.next_id += 1;
        row.set_id(id);
        inner.rows.insert(id, row.clone());
        tracing::debug!(id, "row inserted");
        row
    }

    /// Overwrite the row at `id`. Returns the stored row, or `None`
    /// when no row exists at that id (nothing is created in that case).
    pub async fn update(&self, id: i64, mut row: T) -> Option<T> {
        let mut inner = self.inner.write().await;
        if !inner.rows.contains_key(&id) {
            return None;
        }
        row.set_id(id);
        inner.rows.insert(id, row.clone());
        tracing::debug!(id, "row updated");
        Some(row)
    }

    /// Remove the row at `id`. Returns whether a row was present.
    pub async fn remove(&self, id: i64) -> bool {
        let mut inner = self.inner.write().await;
        let removed = inner.rows.remove(&id).is_some();
        if removed {
            tracing::debug!(id, "row removed");
        }
        removed
    }
}

impl<T: Record> Default for Table<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Note {
        id: i64,
        body: String,
    }

    impl Record for Note {
        fn id(&self) -> i64 {
            self.id
        }

        fn set_id(&mut self, id: i64) {
            self.id = id;
        }
    }

    fn note(body: &str) -> Note {
        Note {
            id: 0,
            body: body.to_string(),
        }
    }

    #[tokio::test]
    async fn insert_assigns_sequential_ids() {
        let table = Table::new();
        let first = table.insert(note("one")).await;
        let second = table.insert(note("two")).await;

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
    }

    #[tokio::test]
    async fn list_returns_rows_in_id_order() {
        let table = Table::new();
        table.insert(note("a")).await;
        table.insert(note("b")).await;
        table.insert(note("c")).await;

        let ids: Vec<i64> = table.list().await.into_iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn get_after_remove_is_none() {
        let table = Table::new();
        let stored = table.insert(note("gone soon")).await;

        assert!(table.remove(stored.id).await);
        assert_eq!(table.get(stored.id).await, None);
        assert!(!table.remove(stored.id).await);
    }

    #[tokio::test]
    async fn update_missing_id_creates_nothing() {
        let table = Table::new();
        assert_eq!(table.update(42, note("phantom")).await, None);
        assert!(table.list().await.is_empty());
    }

    #[tokio::test]
    async fn update_overwrites_in_place() {
        let table = Table::new();
        let stored = table.insert(note("draft")).await;

        let updated = table.update(stored.id, note("final")).await.unwrap();
        assert_eq!(updated.id, stored.id);
        assert_eq!(table.get(stored.id).await.unwrap().body, "final");
        assert_eq!(table.list().await.len(), 1);
    }

    #[tokio::test]
    async fn filter_matches_subset() {
        let table = Table::new();
        table.insert(note("rust in action")).await;
        table.insert(note("the c book")).await;
        table.insert(note("rustonomicon")).await;

        let matches = table.filter(|n| n.body.contains("rust")).await;
        assert_eq!(matches.len(), 2);
    }
}
