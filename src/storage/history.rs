use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::info;

use crate::error::Result;
use crate::storage::kv::KeyValueStore;
use crate::storage::tokens::TokenStore;
use crate::transfer::TransferRecord;

pub const TRANSFERS_KEY: &str = "transfers";

/// Append-only list of finished transfers.
#[derive(Clone)]
pub struct TransferHistory {
    store: Arc<dyn KeyValueStore>,
}

impl TransferHistory {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn append(&self, record: TransferRecord) -> Result<()> {
        let mut records = self.list()?;
        info!(
            "Saving transfer of {} ({}/{} matched)",
            record.playlist_name, record.tracks_matched, record.tracks_total
        );
        records.push(record);
        self.store
            .set(TRANSFERS_KEY, serde_json::to_value(&records)?)
    }

    /// Append with the timestamp set to now.
    pub fn save(&self, mut record: TransferRecord) -> Result<()> {
        record.timestamp = Utc::now();
        self.append(record)
    }

    /// All records in insertion order.
    pub fn list(&self) -> Result<Vec<TransferRecord>> {
        match self.store.get(TRANSFERS_KEY)? {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(value) => Ok(serde_json::from_value(value)?),
        }
    }

    /// The last `n` records, newest first.
    pub fn recent(&self, n: usize) -> Result<Vec<TransferRecord>> {
        let records = self.list()?;
        let start = records.len().saturating_sub(n);
        Ok(records[start..].iter().rev().cloned().collect())
    }

    /// Wipe history and every cached token.
    pub fn clear(&self) -> Result<()> {
        self.store
            .set(TRANSFERS_KEY, Value::Array(Vec::new()))?;
        TokenStore::new(self.store.clone()).clear()?;
        info!("Cleared transfer history and cached tokens");
        Ok(())
    }
}

/// Seed an empty store the way a first run expects it.
pub fn initialize(store: &dyn KeyValueStore) -> Result<()> {
    if store.get(TRANSFERS_KEY)?.is_none() {
        store.set(TRANSFERS_KEY, Value::Array(Vec::new()))?;
    }
    for key in [
        crate::storage::tokens::SPOTIFY_TOKEN_KEY,
        crate::storage::tokens::YOUTUBE_TOKEN_KEY,
    ] {
        if store.get(key)?.is_none() {
            store.set(key, Value::Null)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AccessToken;
    use crate::storage::kv::{FileStore, MemoryStore};

    fn record(name: &str, matched: usize, total: usize) -> TransferRecord {
        TransferRecord::new(name.to_string(), matched, total)
    }

    #[test]
    fn test_list_preserves_insertion_order() {
        let history = TransferHistory::new(Arc::new(MemoryStore::new()));
        assert!(history.list().unwrap().is_empty());

        history.append(record("First", 1, 1)).unwrap();
        history.append(record("Second", 0, 2)).unwrap();
        history.append(record("Third", 3, 3)).unwrap();

        let names: Vec<_> = history
            .list()
            .unwrap()
            .into_iter()
            .map(|r| r.playlist_name)
            .collect();
        assert_eq!(names, vec!["First", "Second", "Third"]);
    }

    #[test]
    fn test_recent_is_newest_first() {
        let history = TransferHistory::new(Arc::new(MemoryStore::new()));
        for i in 0..7 {
            history.append(record(&format!("P{}", i), i, 7)).unwrap();
        }

        let names: Vec<_> = history
            .recent(5)
            .unwrap()
            .into_iter()
            .map(|r| r.playlist_name)
            .collect();
        assert_eq!(names, vec!["P6", "P5", "P4", "P3", "P2"]);
        assert_eq!(history.recent(50).unwrap().len(), 7);
    }

    #[test]
    fn test_clear_empties_history_and_tokens() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let history = TransferHistory::new(store.clone());
        let tokens = TokenStore::new(store.clone());

        tokens
            .save_spotify(AccessToken {
                access_token: "a".to_string(),
                expires_in: 3600,
                token_type: "Bearer".to_string(),
                refresh_token: Some("r".to_string()),
            })
            .unwrap();
        tokens.mark_youtube_signed_in().unwrap();
        history.append(record("Gone", 1, 1)).unwrap();

        history.clear().unwrap();

        assert!(history.list().unwrap().is_empty());
        assert!(tokens.spotify().unwrap().is_none());
        assert!(!tokens.youtube_signed_in().unwrap());
    }

    #[test]
    fn test_initialize_seeds_without_overwriting() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("store.json")).unwrap();

        initialize(&store).unwrap();
        assert_eq!(store.get(TRANSFERS_KEY).unwrap(), Some(Value::Array(vec![])));
        assert_eq!(
            store.get(crate::storage::tokens::SPOTIFY_TOKEN_KEY).unwrap(),
            Some(Value::Null)
        );

        let store: Arc<dyn KeyValueStore> = Arc::new(store);
        let history = TransferHistory::new(store.clone());
        history.append(record("Kept", 1, 1)).unwrap();

        initialize(store.as_ref()).unwrap();
        assert_eq!(history.list().unwrap().len(), 1);
    }
}
