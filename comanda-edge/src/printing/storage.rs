//! redb-based storage for printer profiles

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use shared::models::PrinterProfile;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Printer profiles table: key = profile id, value = JSON
const PROFILES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("printer_profiles");

#[derive(Debug, Error)]
pub enum ProfileStorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Directory error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ProfileStorageResult<T> = Result<T, ProfileStorageError>;

/// Stored value; `position` keeps registry order across restarts
#[derive(Debug, Serialize, Deserialize)]
struct StoredProfile {
    position: u64,
    profile: PrinterProfile,
}

/// Printer profile storage
#[derive(Clone)]
pub struct ProfileStorage {
    db: Arc<Database>,
}

impl ProfileStorage {
    /// Open or create database, creating the parent directory if needed
    pub fn open(path: impl AsRef<Path>) -> ProfileStorageResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> ProfileStorageResult<Self> {
        let db =
            Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> ProfileStorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(PROFILES_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Insert or replace a profile
    pub fn save(&self, position: u64, profile: &PrinterProfile) -> ProfileStorageResult<()> {
        let value = serde_json::to_vec(&StoredProfile {
            position,
            profile: profile.clone(),
        })?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(PROFILES_TABLE)?;
            table.insert(profile.id.as_str(), value.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Delete a profile, returns whether it existed
    pub fn delete(&self, id: &str) -> ProfileStorageResult<bool> {
        let write_txn = self.db.begin_write()?;
        let existed = {
            let mut table = write_txn.open_table(PROFILES_TABLE)?;
            table.remove(id)?.is_some()
        };
        write_txn.commit()?;
        Ok(existed)
    }

    #[cfg(test)]
    pub fn get(&self, id: &str) -> ProfileStorageResult<Option<PrinterProfile>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PROFILES_TABLE)?;

        match table.get(id)? {
            Some(guard) => {
                let stored: StoredProfile = serde_json::from_slice(guard.value())?;
                Ok(Some(stored.profile))
            }
            None => Ok(None),
        }
    }

    /// All profiles with their positions, in position order
    pub fn load_all(&self) -> ProfileStorageResult<Vec<(u64, PrinterProfile)>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PROFILES_TABLE)?;

        let mut profiles = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let stored: StoredProfile = serde_json::from_slice(value.value())?;
            profiles.push((stored.position, stored.profile));
        }
        profiles.sort_by_key(|(position, _)| *position);
        Ok(profiles)
    }

    #[cfg(test)]
    pub fn count(&self) -> ProfileStorageResult<u64> {
        use redb::ReadableTableMetadata;

        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PROFILES_TABLE)?;
        Ok(table.len()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::PrinterPurpose;

    fn profile(id: &str, purpose: PrinterPurpose) -> PrinterProfile {
        PrinterProfile::new(id, format!("Printer {}", id), purpose, "0x0483", "0x070b")
    }

    #[test]
    fn test_save_and_get() {
        let storage = ProfileStorage::open_in_memory().unwrap();
        let mut p = profile("k1", PrinterPurpose::Kitchen);
        p.device_path = Some("/dev/usb/lp1".to_string());
        storage.save(0, &p).unwrap();

        let loaded = storage.get("k1").unwrap().unwrap();
        assert_eq!(loaded, p);
        assert!(storage.get("missing").unwrap().is_none());
    }

    #[test]
    fn test_load_all_in_position_order() {
        let storage = ProfileStorage::open_in_memory().unwrap();
        // ids sort the other way round
        storage.save(0, &profile("z-reception", PrinterPurpose::Reception)).unwrap();
        storage.save(1, &profile("a-kitchen", PrinterPurpose::Kitchen)).unwrap();

        let ids: Vec<_> = storage
            .load_all()
            .unwrap()
            .into_iter()
            .map(|(_, p)| p.id)
            .collect();
        assert_eq!(ids, vec!["z-reception", "a-kitchen"]);
        assert_eq!(storage.count().unwrap(), 2);
    }

    #[test]
    fn test_save_replaces_and_delete() {
        let storage = ProfileStorage::open_in_memory().unwrap();
        let mut p = profile("k1", PrinterPurpose::Kitchen);
        storage.save(0, &p).unwrap();
        p.print_count = 3;
        storage.save(0, &p).unwrap();

        assert_eq!(storage.count().unwrap(), 1);
        assert_eq!(storage.get("k1").unwrap().unwrap().print_count, 3);

        assert!(storage.delete("k1").unwrap());
        assert!(!storage.delete("k1").unwrap());
        assert_eq!(storage.count().unwrap(), 0);
    }

    #[test]
    fn test_reopen_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("printers.redb");
        {
            let storage = ProfileStorage::open(&path).unwrap();
            storage.save(0, &profile("r1", PrinterPurpose::Reception)).unwrap();
        }
        let storage = ProfileStorage::open(&path).unwrap();
        assert_eq!(storage.load_all().unwrap().len(), 1);
    }
}
