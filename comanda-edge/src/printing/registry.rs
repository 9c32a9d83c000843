//! Printer registry
//!
//! The process-wide set of printer profiles. Built once at startup and shared
//! by `Arc`; every mutation is written through to storage when one is
//! attached. Storage is written first and under the write lock, so commits
//! land in the same order as in-memory changes and a failed commit leaves
//! memory untouched.

use parking_lot::RwLock;
use shared::ValidationError;
use shared::models::{PrinterProfile, PrinterProfileCreate, PrinterProfileUpdate, PrinterPurpose};
use thiserror::Error;
use tracing::{debug, info};

use super::storage::{ProfileStorage, ProfileStorageError};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Printer not found: {0}")]
    NotFound(String),

    #[error("Invalid printer profile: {0}")]
    Invalid(#[from] ValidationError),

    #[error("Storage error: {0}")]
    Storage(#[from] ProfileStorageError),
}

pub type RegistryResult<T> = Result<T, RegistryError>;

#[derive(Debug, Clone)]
struct Entry {
    position: u64,
    profile: PrinterProfile,
}

#[derive(Debug, Default)]
struct Inner {
    entries: Vec<Entry>,
    next_position: u64,
}

impl Inner {
    fn find_mut(&mut self, id: &str) -> Option<&mut Entry> {
        self.entries.iter_mut().find(|e| e.profile.id == id)
    }
}

/// Printer profile registry
pub struct PrinterRegistry {
    inner: RwLock<Inner>,
    storage: Option<ProfileStorage>,
}

impl PrinterRegistry {
    /// In-memory registry seeded with `profiles`, in that order
    pub fn new(profiles: Vec<PrinterProfile>) -> Self {
        let entries: Vec<Entry> = profiles
            .into_iter()
            .enumerate()
            .map(|(i, profile)| Entry {
                position: i as u64,
                profile,
            })
            .collect();
        Self {
            inner: RwLock::new(Inner {
                next_position: entries.len() as u64,
                entries,
            }),
            storage: None,
        }
    }

    /// Registry loaded from and written through to `storage`
    pub fn with_storage(storage: ProfileStorage) -> RegistryResult<Self> {
        let entries: Vec<Entry> = storage
            .load_all()?
            .into_iter()
            .map(|(position, profile)| Entry { position, profile })
            .collect();
        let next_position = entries.last().map(|e| e.position + 1).unwrap_or(0);
        info!(count = entries.len(), "Printer profiles loaded");
        Ok(Self {
            inner: RwLock::new(Inner {
                entries,
                next_position,
            }),
            storage: Some(storage),
        })
    }

    /// Snapshot of all profiles in registry order
    pub fn list(&self) -> Vec<PrinterProfile> {
        self.inner
            .read()
            .entries
            .iter()
            .map(|e| e.profile.clone())
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<PrinterProfile> {
        self.inner
            .read()
            .entries
            .iter()
            .find(|e| e.profile.id == id)
            .map(|e| e.profile.clone())
    }

    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// First connected profile for `purpose`, in registry order
    pub fn find_connected(&self, purpose: PrinterPurpose) -> Option<PrinterProfile> {
        self.inner
            .read()
            .entries
            .iter()
            .find(|e| e.profile.purpose == purpose && e.profile.is_connected)
            .map(|e| e.profile.clone())
    }

    /// Create a profile with a fresh id
    pub fn create(&self, data: PrinterProfileCreate) -> RegistryResult<PrinterProfile> {
        let mut profile = PrinterProfile::new(
            uuid::Uuid::new_v4().to_string(),
            data.name.trim(),
            data.purpose,
            data.vendor_id.trim(),
            data.product_id.trim(),
        );
        profile.device_path = data
            .device_path
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());
        profile.settings = data.settings;
        self.upsert(profile.clone())?;
        Ok(profile)
    }

    /// Insert a profile, or replace the one with the same id in place
    pub fn upsert(&self, profile: PrinterProfile) -> RegistryResult<()> {
        profile.validate()?;

        let mut inner = self.inner.write();
        match inner.find_mut(&profile.id) {
            Some(entry) => {
                self.persist(entry.position, &profile)?;
                entry.profile = profile;
                debug!(printer_id = %entry.profile.id, "Printer profile saved");
            }
            None => {
                let position = inner.next_position;
                self.persist(position, &profile)?;
                debug!(printer_id = %profile.id, "Printer profile saved");
                inner.next_position += 1;
                inner.entries.push(Entry { position, profile });
            }
        }
        Ok(())
    }

    /// Apply a partial update
    pub fn update(&self, id: &str, data: PrinterProfileUpdate) -> RegistryResult<PrinterProfile> {
        let mut profile = self
            .get(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;

        if let Some(name) = data.name {
            profile.name = name.trim().to_string();
        }
        if let Some(purpose) = data.purpose {
            profile.purpose = purpose;
        }
        if let Some(vendor_id) = data.vendor_id {
            profile.vendor_id = vendor_id.trim().to_string();
        }
        if let Some(product_id) = data.product_id {
            profile.product_id = product_id.trim().to_string();
        }
        if let Some(device_path) = data.device_path {
            let trimmed = device_path.trim();
            profile.device_path = (!trimmed.is_empty()).then(|| trimmed.to_string());
        }
        if let Some(settings) = data.settings {
            profile.settings = settings;
        }

        self.upsert(profile.clone())?;
        Ok(profile)
    }

    pub fn remove(&self, id: &str) -> RegistryResult<PrinterProfile> {
        let mut inner = self.inner.write();
        let index = inner
            .entries
            .iter()
            .position(|e| e.profile.id == id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        if let Some(storage) = &self.storage {
            storage.delete(id)?;
        }
        let removed = inner.entries.remove(index).profile;
        info!(printer_id = %id, "Printer profile removed");
        Ok(removed)
    }

    /// Count a confirmed print and remember the device path it went to
    pub fn record_print(&self, id: &str, device_path: &str, at: i64) -> RegistryResult<()> {
        self.modify(id, |profile| {
            profile.print_count += 1;
            profile.last_used_at = Some(at);
            profile.device_path = Some(device_path.to_string());
        })
        .map(|_| ())
    }

    /// Record the result of a connection test
    ///
    /// A `None` path keeps the previously stored one.
    pub fn set_connection(
        &self,
        id: &str,
        connected: bool,
        device_path: Option<&str>,
    ) -> RegistryResult<PrinterProfile> {
        self.modify(id, |profile| {
            profile.is_connected = connected;
            if let Some(path) = device_path {
                profile.device_path = Some(path.to_string());
            }
        })
    }

    fn modify<F>(&self, id: &str, f: F) -> RegistryResult<PrinterProfile>
    where
        F: FnOnce(&mut PrinterProfile),
    {
        let mut inner = self.inner.write();
        let entry = inner
            .find_mut(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        let mut profile = entry.profile.clone();
        f(&mut profile);
        self.persist(entry.position, &profile)?;
        entry.profile = profile.clone();
        Ok(profile)
    }

    fn persist(&self, position: u64, profile: &PrinterProfile) -> RegistryResult<()> {
        if let Some(storage) = &self.storage {
            storage.save(position, profile)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::PrinterSettings;

    fn profile(id: &str, purpose: PrinterPurpose, connected: bool) -> PrinterProfile {
        let mut p = PrinterProfile::new(id, id, purpose, "0x0483", "0x070b");
        p.is_connected = connected;
        p
    }

    #[test]
    fn test_find_connected_first_in_order() {
        let registry = PrinterRegistry::new(vec![
            profile("k-off", PrinterPurpose::Kitchen, false),
            profile("r1", PrinterPurpose::Reception, true),
            profile("k1", PrinterPurpose::Kitchen, true),
            profile("k2", PrinterPurpose::Kitchen, true),
        ]);
        assert_eq!(registry.find_connected(PrinterPurpose::Kitchen).unwrap().id, "k1");
        assert_eq!(registry.find_connected(PrinterPurpose::Reception).unwrap().id, "r1");

        registry.set_connection("r1", false, None).unwrap();
        assert!(registry.find_connected(PrinterPurpose::Reception).is_none());
    }

    #[test]
    fn test_create_validates_and_assigns_id() {
        let registry = PrinterRegistry::new(Vec::new());
        let created = registry
            .create(PrinterProfileCreate {
                name: " Cozinha ".to_string(),
                purpose: PrinterPurpose::Kitchen,
                vendor_id: "0x6868".to_string(),
                product_id: "0x0200".to_string(),
                device_path: Some("  ".to_string()),
                settings: PrinterSettings::default(),
            })
            .unwrap();
        assert_eq!(created.name, "Cozinha");
        assert!(created.device_path.is_none());
        assert!(!created.id.is_empty());
        assert_eq!(registry.get(&created.id), Some(created));

        let err = registry
            .create(PrinterProfileCreate {
                name: "Bar".to_string(),
                purpose: PrinterPurpose::Reception,
                vendor_id: "xyz".to_string(),
                product_id: "0x0200".to_string(),
                device_path: None,
                settings: PrinterSettings::default(),
            })
            .unwrap_err();
        assert!(matches!(err, RegistryError::Invalid(_)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_update_and_remove() {
        let registry = PrinterRegistry::new(vec![profile("k1", PrinterPurpose::Kitchen, false)]);
        let updated = registry
            .update(
                "k1",
                PrinterProfileUpdate {
                    name: Some("Cozinha 2".to_string()),
                    device_path: Some("/dev/usb/lp1".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.name, "Cozinha 2");
        assert_eq!(updated.device_path.as_deref(), Some("/dev/usb/lp1"));

        assert!(matches!(
            registry.update("nope", PrinterProfileUpdate::default()),
            Err(RegistryError::NotFound(_))
        ));

        registry.remove("k1").unwrap();
        assert!(registry.is_empty());
        assert!(matches!(registry.remove("k1"), Err(RegistryError::NotFound(_))));
    }

    #[test]
    fn test_record_print_updates_counters() {
        let registry = PrinterRegistry::new(vec![profile("k1", PrinterPurpose::Kitchen, true)]);
        registry.record_print("k1", "/dev/usb/lp1", 1_000).unwrap();
        registry.record_print("k1", "/dev/usb/lp1", 2_000).unwrap();

        let p = registry.get("k1").unwrap();
        assert_eq!(p.print_count, 2);
        assert_eq!(p.last_used_at, Some(2_000));
        assert_eq!(p.device_path.as_deref(), Some("/dev/usb/lp1"));
        assert!(matches!(
            registry.record_print("x", "/dev/usb/lp0", 0),
            Err(RegistryError::NotFound(_))
        ));
    }

    #[test]
    fn test_storage_write_through_keeps_order() {
        let storage = ProfileStorage::open_in_memory().unwrap();
        {
            let registry = PrinterRegistry::with_storage(storage.clone()).unwrap();
            registry.upsert(profile("z", PrinterPurpose::Kitchen, true)).unwrap();
            registry.upsert(profile("a", PrinterPurpose::Kitchen, true)).unwrap();
            registry.upsert(profile("m", PrinterPurpose::Reception, true)).unwrap();
            registry.remove("a").unwrap();
            registry.record_print("z", "/dev/usb/lp1", 5).unwrap();
        }

        let registry = PrinterRegistry::with_storage(storage).unwrap();
        let ids: Vec<_> = registry.list().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["z", "m"]);
        assert_eq!(registry.get("z").unwrap().print_count, 1);

        registry.upsert(profile("b", PrinterPurpose::Kitchen, false)).unwrap();
        let ids: Vec<_> = registry.list().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["z", "m", "b"]);
    }

    #[test]
    fn test_concurrent_record_print_persists_every_count() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("printers.redb");

        {
            let registry =
                PrinterRegistry::with_storage(ProfileStorage::open(&db).unwrap()).unwrap();
            registry.upsert(profile("k1", PrinterPurpose::Kitchen, true)).unwrap();

            std::thread::scope(|scope| {
                for t in 0..8i64 {
                    let registry = &registry;
                    scope.spawn(move || {
                        for i in 0..25 {
                            registry.record_print("k1", "/dev/usb/lp1", t * 100 + i).unwrap();
                        }
                    });
                }
            });
            assert_eq!(registry.get("k1").unwrap().print_count, 200);
        }

        let reopened = PrinterRegistry::with_storage(ProfileStorage::open(&db).unwrap()).unwrap();
        assert_eq!(reopened.get("k1").unwrap().print_count, 200);
    }
}
