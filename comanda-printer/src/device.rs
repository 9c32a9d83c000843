//! USB line printer device resolution
//!
//! Linux exposes USB printers as character devices (`/dev/usb/lpN` with the
//! usblp driver, `/dev/lpN` for parallel/legacy). Which index a printer gets
//! depends on enumeration order, so resolution prefers a path the operator
//! already confirmed and only falls back to probing.

use parking_lot::RwLock;
use std::collections::HashSet;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Probe order when no path is configured
pub const DEFAULT_DEVICE_CANDIDATES: [&str; 8] = [
    "/dev/usb/lp0",
    "/dev/usb/lp1",
    "/dev/usb/lp2",
    "/dev/usb/lp3",
    "/dev/lp0",
    "/dev/lp1",
    "/dev/lp2",
    "/dev/lp3",
];

/// Role of the printer being resolved, used to break ties
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceRole {
    /// Primary kitchen printer
    Kitchen,
    /// Primary reception (cashier) printer
    Reception,
    Other,
}

impl DeviceRole {
    /// Path this role usually lands on when two printers are plugged in
    pub fn preferred_path(&self) -> Option<&'static Path> {
        match self {
            DeviceRole::Kitchen => Some(Path::new("/dev/usb/lp1")),
            DeviceRole::Reception => Some(Path::new("/dev/usb/lp0")),
            DeviceRole::Other => None,
        }
    }
}

/// Source of truth for which device nodes exist
pub trait DeviceProbe {
    /// The node exists
    fn exists(&self, path: &Path) -> bool;

    /// The node can be opened for writing right now (permissions, not busy)
    fn can_open(&self, path: &Path) -> bool;
}

impl<P: DeviceProbe + ?Sized> DeviceProbe for Arc<P> {
    fn exists(&self, path: &Path) -> bool {
        (**self).exists(path)
    }

    fn can_open(&self, path: &Path) -> bool {
        (**self).can_open(path)
    }
}

/// Filesystem probe
#[derive(Debug, Clone, Copy, Default)]
pub struct FsProbe;

impl DeviceProbe for FsProbe {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn can_open(&self, path: &Path) -> bool {
        // Never create: a stray regular file under /dev would shadow the printer.
        OpenOptions::new().append(true).open(path).is_ok()
    }
}

/// In-memory probe with a mutable device list
#[derive(Debug, Default)]
pub struct MemoryProbe {
    present: RwLock<Vec<PathBuf>>,
    locked: RwLock<HashSet<PathBuf>>,
}

impl MemoryProbe {
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            present: RwLock::new(paths.into_iter().map(Into::into).collect()),
            locked: RwLock::new(HashSet::new()),
        }
    }

    /// Simulate plugging a printer in
    pub fn plug(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        let mut present = self.present.write();
        if !present.contains(&path) {
            present.push(path);
        }
    }

    /// Simulate unplugging a printer
    pub fn unplug(&self, path: impl AsRef<Path>) {
        self.present.write().retain(|p| p != path.as_ref());
    }

    /// Make an existing node fail the open test (e.g. permission denied)
    pub fn deny_open(&self, path: impl Into<PathBuf>) {
        self.locked.write().insert(path.into());
    }
}

impl DeviceProbe for MemoryProbe {
    fn exists(&self, path: &Path) -> bool {
        self.present.read().iter().any(|p| p == path)
    }

    fn can_open(&self, path: &Path) -> bool {
        self.exists(path) && !self.locked.read().contains(path)
    }
}

/// Maps a printer to a writable device path
///
/// Does not check that the node belongs to the printer's vendor/product id.
#[derive(Debug, Clone)]
pub struct DeviceResolver<P> {
    probe: P,
    candidates: Vec<PathBuf>,
    role_heuristic: bool,
}

impl<P: DeviceProbe> DeviceResolver<P> {
    /// Resolver over the default candidate list with the role heuristic on
    pub fn new(probe: P) -> Self {
        Self {
            probe,
            candidates: DEFAULT_DEVICE_CANDIDATES.iter().map(PathBuf::from).collect(),
            role_heuristic: true,
        }
    }

    /// Replace the candidate list (empty keeps the default)
    pub fn with_candidates(mut self, candidates: Vec<PathBuf>) -> Self {
        if !candidates.is_empty() {
            self.candidates = candidates;
        }
        self
    }

    /// Enable or disable the kitchen=lp1 / reception=lp0 tie-break
    pub fn with_role_heuristic(mut self, enabled: bool) -> Self {
        self.role_heuristic = enabled;
        self
    }

    pub fn candidates(&self) -> &[PathBuf] {
        &self.candidates
    }

    pub fn probe(&self) -> &P {
        &self.probe
    }

    /// Candidates that currently exist, in probe order
    pub fn available_paths(&self) -> Vec<PathBuf> {
        self.candidates
            .iter()
            .filter(|p| self.probe.exists(p))
            .cloned()
            .collect()
    }

    /// Resolve the device path for a printer
    ///
    /// 1. `configured` is reused when it still exists.
    /// 2. Otherwise the first existing candidate wins, except that with
    ///    several candidates present the role's preferred path is taken.
    ///
    /// Returns `None` when nothing exists; callers must not write.
    #[instrument(skip(self), fields(candidates = self.candidates.len()))]
    pub fn resolve(&self, configured: Option<&Path>, role: DeviceRole) -> Option<PathBuf> {
        if let Some(path) = configured {
            if self.probe.exists(path) {
                debug!(path = %path.display(), "Reusing configured device path");
                return Some(path.to_path_buf());
            }
            warn!(path = %path.display(), "Configured device path missing, probing candidates");
        }

        let available = self.available_paths();
        let chosen = match available.len() {
            0 => None,
            1 => available.into_iter().next(),
            _ => {
                let preferred = role
                    .preferred_path()
                    .filter(|_| self.role_heuristic)
                    .and_then(|pref| available.iter().find(|p| p.as_path() == pref).cloned());
                preferred.or_else(|| available.into_iter().next())
            }
        };

        match &chosen {
            Some(path) => debug!(path = %path.display(), ?role, "Resolved device path"),
            None => warn!(?role, "No printer device path found"),
        }
        chosen
    }
}
