//! Port allocator (C2): a persistent, gap-filling assigner of port runs.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::RampError;

/// On-disk shape, post-migration: `mapping<feature, sequence<port>>`.
type AllocationMap = BTreeMap<String, Vec<u16>>;

/// Legacy on-disk shape: `mapping<feature, port>`, migrated to
/// [`AllocationMap`] on load.
type LegacyAllocationMap = BTreeMap<String, u16>;

#[derive(Deserialize)]
#[serde(untagged)]
enum OnDisk {
    Current(AllocationMap),
    Legacy(LegacyAllocationMap),
}

/// Owns the in-memory allocation map for one project; every mutation is
/// persisted to `port_allocations.json` before it's visible to the caller.
pub struct PortAllocator {
    file: PathBuf,
    base: u16,
    max: u16,
    allocations: AllocationMap,
}

impl PortAllocator {
    /// Load (or initialize empty) the allocation map for a project.
    pub fn load(project_dir: &Path, base: u16, max: u16) -> anyhow::Result<Self> {
        let file = crate::paths::port_allocations_file(project_dir);
        let allocations = load_allocations(&file)?;
        Ok(Self {
            file,
            base,
            max,
            allocations,
        })
    }

    /// `Allocate(feature, count)`.
    ///
    /// If the feature already has ports, returns them unchanged regardless
    /// of `count`. Otherwise scans `[base, base+max)` upward for the first
    /// `count` free integers (not required to be contiguous) and persists
    /// them in ascending order.
    pub fn allocate(&mut self, feature: &str, count: usize) -> anyhow::Result<Vec<u16>> {
        if let Some(existing) = self.allocations.get(feature) {
            return Ok(existing.clone());
        }

        let taken: std::collections::HashSet<u16> =
            self.allocations.values().flatten().copied().collect();

        let mut found = Vec::with_capacity(count);
        let range_end = self.base.saturating_add(self.max);
        let mut port = self.base;
        while port < range_end && found.len() < count {
            if !taken.contains(&port) {
                found.push(port);
            }
            port = port.saturating_add(1);
        }

        if found.len() < count {
            return Err(RampError::ResourceExhausted {
                requested: count,
                available: found.len(),
                range: (self.base, range_end),
            }
            .into());
        }

        self.allocations.insert(feature.to_string(), found.clone());
        self.persist()?;
        Ok(found)
    }

    /// `Release(feature)`: idempotent.
    pub fn release(&mut self, feature: &str) -> anyhow::Result<()> {
        if self.allocations.remove(feature).is_some() {
            self.persist()?;
        }
        Ok(())
    }

    /// `GetPorts(feature)`.
    pub fn get_ports(&self, feature: &str) -> Option<&[u16]> {
        self.allocations.get(feature).map(Vec::as_slice)
    }

    /// `GetPort(feature)`: first-of-sequence convenience.
    pub fn get_port(&self, feature: &str) -> Option<u16> {
        self.get_ports(feature).and_then(|p| p.first().copied())
    }

    /// `ListAllocations()`: defensive copy.
    pub fn list_allocations(&self) -> AllocationMap {
        self.allocations.clone()
    }

    fn persist(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.allocations)?;
        atomic_write(&self.file, json.as_bytes())?;
        Ok(())
    }
}

fn load_allocations(file: &Path) -> anyhow::Result<AllocationMap> {
    let contents = match std::fs::read_to_string(file) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(AllocationMap::new()),
        Err(e) => return Err(e.into()),
    };
    if contents.trim().is_empty() {
        return Ok(AllocationMap::new());
    }

    match serde_json::from_str::<OnDisk>(&contents) {
        Ok(OnDisk::Current(map)) => Ok(map),
        Ok(OnDisk::Legacy(legacy)) => {
            log::debug!("migrating legacy port_allocations.json format ({file:?})");
            let migrated: AllocationMap = legacy.into_iter().map(|(k, v)| (k, vec![v])).collect();
            let json = serde_json::to_string_pretty(&migrated)?;
            atomic_write(file, json.as_bytes())?;
            Ok(migrated)
        }
        Err(e) => Err(
            RampError::fatal_bug(format!("malformed port_allocations.json: {e}")).into(),
        ),
    }
}

/// Write via a temp file in the same directory followed by a rename, so a
/// crash mid-write never leaves a half-written JSON file behind.
pub(crate) fn atomic_write(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    use std::io::Write;
    tmp.write_all(contents)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn allocate_fills_gaps_after_release() {
        let dir = tempdir().unwrap();
        let mut alloc = PortAllocator::load(dir.path(), 3000, 10).unwrap();
        assert_eq!(alloc.allocate("a", 1).unwrap(), vec![3000]);
        assert_eq!(alloc.allocate("b", 1).unwrap(), vec![3001]);
        assert_eq!(alloc.allocate("c", 1).unwrap(), vec![3002]);
        alloc.release("b").unwrap();
        assert_eq!(alloc.allocate("d", 1).unwrap(), vec![3001]);
    }

    #[test]
    fn allocate_multi_port_scenario() {
        let dir = tempdir().unwrap();
        let mut alloc = PortAllocator::load(dir.path(), 3000, 10).unwrap();
        assert_eq!(alloc.allocate("a", 3).unwrap(), vec![3000, 3001, 3002]);
        assert_eq!(alloc.allocate("b", 1).unwrap(), vec![3003]);
        assert_eq!(alloc.allocate("c", 2).unwrap(), vec![3004, 3005]);
    }

    #[test]
    fn reallocate_existing_feature_ignores_count() {
        let dir = tempdir().unwrap();
        let mut alloc = PortAllocator::load(dir.path(), 3000, 10).unwrap();
        alloc.allocate("a", 2).unwrap();
        assert_eq!(alloc.allocate("a", 5).unwrap(), vec![3000, 3001]);
    }

    #[test]
    fn release_is_idempotent() {
        let dir = tempdir().unwrap();
        let mut alloc = PortAllocator::load(dir.path(), 3000, 10).unwrap();
        alloc.release("nonexistent").unwrap();
        alloc.allocate("a", 1).unwrap();
        alloc.release("a").unwrap();
        alloc.release("a").unwrap();
        assert!(alloc.get_ports("a").is_none());
    }

    #[test]
    fn insufficient_ports_fails_with_details() {
        let dir = tempdir().unwrap();
        let mut alloc = PortAllocator::load(dir.path(), 3000, 2).unwrap();
        alloc.allocate("a", 2).unwrap();
        let err = alloc.allocate("b", 1).unwrap_err();
        assert!(err.to_string().contains("insufficient"));
    }

    #[test]
    fn legacy_format_migrates_on_load_and_mutation() {
        let dir = tempdir().unwrap();
        let file = crate::paths::port_allocations_file(dir.path());
        std::fs::create_dir_all(file.parent().unwrap()).unwrap();
        std::fs::write(&file, r#"{"x":3000,"y":3001}"#).unwrap();

        let mut alloc = PortAllocator::load(dir.path(), 3000, 10).unwrap();
        assert_eq!(alloc.get_ports("x"), Some(&[3000][..]));
        alloc.allocate("z", 1).unwrap();

        let contents = std::fs::read_to_string(&file).unwrap();
        let parsed: AllocationMap = serde_json::from_str(&contents).unwrap();
        assert_eq!(parsed.get("x"), Some(&vec![3000]));
        assert_eq!(parsed.get("y"), Some(&vec![3001]));
        assert_eq!(parsed.get("z"), Some(&vec![3002]));

        // A subsequent load is idempotent (already in new format).
        let reloaded = PortAllocator::load(dir.path(), 3000, 10).unwrap();
        assert_eq!(reloaded.list_allocations(), alloc.list_allocations());
    }

    #[test]
    fn missing_file_yields_empty_map() {
        let dir = tempdir().unwrap();
        let alloc = PortAllocator::load(dir.path(), 3000, 10).unwrap();
        assert!(alloc.list_allocations().is_empty());
    }

    #[test]
    fn malformed_file_fails_loudly() {
        let dir = tempdir().unwrap();
        let file = crate::paths::port_allocations_file(dir.path());
        std::fs::create_dir_all(file.parent().unwrap()).unwrap();
        std::fs::write(&file, "not json at all").unwrap();
        assert!(PortAllocator::load(dir.path(), 3000, 10).is_err());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let mut alloc = PortAllocator::load(dir.path(), 3000, 10).unwrap();
        alloc.allocate("a", 2).unwrap();
        let reloaded = PortAllocator::load(dir.path(), 3000, 10).unwrap();
        assert_eq!(reloaded.list_allocations(), alloc.list_allocations());
    }
}
