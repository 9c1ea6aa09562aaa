//! Mount planning, merging and normalization.
//!
//! ```text
//!  ExecutionContext ──► plan::plan_mounts ──► MountPlan::apply ──┐
//!                                                                ▼
//!  user mounts ───────► merge::supersede_user_mounts ◄── SpecGenerator mounts
//!                                  │
//!                                  ▼
//!                       options::init_fs_mounts ──► config.json mounts
//! ```
//!
//! Mounts are kept in a [`MountTable`] keyed by cleaned destination, so at
//! most one entry exists per destination at every stage.

pub mod merge;
pub mod options;
pub mod plan;

pub use merge::supersede_user_mounts;
pub use options::{init_fs_mounts, process_options};
pub use plan::{MountPlan, plan_mounts};

use crate::oci::OciMount;
use std::collections::HashMap;

/// Mounts keyed by destination, in first-insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MountTable {
    entries: Vec<OciMount>,
    index: HashMap<String, usize>,
}

impl MountTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a mount, replacing any entry at the same destination in place.
    ///
    /// Returns the replaced entry.
    pub fn insert(&mut self, mount: OciMount) -> Option<OciMount> {
        let key = clean_path(&mount.destination);
        match self.index.get(&key) {
            Some(&pos) => Some(std::mem::replace(&mut self.entries[pos], mount)),
            None => {
                self.index.insert(key, self.entries.len());
                self.entries.push(mount);
                None
            }
        }
    }

    /// Removes the mount at `destination`.
    pub fn remove(&mut self, destination: &str) -> Option<OciMount> {
        let pos = self.index.remove(&clean_path(destination))?;
        let removed = self.entries.remove(pos);
        for idx in self.index.values_mut() {
            if *idx > pos {
                *idx -= 1;
            }
        }
        Some(removed)
    }

    pub fn get(&self, destination: &str) -> Option<&OciMount> {
        self.index
            .get(&clean_path(destination))
            .map(|&pos| &self.entries[pos])
    }

    pub fn contains(&self, destination: &str) -> bool {
        self.index.contains_key(&clean_path(destination))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, OciMount> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, OciMount> {
        self.entries.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_vec(self) -> Vec<OciMount> {
        self.entries
    }

    /// Orders mounts so every parent directory is mounted before its
    /// children. Entries at equal depth keep their relative order.
    pub fn sort_by_depth(&mut self) {
        self.entries.sort_by_key(|m| path_depth(&m.destination));
        self.index = self
            .entries
            .iter()
            .enumerate()
            .map(|(pos, m)| (clean_path(&m.destination), pos))
            .collect();
    }
}

impl FromIterator<OciMount> for MountTable {
    /// Later mounts win over earlier ones at the same destination.
    fn from_iter<I: IntoIterator<Item = OciMount>>(iter: I) -> Self {
        let mut table = Self::new();
        for mount in iter {
            table.insert(mount);
        }
        table
    }
}

impl Extend<OciMount> for MountTable {
    fn extend<I: IntoIterator<Item = OciMount>>(&mut self, iter: I) {
        for mount in iter {
            self.insert(mount);
        }
    }
}

/// Number of components in the cleaned path; `/` has depth zero.
pub fn path_depth(path: &str) -> usize {
    clean_path(path).split('/').filter(|s| !s.is_empty()).count()
}

/// Lexically cleans an absolute or relative path.
///
/// Collapses repeated separators, drops `.` segments, resolves `..` against
/// preceding segments and strips trailing separators.
pub fn clean_path(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|p| *p != "..") {
                    parts.pop();
                } else if !absolute {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    match (absolute, joined.is_empty()) {
        (true, _) => format!("/{}", joined),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tmpfs(dest: &str) -> OciMount {
        OciMount::new(dest, "tmpfs", "tmpfs", &[])
    }

    #[test]
    fn test_clean_path() {
        assert_eq!(clean_path("/dev//shm/"), "/dev/shm");
        assert_eq!(clean_path("/a/./b/../c"), "/a/c");
        assert_eq!(clean_path("/../x"), "/x");
        assert_eq!(clean_path("a/../../b"), "../b");
        assert_eq!(clean_path(""), ".");
        assert_eq!(clean_path("/"), "/");
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut table = MountTable::new();
        table.insert(tmpfs("/a"));
        table.insert(tmpfs("/b"));
        let replaced = table.insert(OciMount::new("/a/", "bind", "/src", &["rbind"]));

        assert!(replaced.is_some());
        assert_eq!(table.len(), 2);
        let first = table.iter().next().unwrap();
        assert_eq!(first.mount_type, "bind");
    }

    #[test]
    fn test_remove_keeps_index_consistent() {
        let mut table: MountTable = ["/a", "/b", "/c"].into_iter().map(tmpfs).collect();
        assert!(table.remove("/a").is_some());
        assert!(table.remove("/a").is_none());

        assert_eq!(table.get("/c").unwrap().destination, "/c");
        table.insert(OciMount::new("/c", "bind", "/x", &[]));
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("/c").unwrap().source, "/x");
    }

    #[test]
    fn test_sort_by_depth_puts_parents_first() {
        let mut table: MountTable = ["/dev/shm", "/sys/fs/cgroup", "/proc", "/dev", "/sys"]
            .into_iter()
            .map(tmpfs)
            .collect();
        table.sort_by_depth();

        let order: Vec<&str> = table.iter().map(|m| m.destination.as_str()).collect();
        assert_eq!(order, ["/proc", "/dev", "/sys", "/dev/shm", "/sys/fs/cgroup"]);
        assert_eq!(table.get("/dev/shm").unwrap().destination, "/dev/shm");
    }
}
