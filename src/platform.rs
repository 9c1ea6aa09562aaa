//! Host detection.
//!
//! Determines whether translation happens under rootless execution and, if
//! so, how many group IDs the calling process has mapped. Both facts shape
//! the mounts a runtime can actually perform.

use crate::config::TranslatorConfig;
use crate::constants::USERNS_CONFIGURED_ENV;
use crate::error::{Error, Result};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Detected host facts relevant to spec translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Host {
    /// Running without root privileges on the host.
    pub rootless: bool,
    /// Total GIDs mapped into the calling process's user namespace.
    ///
    /// Only probed under rootless execution; `None` otherwise.
    pub available_gids: Option<u64>,
}

/// One line of a `/proc/<pid>/{uid,gid}_map` file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdMapRange {
    pub container_id: u64,
    pub host_id: u64,
    pub count: u64,
}

impl Host {
    /// Creates a host description without probing.
    pub fn new(rootless: bool, available_gids: Option<u64>) -> Self {
        Self {
            rootless,
            available_gids,
        }
    }

    /// Detects the current host.
    ///
    /// Fails if rootless and the GID map cannot be read or parsed.
    pub fn detect(config: &TranslatorConfig) -> Result<Self> {
        let rootless = config.rootless.unwrap_or_else(Self::detect_rootless);
        let available_gids = if rootless {
            Some(available_ids(&config.gid_map_path)?)
        } else {
            None
        };

        debug!(rootless, ?available_gids, "Detected host");
        Ok(Self {
            rootless,
            available_gids,
        })
    }

    /// Detects rootless execution.
    fn detect_rootless() -> bool {
        if std::env::var_os(USERNS_CONFIGURED_ENV).is_some() {
            return true;
        }

        #[cfg(unix)]
        {
            // SAFETY: geteuid has no preconditions and cannot fail.
            unsafe { libc::geteuid() != 0 }
        }

        #[cfg(not(unix))]
        false
    }
}

/// Parses ID map content (`container-start host-start count` per line).
pub fn parse_id_map(path: &Path, content: &str) -> Result<Vec<IdMapRange>> {
    let mut ranges = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }

        let malformed = |reason: String| Error::IdMapMalformed {
            path: path.to_path_buf(),
            line: idx + 1,
            reason,
        };

        if fields.len() != 3 {
            return Err(malformed(format!("expected 3 fields, found {}", fields.len())));
        }

        let mut values = [0u64; 3];
        for (value, field) in values.iter_mut().zip(&fields) {
            *value = field
                .parse()
                .map_err(|_| malformed(format!("'{}' is not an unsigned integer", field)))?;
        }

        ranges.push(IdMapRange {
            container_id: values[0],
            host_id: values[1],
            count: values[2],
        });
    }

    Ok(ranges)
}

/// Reads an ID map file.
pub fn read_id_map(path: &Path) -> Result<Vec<IdMapRange>> {
    let content = fs::read_to_string(path).map_err(|e| Error::IdMapUnreadable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    parse_id_map(path, &content)
}

/// Returns the total number of IDs mapped by the file at `path`.
pub fn available_ids(path: &Path) -> Result<u64> {
    let ranges = read_id_map(path)?;
    Ok(ranges.iter().map(|r| r.count).sum())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_id_map_sums_ranges() {
        let content = "         0       1000          1\n         1     100000      65536\n";
        let ranges = parse_id_map(Path::new("gid_map"), content).unwrap();
        assert_eq!(ranges.len(), 2);
        assert_eq!(ranges[1].host_id, 100000);
        assert_eq!(ranges.iter().map(|r| r.count).sum::<u64>(), 65537);
    }

    #[test]
    fn test_parse_id_map_rejects_garbage() {
        let err = parse_id_map(Path::new("gid_map"), "0 0 1\n0 zero 1\n").unwrap_err();
        match err {
            Error::IdMapMalformed { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_detect_with_override_reads_map() {
        let temp = TempDir::new().unwrap();
        let map = temp.path().join("gid_map");
        fs::write(&map, "0 1000 1\n").unwrap();

        let config = TranslatorConfig {
            gid_map_path: map,
            rootless: Some(true),
            ..Default::default()
        };
        let host = Host::detect(&config).unwrap();
        assert!(host.rootless);
        assert_eq!(host.available_gids, Some(1));
    }

    #[test]
    fn test_detect_rooted_skips_map() {
        let config = TranslatorConfig {
            gid_map_path: "/nonexistent/gid_map".into(),
            rootless: Some(false),
            ..Default::default()
        };
        let host = Host::detect(&config).unwrap();
        assert_eq!(host, Host::new(false, None));
    }
}
