//! User-facing container specification.
//!
//! [`ContainerSpec`] is the abstract description a front end fills in:
//! what to run, which limits apply, how namespaces are shared and which
//! host resources are exposed. It is read-only input to
//! [`crate::translate::Translator`].
//!
//! # Format
//!
//! The type derives `serde` traits so front ends can hand it over as JSON:
//!
//! ```json
//! {
//!   "work_dir": "/srv",
//!   "command": ["/bin/server"],
//!   "user_ns": { "nsmode": "private" },
//!   "net_ns": { "nsmode": "host" },
//!   "rlimits": [{ "type": "nofile", "soft": 4096, "hard": 4096 }]
//! }
//! ```

use crate::error::{Error, Result};
use crate::oci::{OciMount, OciResources};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

// =============================================================================
// Namespace Modes
// =============================================================================

/// How a container obtains one of its namespaces.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "nsmode", content = "value", rename_all = "lowercase")]
pub enum NamespaceMode {
    /// Share the host's namespace.
    Host,
    /// Create a fresh namespace.
    #[default]
    Private,
    /// Join the namespace of another container, by id.
    Container(String),
    /// Join the namespace at a filesystem path (`/proc/<pid>/ns/...`).
    Path(String),
}

impl NamespaceMode {
    pub fn is_host(&self) -> bool {
        matches!(self, Self::Host)
    }

    pub fn is_private(&self) -> bool {
        matches!(self, Self::Private)
    }

    pub fn is_container(&self) -> bool {
        matches!(self, Self::Container(_))
    }

    pub fn is_path(&self) -> bool {
        matches!(self, Self::Path(_))
    }
}

// =============================================================================
// Declared Resources
// =============================================================================

/// A POSIX rlimit as declared by the user (`nofile`, `nproc`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RlimitSpec {
    /// Symbolic name, without the `RLIMIT_` prefix and in any case.
    #[serde(rename = "type")]
    pub kind: String,
    pub soft: u64,
    pub hard: u64,
}

impl RlimitSpec {
    pub fn new(kind: &str, soft: u64, hard: u64) -> Self {
        Self {
            kind: kind.to_string(),
            soft,
            hard,
        }
    }
}

/// A host device to expose, in `src[:dst][:perms]` form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSpec {
    pub path: String,
}

impl DeviceSpec {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
        }
    }
}

/// A contiguous ID range mapped into a user namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdMap {
    pub container_id: u32,
    pub host_id: u32,
    pub size: u32,
}

impl IdMap {
    pub fn new(container_id: u32, host_id: u32, size: u32) -> Self {
        Self {
            container_id,
            host_id,
            size,
        }
    }

    /// Returns true if `id` (as seen inside the container) falls in this range.
    pub fn covers(&self, id: u32) -> bool {
        self.container_id <= id && u64::from(id) < u64::from(self.container_id) + u64::from(self.size)
    }
}

/// UID and GID mappings for the container's user namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdMappings {
    #[serde(default)]
    pub uid_map: Vec<IdMap>,
    #[serde(default)]
    pub gid_map: Vec<IdMap>,
}

// =============================================================================
// Container Specification
// =============================================================================

/// Container specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerSpec {
    /// Working directory of the container process.
    pub work_dir: String,
    /// Command and arguments.
    pub command: Vec<String>,
    /// Whether to allocate a terminal.
    pub terminal: bool,
    /// Hostname (only applied with a private UTS namespace).
    pub hostname: Option<String>,
    /// Declared rlimits. `None` keeps the runtime's inherited limits.
    pub rlimits: Option<Vec<RlimitSpec>>,
    /// Environment variables.
    pub env: HashMap<String, String>,
    /// Annotations copied verbatim into the runtime config.
    pub annotations: HashMap<String, String>,
    /// User bind mounts; these override defaults at the same destination.
    pub mounts: Vec<OciMount>,
    /// Host devices to expose (ignored when privileged).
    pub devices: Vec<DeviceSpec>,
    pub user_ns: NamespaceMode,
    pub net_ns: NamespaceMode,
    pub pid_ns: NamespaceMode,
    pub ipc_ns: NamespaceMode,
    /// Grants full host device access and drops confinement.
    pub privileged: bool,
    pub no_new_privileges: bool,
    /// AppArmor profile (not applied when privileged).
    pub apparmor_profile: Option<String>,
    /// SELinux process label (not applied when privileged).
    pub selinux_process_label: Option<String>,
    /// SELinux mount label (not applied when privileged).
    pub selinux_mount_label: Option<String>,
    /// Capabilities added to the default set.
    pub cap_add: Vec<String>,
    /// Capabilities dropped from the default set.
    pub cap_drop: Vec<String>,
    /// Mount the root filesystem read-only.
    pub read_only_filesystem: bool,
    pub id_mappings: IdMappings,
    /// Remove the container once it exits.
    pub remove: bool,
    /// Containers whose volumes are mounted into this one.
    pub volumes_from: Vec<String>,
    /// Cgroup resource block, passed through untouched.
    pub resource_limits: Option<OciResources>,
}

impl Default for ContainerSpec {
    fn default() -> Self {
        Self {
            work_dir: "/".to_string(),
            command: Vec::new(),
            terminal: false,
            hostname: None,
            rlimits: None,
            env: HashMap::new(),
            annotations: HashMap::new(),
            mounts: Vec::new(),
            devices: Vec::new(),
            user_ns: NamespaceMode::Host,
            net_ns: NamespaceMode::Private,
            pid_ns: NamespaceMode::Private,
            ipc_ns: NamespaceMode::Private,
            privileged: false,
            no_new_privileges: false,
            apparmor_profile: None,
            selinux_process_label: None,
            selinux_mount_label: None,
            cap_add: Vec::new(),
            cap_drop: Vec::new(),
            read_only_filesystem: false,
            id_mappings: IdMappings::default(),
            remove: false,
            volumes_from: Vec::new(),
            resource_limits: None,
        }
    }
}

impl ContainerSpec {
    /// Parses a specification from JSON and validates it.
    pub fn from_json(json: &str) -> Result<Self> {
        let spec: Self = serde_json::from_str(json)?;
        spec.validate()?;
        Ok(spec)
    }

    /// Checks the specification for contradictions that no translation can fix.
    pub fn validate(&self) -> Result<()> {
        if !self.work_dir.starts_with('/') {
            return Err(Error::InvalidSpec(format!(
                "working directory '{}' must be absolute",
                self.work_dir
            )));
        }

        for (i, mount) in self.mounts.iter().enumerate() {
            if !mount.destination.starts_with('/') {
                return Err(Error::InvalidSpec(format!(
                    "mounts[{}].destination '{}' must be absolute",
                    i, mount.destination
                )));
            }
        }

        // Inverted pairs pass through unchanged.
        for rlimit in self.rlimits.iter().flatten() {
            if rlimit.soft > rlimit.hard {
                warn!(
                    "rlimit {}: soft limit {} exceeds hard limit {}",
                    rlimit.kind, rlimit.soft, rlimit.hard
                );
            }
        }

        let maps = self.id_mappings.uid_map.iter().chain(&self.id_mappings.gid_map);
        for map in maps {
            if map.size == 0 {
                return Err(Error::InvalidSpec(format!(
                    "ID mapping at container id {} has zero size",
                    map.container_id
                )));
            }
        }

        Ok(())
    }
}
