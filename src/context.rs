//! Execution context classification.
//!
//! The policy axes that decide mounts (rootless execution, user namespace
//! mode, network namespace sharing, GID mapping) are folded into one
//! [`ExecutionContext`] computed once per translation. Every later stage
//! reads these flags instead of re-deriving them.

use crate::constants::TTY_GID;
use crate::platform::Host;
use crate::specgen::{ContainerSpec, NamespaceMode};
use tracing::warn;

/// Flags derived from the specification and the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionContext {
    /// Translation happens under rootless execution.
    pub rootless: bool,
    /// The container runs inside a user namespace.
    pub in_user_namespace: bool,
    /// A fresh sysfs can be mounted.
    pub can_mount_sysfs: bool,
    /// Container GID 5 is mapped, so `gid=5` on devpts is satisfiable.
    pub gid5_available: bool,
}

impl ExecutionContext {
    /// Classifies a specification on a host.
    pub fn new(spec: &ContainerSpec, host: &Host) -> Self {
        let in_user_namespace = in_user_namespace(host.rootless, &spec.user_ns);
        let can_mount_sysfs = can_mount_sysfs(in_user_namespace, &spec.net_ns);
        let gid5_available = gid5_available(host, spec);

        if !gid5_available {
            warn!("GID {} is not mapped, devpts will be mounted without gid option", TTY_GID);
        }

        Self {
            rootless: host.rootless,
            in_user_namespace,
            can_mount_sysfs,
            gid5_available,
        }
    }
}

/// True if rootless or the user namespace mode is anything but host.
pub fn in_user_namespace(rootless: bool, user_ns: &NamespaceMode) -> bool {
    rootless || !user_ns.is_host()
}

/// False when a user namespace shares the host network namespace.
///
/// Sysfs reflects the network namespace of the mounter; from a user
/// namespace without its own network namespace the kernel refuses the mount.
pub fn can_mount_sysfs(in_user_namespace: bool, net_ns: &NamespaceMode) -> bool {
    !(in_user_namespace && net_ns.is_host())
}

/// True unless container GID 5 is left unmapped.
///
/// Under rootless execution the host must map more than five GIDs. A
/// declared GID mapping must also cover GID 5 itself.
pub fn gid5_available(host: &Host, spec: &ContainerSpec) -> bool {
    if host.rootless {
        let mapped = host.available_gids.unwrap_or(0);
        if mapped <= u64::from(TTY_GID) {
            return false;
        }
    }

    let gid_map = &spec.id_mappings.gid_map;
    gid_map.is_empty() || gid_map.iter().any(|r| r.covers(TTY_GID))
}
