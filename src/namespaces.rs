//! Namespace configuration.
//!
//! Each [`NamespaceMode`] becomes an entry in `linux.namespaces`:
//!
//! | Mode           | Result                                         |
//! |----------------|------------------------------------------------|
//! | `Host`         | namespace omitted (shared with the host)       |
//! | `Private`      | `{ "type": kind }`                             |
//! | `Path(p)`      | `{ "type": kind, "path": p }`                  |
//! | `Container(c)` | path resolved through a [`NamespaceResolver`]  |
//!
//! UTS and mount namespaces are always private.

use crate::error::{Error, Result};
use crate::generator::SpecGenerator;
use crate::oci::{OciIdMapping, OciNamespace};
use crate::specgen::{ContainerSpec, IdMap, NamespaceMode};
use std::collections::HashMap;
use tracing::debug;

/// Linux namespace kinds handled by the translator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamespaceKind {
    Pid,
    Network,
    Ipc,
    Uts,
    Mount,
    User,
}

impl NamespaceKind {
    /// Returns the OCI `type` string.
    pub fn oci_type(self) -> &'static str {
        match self {
            Self::Pid => "pid",
            Self::Network => "network",
            Self::Ipc => "ipc",
            Self::Uts => "uts",
            Self::Mount => "mount",
            Self::User => "user",
        }
    }

    /// Returns the entry name under `/proc/<pid>/ns/`.
    pub fn proc_name(self) -> &'static str {
        match self {
            Self::Pid => "pid",
            Self::Network => "net",
            Self::Ipc => "ipc",
            Self::Uts => "uts",
            Self::Mount => "mnt",
            Self::User => "user",
        }
    }
}

/// Locates the namespaces of other containers.
pub trait NamespaceResolver {
    /// Returns the path of `kind` namespace of `container`.
    fn namespace_path(&self, container: &str, kind: NamespaceKind) -> Result<String>;
}

/// Resolves containers through their init PID in `/proc`.
#[derive(Debug, Clone, Default)]
pub struct ProcResolver {
    pids: HashMap<String, u32>,
}

impl ProcResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the init PID of a running container.
    pub fn with_container(mut self, id: &str, pid: u32) -> Self {
        self.pids.insert(id.to_string(), pid);
        self
    }
}

impl NamespaceResolver for ProcResolver {
    fn namespace_path(&self, container: &str, kind: NamespaceKind) -> Result<String> {
        let pid = self
            .pids
            .get(container)
            .ok_or_else(|| Error::NamespaceUnavailable {
                container: container.to_string(),
                kind: kind.oci_type().to_string(),
                reason: "container is not running".to_string(),
            })?;
        Ok(format!("/proc/{}/ns/{}", pid, kind.proc_name()))
    }
}

fn namespace_entry(
    kind: NamespaceKind,
    mode: &NamespaceMode,
    resolver: &dyn NamespaceResolver,
) -> Result<Option<OciNamespace>> {
    let path = match mode {
        NamespaceMode::Host => return Ok(None),
        NamespaceMode::Private => None,
        NamespaceMode::Path(path) => Some(path.clone()),
        NamespaceMode::Container(id) => Some(resolver.namespace_path(id, kind)?),
    };
    Ok(Some(OciNamespace {
        ns_type: kind.oci_type().to_string(),
        path,
    }))
}

fn oci_mappings(maps: &[IdMap]) -> Vec<OciIdMapping> {
    maps.iter()
        .map(|m| OciIdMapping {
            container_id: m.container_id,
            host_id: m.host_id,
            size: m.size,
        })
        .collect()
}

/// Builds `linux.namespaces`, ID mappings and the hostname.
pub fn configure_namespaces(
    spec: &ContainerSpec,
    generator: &mut SpecGenerator,
    resolver: &dyn NamespaceResolver,
) -> Result<()> {
    let private = NamespaceMode::Private;
    let modes = [
        (NamespaceKind::Pid, &spec.pid_ns),
        (NamespaceKind::Network, &spec.net_ns),
        (NamespaceKind::Ipc, &spec.ipc_ns),
        (NamespaceKind::Uts, &private),
        (NamespaceKind::Mount, &private),
        (NamespaceKind::User, &spec.user_ns),
    ];

    let mut namespaces = Vec::with_capacity(modes.len());
    for (kind, mode) in modes {
        if let Some(entry) = namespace_entry(kind, mode, resolver)? {
            debug!("Namespace {} -> {:?}", entry.ns_type, entry.path);
            namespaces.push(entry);
        }
    }

    let linux = generator.linux_mut();
    linux.namespaces = namespaces;
    if !spec.user_ns.is_host() {
        linux.uid_mappings = oci_mappings(&spec.id_mappings.uid_map);
        linux.gid_mappings = oci_mappings(&spec.id_mappings.gid_map);
    }

    if let Some(hostname) = &spec.hostname {
        generator.spec_mut().hostname = Some(hostname.clone());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types(generator: &SpecGenerator) -> Vec<String> {
        generator
            .spec()
            .linux
            .as_ref()
            .unwrap()
            .namespaces
            .iter()
            .map(|n| n.ns_type.clone())
            .collect()
    }

    #[test]
    fn test_host_namespaces_are_omitted() {
        let spec = ContainerSpec {
            net_ns: NamespaceMode::Host,
            pid_ns: NamespaceMode::Host,
            ..Default::default()
        };
        let mut generator = SpecGenerator::new();
        configure_namespaces(&spec, &mut generator, &ProcResolver::new()).unwrap();
        assert_eq!(types(&generator), vec!["ipc", "uts", "mount"]);
    }

    #[test]
    fn test_private_user_namespace_carries_mappings() {
        let mut spec = ContainerSpec {
            user_ns: NamespaceMode::Private,
            ..Default::default()
        };
        spec.id_mappings.uid_map = vec![IdMap::new(0, 100000, 65536)];
        spec.id_mappings.gid_map = vec![IdMap::new(0, 100000, 65536)];

        let mut generator = SpecGenerator::new();
        configure_namespaces(&spec, &mut generator, &ProcResolver::new()).unwrap();

        let linux = generator.spec().linux.clone().unwrap();
        assert!(types(&generator).contains(&"user".to_string()));
        assert_eq!(linux.uid_mappings[0].host_id, 100000);
        assert_eq!(linux.gid_mappings.len(), 1);
    }

    #[test]
    fn test_container_namespace_resolution() {
        let spec = ContainerSpec {
            net_ns: NamespaceMode::Container("infra".to_string()),
            ..Default::default()
        };
        let resolver = ProcResolver::new().with_container("infra", 4242);
        let mut generator = SpecGenerator::new();
        configure_namespaces(&spec, &mut generator, &resolver).unwrap();

        let net = generator
            .spec()
            .linux
            .as_ref()
            .unwrap()
            .namespaces
            .iter()
            .find(|n| n.ns_type == "network")
            .cloned()
            .unwrap();
        assert_eq!(net.path.as_deref(), Some("/proc/4242/ns/net"));
    }

    #[test]
    fn test_unknown_container_fails() {
        let spec = ContainerSpec {
            ipc_ns: NamespaceMode::Container("ghost".to_string()),
            ..Default::default()
        };
        let mut generator = SpecGenerator::new();
        let err = configure_namespaces(&spec, &mut generator, &ProcResolver::new()).unwrap_err();
        assert!(matches!(err, Error::NamespaceUnavailable { .. }));
    }
}
