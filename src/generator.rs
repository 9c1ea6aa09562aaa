//! Runtime config generator.
//!
//! [`SpecGenerator`] starts from the default Linux config a runtime expects
//! and offers narrow mutation helpers. Every translation stage receives the
//! same generator and adds its part; [`SpecGenerator::into_spec`] produces
//! the final [`OciSpec`].
//!
//! # Default Config
//!
//! | Field        | Default                                              |
//! |--------------|------------------------------------------------------|
//! | mounts       | `/proc`, `/dev`, `/dev/pts`, `/dev/mqueue`, `/sys`   |
//! | env          | `PATH`, `TERM=xterm`                                 |
//! | rlimits      | `RLIMIT_NOFILE` 1024/1024                            |
//! | namespaces   | pid, network, ipc, uts, mount                        |
//! | device cgroup| deny all                                             |
//!
//! `/dev/shm` is deliberately absent; it is sized and provided by the caller
//! through user mounts.

use crate::constants::{
    DEFAULT_NOFILE_LIMIT, DEFAULT_PATH_ENV, DEFAULT_TERM_ENV, OCI_RUNTIME_SPEC_VERSION,
    RLIMIT_NOFILE,
};
use crate::mounts::MountTable;
use crate::oci::{
    OciDevice, OciDeviceCgroup, OciLinux, OciMount, OciNamespace, OciProcess, OciResources,
    OciRlimit, OciRoot, OciSpec, OciUser,
};
use std::collections::HashMap;

/// Incrementally builds an OCI runtime config.
#[derive(Debug, Clone)]
pub struct SpecGenerator {
    spec: OciSpec,
    mounts: MountTable,
}

impl Default for SpecGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl SpecGenerator {
    /// Creates a generator holding the default Linux config.
    pub fn new() -> Self {
        let spec = OciSpec {
            oci_version: OCI_RUNTIME_SPEC_VERSION.to_string(),
            root: OciRoot::default(),
            process: OciProcess {
                terminal: false,
                user: OciUser::default(),
                args: Vec::new(),
                env: vec![
                    format!("PATH={}", DEFAULT_PATH_ENV),
                    format!("TERM={}", DEFAULT_TERM_ENV),
                ],
                cwd: "/".to_string(),
                rlimits: Some(vec![OciRlimit {
                    rlimit_type: RLIMIT_NOFILE.to_string(),
                    hard: DEFAULT_NOFILE_LIMIT,
                    soft: DEFAULT_NOFILE_LIMIT,
                }]),
                ..Default::default()
            },
            hostname: None,
            mounts: Vec::new(),
            annotations: None,
            linux: Some(OciLinux {
                namespaces: ["pid", "network", "ipc", "uts", "mount"]
                    .iter()
                    .map(|t| OciNamespace {
                        ns_type: t.to_string(),
                        path: None,
                    })
                    .collect(),
                resources: Some(OciResources {
                    devices: vec![OciDeviceCgroup {
                        allow: false,
                        device_type: None,
                        major: None,
                        minor: None,
                        access: Some("rwm".to_string()),
                    }],
                    ..Default::default()
                }),
                ..Default::default()
            }),
        };

        Self {
            spec,
            mounts: default_mounts().into_iter().collect(),
        }
    }

    /// Returns the config under construction (mounts excluded).
    pub fn spec(&self) -> &OciSpec {
        &self.spec
    }

    /// Returns the config under construction for direct edits.
    pub fn spec_mut(&mut self) -> &mut OciSpec {
        &mut self.spec
    }

    pub fn mounts(&self) -> &MountTable {
        &self.mounts
    }

    /// Replaces the whole mount table.
    pub fn set_mounts(&mut self, mounts: MountTable) {
        self.mounts = mounts;
    }

    /// Returns the mount at `destination`.
    pub fn mount(&self, destination: &str) -> Option<&OciMount> {
        self.mounts.get(destination)
    }

    pub fn remove_mount(&mut self, destination: &str) -> Option<OciMount> {
        self.mounts.remove(destination)
    }

    /// Adds a mount, superseding any mount at the same destination.
    pub fn add_mount(&mut self, mount: OciMount) {
        self.mounts.insert(mount);
    }

    // =========================================================================
    // Process
    // =========================================================================

    pub fn set_process_cwd(&mut self, cwd: &str) {
        self.spec.process.cwd = cwd.to_string();
    }

    pub fn set_process_args(&mut self, args: &[String]) {
        self.spec.process.args = args.to_vec();
    }

    pub fn set_process_terminal(&mut self, terminal: bool) {
        self.spec.process.terminal = terminal;
    }

    pub fn set_process_no_new_privileges(&mut self, no_new_privileges: bool) {
        self.spec.process.no_new_privileges = no_new_privileges;
    }

    pub fn set_process_apparmor_profile(&mut self, profile: &str) {
        self.spec.process.apparmor_profile = Some(profile.to_string());
    }

    pub fn set_process_selinux_label(&mut self, label: &str) {
        self.spec.process.selinux_label = Some(label.to_string());
    }

    /// Sets an environment variable, replacing an existing one of that name.
    pub fn add_process_env(&mut self, name: &str, value: &str) {
        let entry = format!("{}={}", name, value);
        let prefix = format!("{}=", name);
        let env = &mut self.spec.process.env;
        match env.iter_mut().find(|e| e.starts_with(&prefix)) {
            Some(existing) => *existing = entry,
            None => env.push(entry),
        }
    }

    /// Returns the value of an environment variable.
    pub fn process_env(&self, name: &str) -> Option<&str> {
        let prefix = format!("{}=", name);
        self.spec
            .process
            .env
            .iter()
            .find_map(|e| e.strip_prefix(prefix.as_str()))
    }

    /// Sets an rlimit, replacing an existing one of the same type.
    pub fn add_process_rlimit(&mut self, rlimit_type: &str, hard: u64, soft: u64) {
        let rlimits = self.spec.process.rlimits.get_or_insert_with(Vec::new);
        let rlimit = OciRlimit {
            rlimit_type: rlimit_type.to_string(),
            hard,
            soft,
        };
        match rlimits.iter_mut().find(|r| r.rlimit_type == rlimit_type) {
            Some(existing) => *existing = rlimit,
            None => rlimits.push(rlimit),
        }
    }

    /// Drops all rlimits so the runtime keeps its inherited limits.
    pub fn clear_process_rlimits(&mut self) {
        self.spec.process.rlimits = None;
    }

    // =========================================================================
    // Annotations
    // =========================================================================

    pub fn add_annotation(&mut self, key: &str, value: &str) {
        self.annotations_mut()
            .insert(key.to_string(), value.to_string());
    }

    /// Returns the annotation map, creating it if absent.
    pub fn annotations_mut(&mut self) -> &mut HashMap<String, String> {
        self.spec.annotations.get_or_insert_with(HashMap::new)
    }

    // =========================================================================
    // Linux
    // =========================================================================

    /// Returns the Linux section, creating it if absent.
    pub fn linux_mut(&mut self) -> &mut OciLinux {
        self.spec.linux.get_or_insert_with(OciLinux::default)
    }

    /// Returns the Linux resources block, creating it if absent.
    pub fn resources_mut(&mut self) -> &mut OciResources {
        self.linux_mut()
            .resources
            .get_or_insert_with(OciResources::default)
    }

    pub fn add_linux_masked_path(&mut self, path: &str) {
        let masked = &mut self.linux_mut().masked_paths;
        if !masked.iter().any(|p| p == path) {
            masked.push(path.to_string());
        }
    }

    pub fn add_linux_readonly_path(&mut self, path: &str) {
        let readonly = &mut self.linux_mut().readonly_paths;
        if !readonly.iter().any(|p| p == path) {
            readonly.push(path.to_string());
        }
    }

    /// Adds a device node, replacing one at the same container path.
    pub fn add_linux_device(&mut self, device: OciDevice) {
        let devices = &mut self.linux_mut().devices;
        match devices.iter_mut().find(|d| d.path == device.path) {
            Some(existing) => *existing = device,
            None => devices.push(device),
        }
    }

    pub fn add_linux_device_cgroup(&mut self, rule: OciDeviceCgroup) {
        self.resources_mut().devices.push(rule);
    }

    /// Finishes the config.
    pub fn into_spec(self) -> OciSpec {
        let mut spec = self.spec;
        spec.mounts = self.mounts.into_vec();
        spec
    }
}

/// Mounts present in every freshly generated config.
fn default_mounts() -> Vec<OciMount> {
    vec![
        OciMount::new("/proc", "proc", "proc", &["nosuid", "noexec", "nodev"]),
        OciMount::new(
            "/dev",
            "tmpfs",
            "tmpfs",
            &["nosuid", "strictatime", "mode=755", "size=65536k"],
        ),
        OciMount::new(
            "/dev/pts",
            "devpts",
            "devpts",
            &[
                "nosuid",
                "noexec",
                "newinstance",
                "ptmxmode=0666",
                "mode=0620",
                "gid=5",
            ],
        ),
        OciMount::new("/dev/mqueue", "mqueue", "mqueue", &["nosuid", "noexec", "nodev"]),
        OciMount::new("/sys", "sysfs", "sysfs", &["nosuid", "noexec", "nodev", "ro"]),
    ]
}
