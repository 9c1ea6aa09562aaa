//! Device exposure.
//!
//! Privileged containers mirror every device node of the host. Unprivileged
//! containers receive only the devices they declare, each resolved from a
//! `src[:dst][:perms]` string to a concrete node.
//!
//! Rootless execution cannot `mknod`, so every device is bind-mounted from
//! the host instead of being created by the runtime.

use crate::constants::{MOUNT_TYPE_BIND, SKIPPED_DEVICE_DIRS, SKIPPED_DEVICE_NODES};
use crate::error::{Error, Result};
use crate::generator::SpecGenerator;
use crate::oci::{OciDevice, OciDeviceCgroup, OciMount};
use std::fs::Metadata;
use std::os::unix::fs::{FileTypeExt, MetadataExt};
use std::path::Path;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Options of a device bind mount under rootless execution.
const DEVICE_BIND_OPTIONS: &[&str] = &["bind", "nosuid", "noexec"];

/// Default cgroup access for declared devices.
const DEFAULT_DEVICE_PERMS: &str = "rwm";

/// A host device node and where it appears in the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostDevice {
    pub host_path: String,
    pub device: OciDevice,
}

/// A parsed `src[:dst][:perms]` device declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRequest {
    pub source: String,
    pub destination: String,
    pub permissions: String,
}

/// Returns true if `mode` is a non-empty combination of `r`, `w`, `m`.
pub fn is_valid_device_mode(mode: &str) -> bool {
    if mode.is_empty() {
        return false;
    }
    let mut seen = [false; 3];
    for c in mode.chars() {
        let idx = match c {
            'r' => 0,
            'w' => 1,
            'm' => 2,
            _ => return false,
        };
        if seen[idx] {
            return false;
        }
        seen[idx] = true;
    }
    true
}

/// Parses a `src[:dst][:perms]` device declaration.
pub fn parse_device(declared: &str) -> Result<DeviceRequest> {
    let invalid = |reason: String| Error::InvalidDevice {
        path: declared.to_string(),
        reason,
    };

    let parts: Vec<&str> = declared.split(':').collect();
    let (source, destination, permissions) = match parts.as_slice() {
        [src] => (*src, *src, DEFAULT_DEVICE_PERMS),
        [src, second] if is_valid_device_mode(second) => (*src, *src, *second),
        [src, dst] => (*src, *dst, DEFAULT_DEVICE_PERMS),
        [src, dst, perms] => {
            if !is_valid_device_mode(perms) {
                return Err(invalid(format!("invalid device mode '{}'", perms)));
            }
            (*src, *dst, *perms)
        }
        _ => return Err(invalid("expected src[:dst][:perms]".to_string())),
    };

    if !source.starts_with('/') {
        return Err(invalid(format!("source '{}' must be absolute", source)));
    }
    if !destination.starts_with('/') {
        return Err(invalid(format!("destination '{}' must be absolute", destination)));
    }

    Ok(DeviceRequest {
        source: source.to_string(),
        destination: destination.to_string(),
        permissions: permissions.to_string(),
    })
}

/// Builds a device entry from node metadata, or `None` for non-device files.
fn device_from_metadata(metadata: &Metadata, container_path: &str) -> Option<OciDevice> {
    let file_type = metadata.file_type();
    let device_type = if file_type.is_char_device() {
        "c"
    } else if file_type.is_block_device() {
        "b"
    } else {
        return None;
    };

    let rdev = metadata.rdev();
    // `major`/`minor` are safe functions in recent libc releases.
    #[allow(unused_unsafe)]
    let (major, minor) = unsafe { (libc::major(rdev), libc::minor(rdev)) };

    Some(OciDevice {
        path: container_path.to_string(),
        device_type: device_type.to_string(),
        major: i64::from(major),
        minor: i64::from(minor),
        file_mode: Some(metadata.mode() & 0o7777),
        uid: Some(metadata.uid()),
        gid: Some(metadata.gid()),
    })
}

/// Resolves a single path to a device node.
pub fn device_from_path(host_path: &Path, container_path: &str) -> Result<OciDevice> {
    let metadata = std::fs::metadata(host_path).map_err(|e| Error::InvalidDevice {
        path: host_path.display().to_string(),
        reason: e.to_string(),
    })?;
    device_from_metadata(&metadata, container_path).ok_or_else(|| Error::InvalidDevice {
        path: host_path.display().to_string(),
        reason: "not a block or character device".to_string(),
    })
}

fn is_skipped(entry: &DirEntry) -> bool {
    if entry.depth() == 0 {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    let name: &str = &name;
    if entry.file_type().is_dir() {
        name.starts_with('.') || (entry.depth() == 1 && SKIPPED_DEVICE_DIRS.contains(&name))
    } else {
        entry.depth() == 1 && SKIPPED_DEVICE_NODES.contains(&name)
    }
}

/// Lists device nodes below `root`, mapped beneath `container_root`.
///
/// The root itself must be readable; unreadable subdirectories are skipped.
pub fn list_devices(root: &Path, container_root: &str, skip_reserved: bool) -> Result<Vec<HostDevice>> {
    let mut devices = Vec::new();
    let walker = WalkDir::new(root).follow_links(false).sort_by_file_name();

    for entry in walker
        .into_iter()
        .filter_entry(|e| !skip_reserved || !is_skipped(e))
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                return Err(Error::DeviceEnumerationFailed {
                    root: root.to_path_buf(),
                    reason: e.to_string(),
                });
            }
            Err(e) => {
                warn!("Skipping unreadable device entry: {}", e);
                continue;
            }
        };

        let file_type = entry.file_type();
        if !file_type.is_char_device() && !file_type.is_block_device() {
            continue;
        }

        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        let container_path = if relative.as_os_str().is_empty() {
            container_root.to_string()
        } else {
            format!(
                "{}/{}",
                container_root.trim_end_matches('/'),
                relative.display()
            )
        };

        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!("Skipping device {}: {}", entry.path().display(), e);
                continue;
            }
        };
        if let Some(device) = device_from_metadata(&metadata, &container_path) {
            devices.push(HostDevice {
                host_path: entry.path().display().to_string(),
                device,
            });
        }
    }

    Ok(devices)
}

fn bind_device(generator: &mut SpecGenerator, host: &HostDevice) {
    generator.add_mount(OciMount::new(
        &host.device.path,
        MOUNT_TYPE_BIND,
        &host.host_path,
        DEVICE_BIND_OPTIONS,
    ));
}

/// Terminal devices that belong to the container's own devpts instance.
fn is_host_terminal(container_path: &str) -> bool {
    container_path == "/dev/ptmx" || container_path.starts_with("/dev/tty")
}

/// Bind-mounts host devices for a rootless privileged container.
///
/// Host terminals and destinations that already carry a mount are left
/// alone, and the device cgroup rules are dropped.
fn bind_privileged_devices(generator: &mut SpecGenerator, devices: &[HostDevice]) {
    for host in devices {
        if is_host_terminal(&host.device.path) {
            continue;
        }
        if generator.mount(&host.device.path).is_some() {
            debug!("Keeping existing mount at {}", host.device.path);
            continue;
        }
        bind_device(generator, host);
    }
    if let Some(resources) = generator.linux_mut().resources.as_mut() {
        resources.devices.clear();
    }
}

/// Mirrors every host device into a privileged container.
pub fn add_privileged_devices(generator: &mut SpecGenerator, dev_root: &Path, rootless: bool) -> Result<()> {
    let devices = list_devices(dev_root, "/dev", true)?;
    debug!("Mirroring {} host devices", devices.len());

    if rootless {
        bind_privileged_devices(generator, &devices);
        return Ok(());
    }

    generator.linux_mut().devices.clear();
    for host in devices {
        generator.add_linux_device(host.device);
    }
    generator.resources_mut().devices = vec![OciDeviceCgroup {
        allow: true,
        device_type: None,
        major: None,
        minor: None,
        access: Some(DEFAULT_DEVICE_PERMS.to_string()),
    }];
    Ok(())
}

/// Exposes one declared device (or every device below a directory).
pub fn devices_from_path(generator: &mut SpecGenerator, declared: &str, rootless: bool) -> Result<()> {
    let request = parse_device(declared)?;
    let source = Path::new(&request.source);

    let metadata = std::fs::metadata(source).map_err(|e| Error::InvalidDevice {
        path: request.source.clone(),
        reason: e.to_string(),
    })?;

    let devices = if metadata.is_dir() {
        list_devices(source, &request.destination, false)?
    } else {
        vec![HostDevice {
            host_path: request.source.clone(),
            device: device_from_path(source, &request.destination)?,
        }]
    };

    for host in devices {
        debug!(
            "Adding device {} as {} ({})",
            host.host_path, host.device.path, request.permissions
        );
        if rootless {
            bind_device(generator, &host);
            continue;
        }
        generator.add_linux_device_cgroup(OciDeviceCgroup {
            allow: true,
            device_type: Some(host.device.device_type.clone()),
            major: Some(host.device.major),
            minor: Some(host.device.minor),
            access: Some(request.permissions.clone()),
        });
        generator.add_linux_device(host.device);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_device_modes() {
        assert!(is_valid_device_mode("rwm"));
        assert!(is_valid_device_mode("mr"));
        assert!(!is_valid_device_mode(""));
        assert!(!is_valid_device_mode("rr"));
        assert!(!is_valid_device_mode("rx"));
    }

    #[test]
    fn test_parse_device_forms() {
        let req = parse_device("/dev/fuse").unwrap();
        assert_eq!(req.destination, "/dev/fuse");
        assert_eq!(req.permissions, "rwm");

        let req = parse_device("/dev/fuse:r").unwrap();
        assert_eq!(req.destination, "/dev/fuse");
        assert_eq!(req.permissions, "r");

        let req = parse_device("/dev/sda:/dev/xvda:rw").unwrap();
        assert_eq!(req.destination, "/dev/xvda");
        assert_eq!(req.permissions, "rw");

        assert!(parse_device("/dev/sda:/dev/xvda:rwx").is_err());
        assert!(parse_device("dev/sda").is_err());
        assert!(parse_device("/a:/b:r:extra").is_err());
    }

    #[test]
    fn test_null_device_resolves() {
        let device = device_from_path(Path::new("/dev/null"), "/dev/null").unwrap();
        assert_eq!(device.device_type, "c");
        assert_eq!((device.major, device.minor), (1, 3));
    }

    #[test]
    fn test_regular_file_is_not_a_device() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("plain");
        std::fs::write(&file, b"x").unwrap();

        let err = device_from_path(&file, "/dev/plain").unwrap_err();
        assert!(matches!(err, Error::InvalidDevice { .. }));
    }

    #[test]
    fn test_list_devices_empty_tree() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("pts")).unwrap();
        std::fs::write(temp.path().join("note"), b"x").unwrap();
        assert!(list_devices(temp.path(), "/dev", true).unwrap().is_empty());
    }

    fn host_device(path: &str) -> HostDevice {
        HostDevice {
            host_path: path.to_string(),
            device: OciDevice {
                path: path.to_string(),
                device_type: "c".to_string(),
                major: 1,
                minor: 3,
                file_mode: Some(0o666),
                uid: Some(0),
                gid: Some(0),
            },
        }
    }

    #[test]
    fn test_rootless_privileged_skips_terminals_and_mounted() {
        let mut generator = SpecGenerator::new();
        generator.add_mount(OciMount::new("/dev/fuse", "bind", "/elsewhere", &[]));
        let devices: Vec<HostDevice> = ["/dev/null", "/dev/ptmx", "/dev/tty", "/dev/ttyS0", "/dev/fuse"]
            .into_iter()
            .map(host_device)
            .collect();

        bind_privileged_devices(&mut generator, &devices);

        assert_eq!(generator.mount("/dev/null").unwrap().mount_type, "bind");
        assert!(generator.mount("/dev/ptmx").is_none());
        assert!(generator.mount("/dev/tty").is_none());
        assert!(generator.mount("/dev/ttyS0").is_none());
        assert_eq!(generator.mount("/dev/fuse").unwrap().source, "/elsewhere");
        let resources = generator.linux_mut().resources.clone().unwrap();
        assert!(resources.devices.is_empty());
    }

    #[test]
    fn test_list_devices_missing_root() {
        let err = list_devices(Path::new("/nonexistent/dev"), "/dev", true).unwrap_err();
        assert!(matches!(err, Error::DeviceEnumerationFailed { .. }));
    }
}
