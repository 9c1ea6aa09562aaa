//! Security attributes and process environment.
//!
//! ## Confinement
//!
//! Privileged containers run unconfined: no AppArmor profile, no SELinux
//! labels, no masked or read-only kernel paths and the full capability set.
//! Unprivileged containers get the declared confinement plus
//! [`MASKED_PATHS`] and [`READONLY_PATHS`].
//!
//! ## Capabilities
//!
//! Unprivileged containers start from [`DEFAULT_CAPABILITIES`]. Drops are
//! applied before adds, and `ALL` is accepted on both sides.

use crate::config::TranslatorConfig;
use crate::constants::{ALL_CAPABILITIES, DEFAULT_CAPABILITIES, MASKED_PATHS, READONLY_PATHS};
use crate::context::ExecutionContext;
use crate::error::{Error, Result};
use crate::generator::SpecGenerator;
use crate::oci::OciCapabilities;
use crate::specgen::ContainerSpec;
use std::collections::HashMap;
use tracing::debug;

/// Hides or write-protects sensitive kernel filesystems.
///
/// Read-only remounts under `/proc` are skipped for rootless containers
/// sharing the host PID namespace, since the host procfs cannot be
/// remounted from there.
pub fn block_access_to_kernel_filesystems(
    privileged: bool,
    pid_is_host: bool,
    rootless: bool,
    generator: &mut SpecGenerator,
) {
    if privileged {
        return;
    }

    for path in MASKED_PATHS {
        generator.add_linux_masked_path(path);
    }

    if pid_is_host && rootless {
        return;
    }

    for path in READONLY_PATHS {
        generator.add_linux_readonly_path(path);
    }
}

/// Copies user annotations verbatim.
pub fn add_annotations(annotations: &HashMap<String, String>, generator: &mut SpecGenerator) {
    for (key, value) in annotations {
        generator.add_annotation(key, value);
    }
}

/// Sets the runtime marker, then the declared environment in name order.
///
/// Declared variables may override the marker and the generator defaults.
pub fn add_environment(
    env: &HashMap<String, String>,
    config: &TranslatorConfig,
    generator: &mut SpecGenerator,
) {
    generator.add_process_env(&config.marker_env, &config.marker_value);

    let mut names: Vec<&String> = env.keys().collect();
    names.sort();
    for name in names {
        generator.add_process_env(name, &env[name]);
    }
}

/// Normalizes a capability name to `CAP_` upper case.
pub fn normalize_capability(name: &str) -> String {
    let upper = name.trim().to_uppercase();
    if upper == "ALL" || upper.starts_with("CAP_") {
        upper
    } else {
        format!("CAP_{}", upper)
    }
}

/// Computes the capability set of the container process.
pub fn capabilities(privileged: bool, cap_add: &[String], cap_drop: &[String]) -> Result<Vec<String>> {
    if privileged {
        return Ok(ALL_CAPABILITIES.iter().map(|c| c.to_string()).collect());
    }

    let known = |cap: &str| -> Result<()> {
        if ALL_CAPABILITIES.contains(&cap) {
            Ok(())
        } else {
            Err(Error::InvalidSpec(format!("unknown capability '{}'", cap)))
        }
    };

    let mut caps: Vec<String> = DEFAULT_CAPABILITIES.iter().map(|c| c.to_string()).collect();

    for cap in cap_drop.iter().map(|c| normalize_capability(c)) {
        if cap == "ALL" {
            caps.clear();
            continue;
        }
        known(&cap)?;
        caps.retain(|c| *c != cap);
    }

    for cap in cap_add.iter().map(|c| normalize_capability(c)) {
        if cap == "ALL" {
            caps = ALL_CAPABILITIES.iter().map(|c| c.to_string()).collect();
            continue;
        }
        known(&cap)?;
        if !caps.contains(&cap) {
            caps.push(cap);
        }
    }

    caps.sort();
    Ok(caps)
}

/// Applies the security attributes of the specification.
///
/// Covers no-new-privileges, AppArmor, kernel filesystem blocking,
/// capabilities, SELinux labels and the read-only root.
pub fn configure_security(
    spec: &ContainerSpec,
    ctx: &ExecutionContext,
    generator: &mut SpecGenerator,
) -> Result<()> {
    generator.set_process_no_new_privileges(spec.no_new_privileges);

    if !spec.privileged {
        if let Some(profile) = &spec.apparmor_profile {
            generator.set_process_apparmor_profile(profile);
        }
    }

    block_access_to_kernel_filesystems(
        spec.privileged,
        spec.pid_ns.is_host(),
        ctx.rootless,
        generator,
    );

    let caps = capabilities(spec.privileged, &spec.cap_add, &spec.cap_drop)?;
    debug!("Granting {} capabilities", caps.len());
    generator.spec_mut().process.capabilities = Some(OciCapabilities {
        bounding: caps.clone(),
        effective: caps.clone(),
        permitted: caps,
        ..Default::default()
    });

    if !spec.privileged {
        if let Some(label) = &spec.selinux_process_label {
            generator.set_process_selinux_label(label);
        }
        if let Some(label) = &spec.selinux_mount_label {
            generator.linux_mut().mount_label = Some(label.clone());
        }
    }

    generator.spec_mut().root.readonly = spec.read_only_filesystem;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(rootless: bool) -> ExecutionContext {
        ExecutionContext {
            rootless,
            in_user_namespace: rootless,
            can_mount_sysfs: true,
            gid5_available: true,
        }
    }

    #[test]
    fn test_privileged_blocks_nothing() {
        let mut generator = SpecGenerator::new();
        block_access_to_kernel_filesystems(true, false, false, &mut generator);
        let linux = generator.spec().linux.clone().unwrap();
        assert!(linux.masked_paths.is_empty());
        assert!(linux.readonly_paths.is_empty());
    }

    #[test]
    fn test_rootless_host_pid_skips_readonly_paths() {
        let mut generator = SpecGenerator::new();
        block_access_to_kernel_filesystems(false, true, true, &mut generator);
        let linux = generator.spec().linux.clone().unwrap();
        assert!(linux.masked_paths.contains(&"/proc/kcore".to_string()));
        assert!(linux.readonly_paths.is_empty());

        let mut generator = SpecGenerator::new();
        block_access_to_kernel_filesystems(false, true, false, &mut generator);
        let linux = generator.spec().linux.clone().unwrap();
        assert!(linux.readonly_paths.contains(&"/proc/sys".to_string()));
    }

    #[test]
    fn test_capability_arithmetic() {
        let caps = capabilities(false, &["net_admin".to_string()], &["CAP_MKNOD".to_string()]).unwrap();
        assert!(caps.contains(&"CAP_NET_ADMIN".to_string()));
        assert!(!caps.contains(&"CAP_MKNOD".to_string()));

        let caps = capabilities(false, &["chown".to_string()], &["all".to_string()]).unwrap();
        assert_eq!(caps, vec!["CAP_CHOWN".to_string()]);

        assert!(capabilities(false, &["CAP_BOGUS".to_string()], &[]).is_err());
        assert_eq!(capabilities(true, &[], &[]).unwrap().len(), ALL_CAPABILITIES.len());
    }

    #[test]
    fn test_privileged_skips_apparmor() {
        let spec = ContainerSpec {
            privileged: true,
            apparmor_profile: Some("container-default".to_string()),
            ..Default::default()
        };
        let mut generator = SpecGenerator::new();
        configure_security(&spec, &ctx(false), &mut generator).unwrap();
        assert_eq!(generator.spec().process.apparmor_profile, None);

        let spec = ContainerSpec {
            privileged: false,
            ..spec
        };
        let mut generator = SpecGenerator::new();
        configure_security(&spec, &ctx(false), &mut generator).unwrap();
        assert_eq!(
            generator.spec().process.apparmor_profile.as_deref(),
            Some("container-default")
        );
    }

    #[test]
    fn test_environment_marker_and_override() {
        let config = TranslatorConfig::default();
        let mut env = HashMap::new();
        env.insert("PATH".to_string(), "/opt/bin".to_string());

        let mut generator = SpecGenerator::new();
        add_environment(&env, &config, &mut generator);
        assert_eq!(generator.process_env("container"), Some("magikrun"));
        assert_eq!(generator.process_env("PATH"), Some("/opt/bin"));
    }
}
