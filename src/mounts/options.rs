//! Mount option normalization.
//!
//! Bind and tmpfs mounts carry user-supplied options. Before they reach the
//! runtime the options are validated (unknown or contradictory options are
//! rejected) and completed with defaults:
//!
//! | Mount  | Added when missing                               |
//! |--------|--------------------------------------------------|
//! | any    | `rw`, `rprivate`                                 |
//! | tmpfs  | `noexec`, `nosuid`, `nodev`, `tmpcopyup`         |
//! | bind   | `rbind`                                          |
//!
//! A tmpfs at `/dev` is generated with its own options and left alone.

use super::clean_path;
use crate::constants::{MOUNT_TYPE_BIND, MOUNT_TYPE_TMPFS, PROPAGATION_OPTIONS, SUPPORTED_MOUNT_TYPES};
use crate::error::{Error, Result};
use crate::oci::OciMount;

/// Validates and completes the options of every mount.
pub fn init_fs_mounts(mounts: &mut [OciMount]) -> Result<()> {
    for mount in mounts.iter_mut() {
        if !SUPPORTED_MOUNT_TYPES.contains(&mount.mount_type.as_str()) {
            return Err(Error::UnsupportedMountType {
                destination: mount.destination.clone(),
                mount_type: mount.mount_type.clone(),
            });
        }

        let is_tmpfs = mount.mount_type == MOUNT_TYPE_TMPFS;
        if mount.mount_type == MOUNT_TYPE_BIND || (is_tmpfs && clean_path(&mount.destination) != "/dev") {
            mount.options = process_options(&mount.destination, &mount.options, is_tmpfs)?;
        }
    }
    Ok(())
}

/// Tracks which option groups have been seen.
#[derive(Default)]
struct Seen {
    write: bool,
    exec: bool,
    suid: bool,
    dev: bool,
    propagation: bool,
    size: bool,
    mode: bool,
    copy_up: bool,
    bind: bool,
    relabel: bool,
}

/// Validates and completes a bind or tmpfs option list.
pub fn process_options(destination: &str, options: &[String], is_tmpfs: bool) -> Result<Vec<String>> {
    let mut seen = Seen::default();
    let mut processed = Vec::with_capacity(options.len() + 4);

    let invalid = |option: &str, reason: &str| Error::InvalidMountOption {
        destination: destination.to_string(),
        option: option.to_string(),
        reason: reason.to_string(),
    };

    for option in options {
        let key = option.split_once('=').map_or(option.as_str(), |(k, _)| k);

        let (flag, conflict) = match key {
            "rw" | "ro" => (&mut seen.write, "only one of 'rw' and 'ro' can be used"),
            "exec" | "noexec" => (&mut seen.exec, "only one of 'exec' and 'noexec' can be used"),
            "suid" | "nosuid" => (&mut seen.suid, "only one of 'suid' and 'nosuid' can be used"),
            "dev" | "nodev" => (&mut seen.dev, "only one of 'dev' and 'nodev' can be used"),
            k if PROPAGATION_OPTIONS.contains(&k) => {
                (&mut seen.propagation, "only one propagation mode can be used")
            }
            "size" | "mode" | "tmpcopyup" | "notmpcopyup" if !is_tmpfs => {
                return Err(invalid(option, "only allowed on tmpfs mounts"));
            }
            "size" => (&mut seen.size, "the 'size' option can only be set once"),
            "mode" => (&mut seen.mode, "the 'mode' option can only be set once"),
            "tmpcopyup" | "notmpcopyup" => {
                (&mut seen.copy_up, "only one of 'tmpcopyup' and 'notmpcopyup' can be used")
            }
            "bind" | "rbind" if is_tmpfs => {
                return Err(invalid(option, "not allowed on tmpfs mounts"));
            }
            "bind" | "rbind" => (&mut seen.bind, "only one of 'bind' and 'rbind' can be used"),
            "z" | "Z" => (&mut seen.relabel, "only one of 'z' and 'Z' can be used"),
            _ => return Err(invalid(option, "unknown mount option")),
        };

        if *flag {
            return Err(invalid(option, conflict));
        }
        *flag = true;
        processed.push(option.clone());
    }

    let mut add = |option: &str| processed.push(option.to_string());
    if !seen.write {
        add("rw");
    }
    if !seen.propagation {
        add("rprivate");
    }
    if is_tmpfs {
        if !seen.exec {
            add("noexec");
        }
        if !seen.suid {
            add("nosuid");
        }
        if !seen.dev {
            add("nodev");
        }
        if !seen.copy_up {
            add("tmpcopyup");
        }
    } else if !seen.bind {
        add("rbind");
    }

    Ok(processed)
}
