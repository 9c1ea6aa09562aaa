//! # Translation Constants
//!
//! Defines default limits, well-known paths, mount option sets and
//! annotation keys used while producing OCI runtime configs. These
//! constants are the **single source of truth** for the values that end up
//! in `config.json`.
//!
//! ## Security Rationale
//!
//! Several lists here decide what a container can see of the host kernel
//! (masked and read-only paths) and what it can mount. Changing them changes
//! the isolation boundary of every container produced by this crate:
//! - Masked paths are bind-mounted over with an empty file or directory
//! - Read-only paths are remounted read-only inside the container
//! - Mount option sets are written verbatim into the runtime config
//!
//! ## Cross-References
//!
//! - [`crate::rlimits`]: Uses the rlimit ceiling
//! - [`crate::mounts`]: Uses mount option sets
//! - [`crate::security`]: Uses masked/read-only paths and capability sets
//! - [`crate::translate`]: Uses annotation keys

// =============================================================================
// OCI
// =============================================================================

/// OCI runtime spec version written into generated configs.
pub const OCI_RUNTIME_SPEC_VERSION: &str = "1.0.2";

/// Default `PATH` for container processes.
pub const DEFAULT_PATH_ENV: &str =
    "/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin";

/// Default `TERM` for container processes.
pub const DEFAULT_TERM_ENV: &str = "xterm";

// =============================================================================
// Resource Limits
// =============================================================================

/// Ceiling applied to `RLIMIT_NOFILE` and `RLIMIT_NPROC` when unset (1 Mi).
///
/// **Rationale**: This is the highest value the kernel accepts without a
/// sysctl override (`fs.nr_open`). Rootless execution cannot always raise
/// limits this far, so the default is only applied to rooted containers.
pub const RLIMIT_CEILING: u64 = 1_048_576;

/// Open-file limit present in a freshly generated config.
pub const DEFAULT_NOFILE_LIMIT: u64 = 1024;

/// Prefix of normalized rlimit names.
pub const RLIMIT_PREFIX: &str = "RLIMIT_";

/// Normalized name of the open-files rlimit.
pub const RLIMIT_NOFILE: &str = "RLIMIT_NOFILE";

/// Normalized name of the process-count rlimit.
pub const RLIMIT_NPROC: &str = "RLIMIT_NPROC";

// =============================================================================
// Host Paths
// =============================================================================

/// GID map of the calling process.
pub const GID_MAP_PATH: &str = "/proc/self/gid_map";

/// Host device root enumerated for privileged containers.
pub const DEV_ROOT: &str = "/dev";

/// Environment marker set when running inside a rootless user namespace.
pub const USERNS_CONFIGURED_ENV: &str = "_CONTAINERS_USERNS_CONFIGURED";

/// Environment variable naming a translator configuration file.
pub const CONFIG_ENV: &str = "MAGIKSPEC_CONFIG";

/// Container GID owning pseudo-terminals (`tty` group).
pub const TTY_GID: u32 = 5;

/// Device subdirectories that are never mirrored into privileged containers.
///
/// These are either mounted separately (`pts`, `shm`, `mqueue`) or are
/// per-process views (`fd`).
pub const SKIPPED_DEVICE_DIRS: &[&str] = &["pts", "shm", "fd", "mqueue"];

/// Device nodes that are never mirrored into privileged containers.
pub const SKIPPED_DEVICE_NODES: &[&str] = &["console"];

// =============================================================================
// Runtime Marker
// =============================================================================

/// Environment variable identifying the runtime implementation.
pub const RUNTIME_MARKER_ENV: &str = "container";

/// Value of [`RUNTIME_MARKER_ENV`].
pub const RUNTIME_MARKER_VALUE: &str = "magikrun";

// =============================================================================
// Annotations
// =============================================================================

/// Annotation recording whether the container is removed on exit.
pub const ANNOTATION_AUTOREMOVE: &str = "io.podman.annotations.autoremove";

/// Annotation listing containers whose volumes are shared.
pub const ANNOTATION_VOLUMES_FROM: &str = "io.podman.annotations.volumes-from";

/// Annotation recording whether the container is privileged.
pub const ANNOTATION_PRIVILEGED: &str = "io.podman.annotations.privileged";

/// Annotation value for true.
pub const ANNOTATION_TRUE: &str = "TRUE";

/// Annotation value for false.
pub const ANNOTATION_FALSE: &str = "FALSE";

// =============================================================================
// Mount Types
// =============================================================================

/// Bind mount type.
pub const MOUNT_TYPE_BIND: &str = "bind";

/// tmpfs mount type.
pub const MOUNT_TYPE_TMPFS: &str = "tmpfs";

/// Mount types the runtime knows how to perform.
pub const SUPPORTED_MOUNT_TYPES: &[&str] = &[
    "bind", "tmpfs", "proc", "sysfs", "devpts", "mqueue", "cgroup", "cgroup2", "overlay", "none",
];

// =============================================================================
// Mount Options
// =============================================================================

/// Options of a real sysfs mount for privileged containers.
pub const SYSFS_RW_OPTIONS: &[&str] = &["rprivate", "nosuid", "noexec", "nodev", "rw"];

/// Options of a host `/sys` bind mount, before the access mode.
pub const SYS_BIND_OPTIONS: &[&str] = &["rprivate", "nosuid", "noexec", "nodev"];

/// Options of a devpts mount that does not assign `gid=5`.
pub const DEVPTS_NO_GID_OPTIONS: &[&str] = &[
    "rprivate",
    "nosuid",
    "noexec",
    "newinstance",
    "ptmxmode=0666",
    "mode=0620",
];

/// Options of a host `/dev/mqueue` bind mount.
pub const MQUEUE_BIND_OPTIONS: &[&str] = &["bind", "nosuid", "noexec", "nodev"];

/// Options of a host `/proc` bind mount.
pub const PROC_BIND_OPTIONS: &[&str] = &["rbind", "nosuid", "noexec", "nodev"];

/// Options of the cgroup mount, before the access mode.
pub const CGROUP_OPTIONS: &[&str] = &["rprivate", "nosuid", "noexec", "nodev", "relatime"];

/// Propagation modes accepted on bind and tmpfs mounts.
pub const PROPAGATION_OPTIONS: &[&str] = &[
    "private",
    "rprivate",
    "shared",
    "rshared",
    "slave",
    "rslave",
    "unbindable",
    "runbindable",
];

// =============================================================================
// Kernel Filesystem Blocking
// =============================================================================

/// Paths hidden from unprivileged containers.
///
/// **Security**: These expose host hardware, kernel memory, keyrings and
/// scheduler internals that allow information leaks or host tampering.
pub const MASKED_PATHS: &[&str] = &[
    "/proc/acpi",
    "/proc/kcore",
    "/proc/keys",
    "/proc/latency_stats",
    "/proc/timer_list",
    "/proc/timer_stats",
    "/proc/sched_debug",
    "/proc/scsi",
    "/sys/firmware",
    "/sys/fs/selinux",
    "/sys/dev",
];

/// Paths made read-only for unprivileged containers.
///
/// **Security**: Writes here reconfigure the host kernel (sysctls, IRQ
/// affinity, magic SysRq).
pub const READONLY_PATHS: &[&str] = &[
    "/proc/asound",
    "/proc/bus",
    "/proc/fs",
    "/proc/irq",
    "/proc/sys",
    "/proc/sysrq-trigger",
];

/// Path masked when an unprivileged rootless container binds host `/sys`.
pub const SYS_KERNEL_PATH: &str = "/sys/kernel";

// =============================================================================
// Capabilities
// =============================================================================

/// Capabilities granted to unprivileged containers.
pub const DEFAULT_CAPABILITIES: &[&str] = &[
    "CAP_AUDIT_WRITE",
    "CAP_CHOWN",
    "CAP_DAC_OVERRIDE",
    "CAP_FOWNER",
    "CAP_FSETID",
    "CAP_KILL",
    "CAP_MKNOD",
    "CAP_NET_BIND_SERVICE",
    "CAP_NET_RAW",
    "CAP_SETFCAP",
    "CAP_SETGID",
    "CAP_SETPCAP",
    "CAP_SETUID",
    "CAP_SYS_CHROOT",
];

/// Every capability known to this crate, granted to privileged containers.
pub const ALL_CAPABILITIES: &[&str] = &[
    "CAP_AUDIT_CONTROL",
    "CAP_AUDIT_READ",
    "CAP_AUDIT_WRITE",
    "CAP_BLOCK_SUSPEND",
    "CAP_BPF",
    "CAP_CHECKPOINT_RESTORE",
    "CAP_CHOWN",
    "CAP_DAC_OVERRIDE",
    "CAP_DAC_READ_SEARCH",
    "CAP_FOWNER",
    "CAP_FSETID",
    "CAP_IPC_LOCK",
    "CAP_IPC_OWNER",
    "CAP_KILL",
    "CAP_LEASE",
    "CAP_LINUX_IMMUTABLE",
    "CAP_MAC_ADMIN",
    "CAP_MAC_OVERRIDE",
    "CAP_MKNOD",
    "CAP_NET_ADMIN",
    "CAP_NET_BIND_SERVICE",
    "CAP_NET_BROADCAST",
    "CAP_NET_RAW",
    "CAP_PERFMON",
    "CAP_SETFCAP",
    "CAP_SETGID",
    "CAP_SETPCAP",
    "CAP_SETUID",
    "CAP_SYS_ADMIN",
    "CAP_SYS_BOOT",
    "CAP_SYS_CHROOT",
    "CAP_SYS_MODULE",
    "CAP_SYS_NICE",
    "CAP_SYS_PACCT",
    "CAP_SYS_PTRACE",
    "CAP_SYS_RAWIO",
    "CAP_SYS_RESOURCE",
    "CAP_SYS_TIME",
    "CAP_SYS_TTY_CONFIG",
    "CAP_SYSLOG",
    "CAP_WAKE_ALARM",
];
