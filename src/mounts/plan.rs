//! Kernel filesystem mount decisions.
//!
//! Decides how `/sys`, `/sys/fs/cgroup`, `/dev/pts`, `/dev/mqueue` and
//! `/proc` are provided. The decision is a pure function of the
//! [`ExecutionContext`] and the namespace sharing of the specification, so
//! it can be evaluated without a generator.
//!
//! | Condition                           | `/sys`                      | cgroup  |
//! |-------------------------------------|-----------------------------|---------|
//! | privileged, sysfs mountable         | sysfs, `rw`                 | `rw`    |
//! | sysfs not mountable                 | bind of host `/sys`         | none    |
//! | unprivileged, sysfs mountable       | generator default (`ro`)    | `ro`    |
//!
//! Privilege never overrides an unmountable sysfs: a privileged container
//! in a user namespace sharing the host network still gets the bind mount.

use crate::constants::{
    CGROUP_OPTIONS, DEVPTS_NO_GID_OPTIONS, MOUNT_TYPE_BIND, MQUEUE_BIND_OPTIONS, PROC_BIND_OPTIONS,
    SYS_BIND_OPTIONS, SYS_KERNEL_PATH, SYSFS_RW_OPTIONS,
};
use crate::context::ExecutionContext;
use crate::generator::SpecGenerator;
use crate::oci::OciMount;
use crate::specgen::ContainerSpec;
use tracing::{debug, warn};

/// Mounts that replace or extend the generator defaults.
///
/// `None` leaves the generator's mount at that destination untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MountPlan {
    pub sys: Option<OciMount>,
    pub cgroup: Option<OciMount>,
    pub dev_pts: Option<OciMount>,
    pub mqueue: Option<OciMount>,
    pub proc: Option<OciMount>,
    pub masked_paths: Vec<String>,
}

/// Evaluates the mount decision table.
pub fn plan_mounts(ctx: &ExecutionContext, spec: &ContainerSpec) -> MountPlan {
    let mut plan = MountPlan::default();
    let privileged = spec.privileged;

    let cgroup_perm = if privileged && ctx.can_mount_sysfs {
        plan.sys = Some(OciMount::new("/sys", "sysfs", "sysfs", SYSFS_RW_OPTIONS));
        Some("rw")
    } else if !ctx.can_mount_sysfs {
        warn!("Cannot mount sysfs from a user namespace sharing the host network, binding /sys");
        let mut sys = OciMount::new("/sys", MOUNT_TYPE_BIND, "/sys", SYS_BIND_OPTIONS);
        sys.options
            .push(if privileged { "rw" } else { "ro" }.to_string());
        sys.options.push("rbind".to_string());
        plan.sys = Some(sys);

        if !privileged && ctx.rootless {
            plan.masked_paths.push(SYS_KERNEL_PATH.to_string());
        }
        None
    } else {
        Some("ro")
    };

    if !ctx.gid5_available {
        plan.dev_pts = Some(OciMount::new(
            "/dev/pts",
            "devpts",
            "devpts",
            DEVPTS_NO_GID_OPTIONS,
        ));
    }

    if ctx.in_user_namespace && spec.ipc_ns.is_host() {
        plan.mqueue = Some(OciMount::new(
            "/dev/mqueue",
            MOUNT_TYPE_BIND,
            "/dev/mqueue",
            MQUEUE_BIND_OPTIONS,
        ));
    }

    if ctx.in_user_namespace && spec.pid_ns.is_host() {
        plan.proc = Some(OciMount::new(
            "/proc",
            MOUNT_TYPE_BIND,
            "/proc",
            PROC_BIND_OPTIONS,
        ));
    }

    if let Some(perm) = cgroup_perm {
        let mut cgroup = OciMount::new("/sys/fs/cgroup", "cgroup", "cgroup", CGROUP_OPTIONS);
        cgroup.options.push(perm.to_string());
        plan.cgroup = Some(cgroup);
    }

    plan
}

impl MountPlan {
    /// Writes the planned mounts and masked paths into the generator.
    pub fn apply(self, generator: &mut SpecGenerator) {
        let mounts = [self.sys, self.dev_pts, self.mqueue, self.proc, self.cgroup];
        for mount in mounts.into_iter().flatten() {
            debug!(
                "Mounting {} as {} from {}",
                mount.destination, mount.mount_type, mount.source
            );
            generator.add_mount(mount);
        }
        for path in &self.masked_paths {
            generator.add_linux_masked_path(path);
        }
    }
}
