//! Tests for mount planning and merging.
//!
//! Enumerates the full flag space of the mount decision table and checks
//! destination uniqueness of merged mount tables with proptest.

use magikspec::mounts::{MountTable, plan_mounts, supersede_user_mounts};
use magikspec::{ContainerSpec, ExecutionContext, OciMount, SpecGenerator};
use proptest::prelude::*;
use std::collections::HashSet;

// =============================================================================
// Decision Table Tests
// =============================================================================

#[test]
fn test_decision_table_all_combinations() {
    for privileged in [false, true] {
        for in_user_namespace in [false, true] {
            for can_mount_sysfs in [false, true] {
                let ctx = ExecutionContext {
                    rootless: false,
                    in_user_namespace,
                    can_mount_sysfs,
                    gid5_available: true,
                };
                let spec = ContainerSpec {
                    privileged,
                    ..Default::default()
                };
                let plan = plan_mounts(&ctx, &spec);

                match (privileged, can_mount_sysfs) {
                    (true, true) => {
                        let sys = plan.sys.as_ref().unwrap();
                        assert_eq!(sys.mount_type, "sysfs");
                        assert!(sys.has_option("rw"));
                        assert!(plan.cgroup.as_ref().unwrap().has_option("rw"));
                    }
                    (_, false) => {
                        let sys = plan.sys.as_ref().unwrap();
                        assert_eq!(sys.mount_type, "bind");
                        assert!(sys.has_option("rbind"));
                        assert!(sys.has_option(if privileged { "rw" } else { "ro" }));
                        assert!(plan.cgroup.is_none());
                    }
                    (false, true) => {
                        assert!(plan.sys.is_none());
                        assert!(plan.cgroup.as_ref().unwrap().has_option("ro"));
                    }
                }

                assert!(plan.dev_pts.is_none());
                // Namespaces are private by default, so no host binds.
                assert!(plan.proc.is_none());
                assert!(plan.mqueue.is_none());
            }
        }
    }
}

#[test]
fn test_plan_apply_replaces_defaults() {
    let ctx = ExecutionContext {
        rootless: true,
        in_user_namespace: true,
        can_mount_sysfs: false,
        gid5_available: false,
    };
    let mut generator = SpecGenerator::new();
    plan_mounts(&ctx, &ContainerSpec::default()).apply(&mut generator);

    assert_eq!(generator.mount("/sys").unwrap().mount_type, "bind");
    assert!(!generator.mount("/dev/pts").unwrap().has_option("gid=5"));
    assert!(generator.mount("/sys/fs/cgroup").is_none());
    let masked = &generator.spec().linux.as_ref().unwrap().masked_paths;
    assert_eq!(masked, &vec!["/sys/kernel".to_string()]);
}

// =============================================================================
// Merge Property Tests
// =============================================================================

fn destination() -> impl Strategy<Value = String> {
    prop::sample::select(vec![
        "/proc", "/dev", "/dev/pts", "/dev/shm", "/sys", "/data", "/data/", "/etc/hosts", "/tmp",
    ])
    .prop_map(str::to_string)
}

fn mounts(source: &'static str) -> impl Strategy<Value = Vec<OciMount>> {
    prop::collection::vec(destination(), 0..12).prop_map(move |dests| {
        dests
            .iter()
            .map(|d| OciMount::new(d, "bind", source, &[]))
            .collect()
    })
}

proptest! {
    /// Property: merged tables hold one entry per destination, every user
    /// destination is served by a user mount, and parents precede children.
    #[test]
    fn prop_merge_unique_and_user_wins(user in mounts("user"), generated in mounts("generated")) {
        let generated: MountTable = generated.into_iter().collect();
        let merged = supersede_user_mounts(&user, &generated);

        let mut seen = HashSet::new();
        for mount in merged.iter() {
            let key = magikspec::mounts::clean_path(&mount.destination);
            prop_assert!(seen.insert(key), "duplicate destination {}", mount.destination);
        }

        for mount in &user {
            let entry = merged.get(&mount.destination).unwrap();
            prop_assert_eq!(entry.source.as_str(), "user");
        }

        let depths: Vec<usize> = merged
            .iter()
            .map(|m| magikspec::mounts::path_depth(&m.destination))
            .collect();
        prop_assert!(depths.windows(2).all(|w| w[0] <= w[1]), "unordered depths {:?}", depths);
    }
}
