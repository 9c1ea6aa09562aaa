//! POSIX rlimit resolution.
//!
//! Declared limits are normalized (`nofile` → `RLIMIT_NOFILE`) and written
//! to the process config. Rooted containers that leave `RLIMIT_NOFILE` or
//! `RLIMIT_NPROC` unset get [`RLIMIT_CEILING`] for both soft and hard
//! limits. Rootless containers keep whatever they inherit, since raising a
//! limit past the caller's own hard limit needs privilege.

use crate::constants::{RLIMIT_CEILING, RLIMIT_NOFILE, RLIMIT_NPROC, RLIMIT_PREFIX};
use crate::generator::SpecGenerator;
use crate::specgen::RlimitSpec;
use tracing::debug;

/// Returns the normalized name of an rlimit kind.
pub fn rlimit_name(kind: &str) -> String {
    format!("{}{}", RLIMIT_PREFIX, kind.to_uppercase())
}

/// Applies declared rlimits.
///
/// `None` clears the rlimit list entirely; an empty list still receives the
/// rooted defaults.
pub fn add_rlimits(declared: Option<&[RlimitSpec]>, rootless: bool, generator: &mut SpecGenerator) {
    let Some(declared) = declared else {
        generator.clear_process_rlimits();
        return;
    };

    let mut nofile_set = false;
    let mut nproc_set = false;

    for rlimit in declared {
        let name = rlimit_name(&rlimit.kind);
        match name.as_str() {
            RLIMIT_NOFILE => nofile_set = true,
            RLIMIT_NPROC => nproc_set = true,
            _ => {}
        }
        generator.add_process_rlimit(&name, rlimit.hard, rlimit.soft);
    }

    if rootless {
        return;
    }

    if !nofile_set {
        debug!("Defaulting {} to {}", RLIMIT_NOFILE, RLIMIT_CEILING);
        generator.add_process_rlimit(RLIMIT_NOFILE, RLIMIT_CEILING, RLIMIT_CEILING);
    }
    if !nproc_set {
        debug!("Defaulting {} to {}", RLIMIT_NPROC, RLIMIT_CEILING);
        generator.add_process_rlimit(RLIMIT_NPROC, RLIMIT_CEILING, RLIMIT_CEILING);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oci::OciRlimit;

    fn rlimits(generator: &SpecGenerator) -> Option<Vec<OciRlimit>> {
        generator.spec().process.rlimits.clone()
    }

    fn find<'a>(list: &'a [OciRlimit], name: &str) -> Option<&'a OciRlimit> {
        list.iter().find(|r| r.rlimit_type == name)
    }

    #[test]
    fn test_rlimit_name() {
        assert_eq!(rlimit_name("nofile"), "RLIMIT_NOFILE");
        assert_eq!(rlimit_name("Core"), "RLIMIT_CORE");
        assert_eq!(rlimit_name(""), "RLIMIT_");
    }

    #[test]
    fn test_unset_clears_rlimits() {
        for rootless in [false, true] {
            let mut generator = SpecGenerator::new();
            add_rlimits(None, rootless, &mut generator);
            assert_eq!(rlimits(&generator), None);
        }
    }

    #[test]
    fn test_rooted_empty_list_gets_ceiling() {
        let mut generator = SpecGenerator::new();
        add_rlimits(Some(&[]), false, &mut generator);

        let list = rlimits(&generator).unwrap();
        let nofile = find(&list, RLIMIT_NOFILE).unwrap();
        assert_eq!((nofile.soft, nofile.hard), (RLIMIT_CEILING, RLIMIT_CEILING));
        let nproc = find(&list, RLIMIT_NPROC).unwrap();
        assert_eq!((nproc.soft, nproc.hard), (RLIMIT_CEILING, RLIMIT_CEILING));
    }

    #[test]
    fn test_declared_nofile_is_kept() {
        let mut generator = SpecGenerator::new();
        let declared = [RlimitSpec::new("nofile", 512, 2048)];
        add_rlimits(Some(&declared), false, &mut generator);

        let list = rlimits(&generator).unwrap();
        let nofile = find(&list, RLIMIT_NOFILE).unwrap();
        assert_eq!((nofile.soft, nofile.hard), (512, 2048));
        assert_eq!(find(&list, RLIMIT_NPROC).unwrap().hard, RLIMIT_CEILING);
    }

    #[test]
    fn test_rootless_gets_no_ceiling() {
        let mut generator = SpecGenerator::new();
        let declared = [RlimitSpec::new("core", 0, 0)];
        add_rlimits(Some(&declared), true, &mut generator);

        let list = rlimits(&generator).unwrap();
        assert!(list.iter().all(|r| r.hard != RLIMIT_CEILING));
        assert!(find(&list, RLIMIT_NPROC).is_none());
        assert!(find(&list, "RLIMIT_CORE").is_some());
    }
}
