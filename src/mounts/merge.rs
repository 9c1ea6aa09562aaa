//! User mount precedence.

use super::{MountTable, clean_path};
use crate::oci::OciMount;
use tracing::debug;

/// Merges user mounts over generator mounts by destination.
///
/// A user mount takes the place of the generator mount at its destination;
/// among user mounts the last one for a destination wins. User mounts with
/// no generator counterpart follow. A user-provided `/dev` also hides every
/// generator mount below `/dev/`.
///
/// The result is ordered parent before child, since runtimes mount entries
/// in list order and a later parent would cover an earlier child.
pub fn supersede_user_mounts(user: &[OciMount], generated: &MountTable) -> MountTable {
    let overrides: MountTable = user.iter().cloned().collect();
    let user_dev = overrides.contains("/dev");

    let mut merged = MountTable::new();
    for mount in generated.iter() {
        if let Some(replacement) = overrides.get(&mount.destination) {
            merged.insert(replacement.clone());
            continue;
        }
        if user_dev && clean_path(&mount.destination).starts_with("/dev/") {
            debug!("Dropping {} below user-provided /dev", mount.destination);
            continue;
        }
        merged.insert(mount.clone());
    }
    merged.extend(overrides.into_vec());

    merged.sort_by_depth();
    merged
}
