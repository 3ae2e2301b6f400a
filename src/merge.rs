//! Fragment merging
//!
//! Group membership merges by set union, host variables by whole-record overwrite
//! with the incoming side winning. Merging the same fragment twice is a no-op.

use crate::inventory::{is_reserved_group, Inventory};
use std::collections::btree_map::Entry;
use tracing::warn;

/// Merge `incoming` into `base` and return the result.
pub fn merge(mut base: Inventory, incoming: Inventory) -> Inventory {
    let Inventory {
        hostvars,
        groups,
        children,
    } = incoming;

    base.children.extend(children);
    base.hostvars.extend(hostvars);

    for (name, group) in groups {
        if is_reserved_group(&name) {
            continue;
        }
        match base.groups.entry(name) {
            Entry::Vacant(slot) => {
                slot.insert(group);
            }
            Entry::Occupied(mut slot) => {
                if !slot.get_mut().absorb(group) {
                    warn!(
                        group = %slot.key(),
                        "group switched between hosts and children, keeping the later record"
                    );
                }
            }
        }
    }

    base
}

/// Fold fragments, in order, into one inventory starting from an empty one.
pub fn merge_all<I>(fragments: I) -> Inventory
where
    I: IntoIterator<Item = Inventory>,
{
    fragments.into_iter().fold(Inventory::new(), merge)
}
