//! Parent group synthesis
//!
//! Terraform modules only know about flat groups. [`HierarchyRules`] describe which
//! of those groups belong under a synthetic parent (for example both k3s node groups
//! under one cluster group) and [`build_hierarchy`] applies them after merging.

use crate::inventory::{is_reserved_group, Group, Inventory};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Parent group name to the child groups it should contain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HierarchyRules {
    parents: BTreeMap<String, Vec<String>>,
}

impl HierarchyRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parent<I, S>(mut self, parent: impl Into<String>, children: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert(parent, children);
        self
    }

    /// Set the children of `parent`, replacing an earlier rule for it.
    pub fn insert<I, S>(&mut self, parent: impl Into<String>, children: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parents
            .insert(parent.into(), children.into_iter().map(Into::into).collect());
    }

    pub fn children_of(&self, parent: &str) -> Option<&[String]> {
        self.parents.get(parent).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.parents
            .iter()
            .map(|(parent, children)| (parent.as_str(), children.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn len(&self) -> usize {
        self.parents.len()
    }
}

/// Fold configured child groups under their parents.
///
/// For every rule with at least one child among the top-level groups, the parent
/// becomes a children-only group listing those children, joins `all.children`,
/// and the children leave it. Rules apply in parent-name order, so a child named
/// by two rules ends up under the first parent only.
pub fn build_hierarchy(mut inventory: Inventory, rules: &HierarchyRules) -> Inventory {
    for (parent, children) in rules.iter() {
        if is_reserved_group(parent) {
            warn!(parent, "reserved name cannot be a parent group");
            continue;
        }

        let present: BTreeSet<String> = children
            .iter()
            .filter(|child| child.as_str() != parent)
            .filter(|child| inventory.children.contains(child.as_str()))
            .cloned()
            .collect();
        if present.is_empty() {
            debug!(parent, "no child groups present, rule not applied");
            continue;
        }

        if let Some(Group::Hosts(hosts)) = inventory.groups.get(parent) {
            warn!(parent, hosts = hosts.len(), "replacing host group with parent group");
        }

        for child in &present {
            inventory.children.remove(child);
        }
        inventory.children.insert(parent.to_string());
        inventory
            .groups
            .insert(parent.to_string(), Group::Children(present));
    }
    inventory
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::HostVars;
    use serde_json::json;

    fn k3s_rules() -> HierarchyRules {
        HierarchyRules::new().with_parent("k3s_cluster", ["vyom_control_plane", "vyom_workers"])
    }

    fn inventory_with(groups: &[&str]) -> Inventory {
        let mut inventory = Inventory::new();
        for group in groups {
            inventory.add_host(group, HostVars::new(format!("{}-host", group)));
        }
        inventory
    }

    fn top_level(inventory: &Inventory) -> Vec<&str> {
        inventory.all_children().iter().map(String::as_str).collect()
    }

    #[test]
    fn folds_known_children_under_parent() {
        let folded = build_hierarchy(
            inventory_with(&["vyom_control_plane", "vyom_workers", "other_group"]),
            &k3s_rules(),
        );

        assert_eq!(
            folded.group("k3s_cluster"),
            Some(&Group::parent(["vyom_control_plane", "vyom_workers"]))
        );
        assert_eq!(top_level(&folded), vec!["k3s_cluster", "other_group"]);
        // Children stay addressable as groups.
        assert!(folded.group("vyom_workers").unwrap().is_leaf());
    }

    #[test]
    fn lists_only_present_children() {
        let folded = build_hierarchy(inventory_with(&["vyom_workers"]), &k3s_rules());
        assert_eq!(
            folded.group("k3s_cluster"),
            Some(&Group::parent(["vyom_workers"]))
        );
        assert_eq!(top_level(&folded), vec!["k3s_cluster"]);
    }

    #[test]
    fn absent_children_leave_inventory_untouched() {
        let original = inventory_with(&["other_group"]);
        let folded = build_hierarchy(original.clone(), &k3s_rules());
        assert_eq!(folded, original);
    }

    #[test]
    fn empty_inventory_stays_empty() {
        let folded = build_hierarchy(Inventory::new(), &k3s_rules());
        assert_eq!(
            serde_json::to_value(&folded).unwrap(),
            json!({"_meta": {"hostvars": {}}, "all": {"children": []}})
        );
    }

    #[test]
    fn parent_overwrites_existing_group_of_same_name() {
        let folded = build_hierarchy(
            inventory_with(&["k3s_cluster", "vyom_workers"]),
            &k3s_rules(),
        );
        assert_eq!(
            folded.group("k3s_cluster"),
            Some(&Group::parent(["vyom_workers"]))
        );
        assert_eq!(top_level(&folded), vec!["k3s_cluster"]);
    }

    #[test]
    fn self_reference_is_ignored() {
        let rules = HierarchyRules::new().with_parent("loop", ["loop", "web"]);
        let folded = build_hierarchy(inventory_with(&["loop", "web"]), &rules);
        assert_eq!(folded.group("loop"), Some(&Group::parent(["web"])));
        assert_eq!(top_level(&folded), vec!["loop"]);
    }

    #[test]
    fn reserved_parent_is_skipped() {
        let rules = HierarchyRules::new().with_parent("all", ["web"]);
        let original = inventory_with(&["web"]);
        assert_eq!(build_hierarchy(original.clone(), &rules), original);
    }

    #[test]
    fn shared_child_stays_under_first_parent() {
        let rules = HierarchyRules::new()
            .with_parent("alpha", ["shared"])
            .with_parent("beta", ["shared", "solo"]);
        let folded = build_hierarchy(inventory_with(&["shared", "solo"]), &rules);

        assert_eq!(folded.group("alpha"), Some(&Group::parent(["shared"])));
        assert_eq!(folded.group("beta"), Some(&Group::parent(["solo"])));
        assert_eq!(top_level(&folded), vec!["alpha", "beta"]);
    }

    #[test]
    fn child_already_folded_leaves_later_rule_unapplied() {
        let rules = HierarchyRules::new()
            .with_parent("alpha", ["shared"])
            .with_parent("beta", ["shared"]);
        let folded = build_hierarchy(inventory_with(&["shared"]), &rules);

        assert!(folded.group("beta").is_none());
        assert_eq!(top_level(&folded), vec!["alpha"]);
    }

    #[test]
    fn several_parents_apply_independently() {
        let rules = k3s_rules().with_parent("edge", ["kshitiz_lighthouse"]);
        let folded = build_hierarchy(
            inventory_with(&["kshitiz_lighthouse", "vyom_workers", "misc"]),
            &rules,
        );
        assert_eq!(top_level(&folded), vec!["edge", "k3s_cluster", "misc"]);
        assert_eq!(rules.len(), 2);
    }
}
