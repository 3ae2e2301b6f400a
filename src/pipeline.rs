//! Discovery → parse → merge → hierarchy, as one call.

use crate::hierarchy::{build_hierarchy, HierarchyRules};
use crate::inventory::Inventory;
use crate::walker::TreeWalker;
use std::path::Path;

/// Produces the final inventory for a manifest root.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    walker: TreeWalker,
    rules: HierarchyRules,
}

impl Pipeline {
    pub fn new(walker: TreeWalker, rules: HierarchyRules) -> Self {
        Self { walker, rules }
    }

    pub fn walker(&self) -> &TreeWalker {
        &self.walker
    }

    pub fn rules(&self) -> &HierarchyRules {
        &self.rules
    }

    pub fn run(&self, root: &Path) -> Inventory {
        build_hierarchy(self.walker.walk(root), &self.rules)
    }
}
