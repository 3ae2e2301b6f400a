//! # tf-inventory
//!
//! Builds an Ansible dynamic inventory out of the `manifest.json` files Terraform
//! modules leave in their directories.
//!
//! The pipeline has four steps, each usable on its own:
//!
//! - [`walker`] finds every manifest below a root directory
//! - [`manifest`] turns one manifest into an inventory fragment
//! - [`merge`] folds fragments together
//! - [`hierarchy`] moves configured groups under synthetic parent groups
//!
//! [`Pipeline`] runs them in sequence. No step is fatal: unreadable manifests and a
//! missing root simply contribute nothing.

pub mod hierarchy;
pub mod inventory;
pub mod manifest;
pub mod merge;
pub mod pipeline;
pub mod walker;

pub use hierarchy::{build_hierarchy, HierarchyRules};
pub use inventory::{Group, HostVars, Inventory};
pub use manifest::{AddressRule, ManifestError, ManifestParser};
pub use merge::{merge, merge_all};
pub use pipeline::Pipeline;
pub use walker::{TreeWalker, WalkOptions};
