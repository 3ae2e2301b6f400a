//! Manifest discovery
//!
//! Walks a directory tree, parses every manifest found and folds the fragments into
//! one inventory. Entries are visited sorted by file name so the order (and with it
//! which manifest wins a host-variable conflict) is stable for a given tree.

use crate::inventory::Inventory;
use crate::manifest::ManifestParser;
use crate::merge::merge_all;
use ignore::WalkBuilder;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const DEFAULT_MANIFEST_NAME: &str = "manifest.json";

/// Which files count as manifests and how links are treated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkOptions {
    pub manifest_name: String,
    pub follow_links: bool,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            manifest_name: DEFAULT_MANIFEST_NAME.to_string(),
            follow_links: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TreeWalker {
    parser: ManifestParser,
    options: WalkOptions,
}

impl TreeWalker {
    pub fn new(parser: ManifestParser, options: WalkOptions) -> Self {
        Self { parser, options }
    }

    pub fn options(&self) -> &WalkOptions {
        &self.options
    }

    /// Every manifest path under `root`, in traversal order.
    ///
    /// Hidden directories and ignore files are not honoured: Terraform module
    /// directories are frequently gitignored and must still be searched.
    /// `follow_links` only decides whether symlinked directories are descended;
    /// a manifest that is itself a symlink to a file is always picked up.
    pub fn discover(&self, root: &Path) -> Vec<PathBuf> {
        if !root.is_dir() {
            debug!(root = %root.display(), "manifest root is not a directory");
            return Vec::new();
        }

        let manifest_name = OsStr::new(&self.options.manifest_name);
        WalkBuilder::new(root)
            .standard_filters(false)
            .follow_links(self.options.follow_links)
            .sort_by_file_name(|a, b| a.cmp(b))
            .build()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(err) => {
                    warn!(error = %err, "skipping unreadable directory entry");
                    None
                }
            })
            .filter(|entry| entry.file_name() == manifest_name)
            .filter(|entry| match entry.file_type() {
                Some(kind) if kind.is_symlink() => entry.path().is_file(),
                Some(kind) => kind.is_file(),
                None => false,
            })
            .map(|entry| entry.into_path())
            .collect()
    }

    /// Parse and merge every manifest under `root`. A missing root yields an empty
    /// inventory.
    pub fn walk(&self, root: &Path) -> Inventory {
        let manifests = self.discover(root);
        let fragments = manifests.iter().filter_map(|path| {
            let fragment = self.parser.load(path)?;
            debug!(path = %path.display(), groups = fragment.groups.len(), "merging manifest");
            Some(fragment)
        });
        let inventory = merge_all(fragments);

        info!(
            root = %root.display(),
            manifests = manifests.len(),
            groups = inventory.groups.len(),
            hosts = inventory.hostvars.len(),
            "manifest scan complete"
        );
        inventory
    }
}
