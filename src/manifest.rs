//! Manifest parsing
//!
//! A manifest is the `manifest.json` a Terraform module writes next to its state:
//!
//! ```text
//! { "group": { "hosts": [ { "name": "...", "ansible_host": "...", ... } ] } }
//! ```
//!
//! Each manifest becomes one inventory fragment. Anything that keeps a manifest from
//! producing a fragment is reported as a [`ManifestError`]; [`ManifestParser::load`]
//! collapses those into `None` because a bad manifest must never abort a scan.

use crate::inventory::{is_reserved_group, HostVars, Inventory};
use serde_json::{Map, Value};
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

/// Reasons a manifest yields no fragment.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest: {0}")]
    Io(#[from] io::Error),
    #[error("manifest is not valid JSON: {0}")]
    Syntax(#[from] serde_json::Error),
    #[error("manifest top level is not an object")]
    NotAnObject,
    #[error("manifest declares no groups")]
    Empty,
}

impl ManifestError {
    /// Missing or empty manifests are routine; everything else deserves a warning.
    pub fn is_routine(&self) -> bool {
        match self {
            ManifestError::Io(err) => err.kind() == io::ErrorKind::NotFound,
            ManifestError::Empty => true,
            ManifestError::Syntax(_) | ManifestError::NotAnObject => false,
        }
    }
}

/// Synthesizes the overlay network address of a host from its `ansible_host`.
///
/// The last octet of the host's IPv4 address is appended to a fixed three-octet
/// prefix, so `192.168.68.201` becomes `10.42.1.201` with the default prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressRule {
    prefix: String,
}

impl AddressRule {
    pub const DEFAULT_PREFIX: &'static str = "10.42.1.";

    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns `None` unless `address` is four dot-separated numbers in 0..=255.
    /// Zero-padded octets such as `068` are accepted.
    pub fn derive(&self, address: &str) -> Option<String> {
        let octets: Vec<&str> = address.trim().split('.').collect();
        if octets.len() != 4 {
            return None;
        }
        let mut last = 0u8;
        for octet in octets {
            if octet.is_empty() || !octet.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            last = octet.parse().ok()?;
        }
        Some(format!("{}{}", self.prefix, last))
    }
}

impl Default for AddressRule {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PREFIX)
    }
}

/// Converts manifests into inventory fragments.
#[derive(Debug, Clone, Default)]
pub struct ManifestParser {
    address: AddressRule,
}

impl ManifestParser {
    pub fn new(address: AddressRule) -> Self {
        Self { address }
    }

    pub fn address_rule(&self) -> &AddressRule {
        &self.address
    }

    /// Read and parse the manifest at `path`, treating every failure as "nothing here".
    pub fn load(&self, path: &Path) -> Option<Inventory> {
        match self.read(path) {
            Ok(fragment) => Some(fragment),
            Err(err) if err.is_routine() => {
                debug!(path = %path.display(), reason = %err, "manifest skipped");
                None
            }
            Err(err) => {
                warn!(path = %path.display(), reason = %err, "manifest skipped");
                None
            }
        }
    }

    pub fn read(&self, path: &Path) -> Result<Inventory, ManifestError> {
        let source = fs::read_to_string(path)?;
        self.parse_str(&source)
    }

    pub fn parse_str(&self, source: &str) -> Result<Inventory, ManifestError> {
        let document: Value = serde_json::from_str(source)?;
        self.parse_value(document)
    }

    pub fn parse_value(&self, document: Value) -> Result<Inventory, ManifestError> {
        let Value::Object(groups) = document else {
            return Err(ManifestError::NotAnObject);
        };

        let mut fragment = Inventory::new();
        for (group_name, group_data) in groups {
            if is_reserved_group(&group_name) {
                warn!(group = %group_name, "reserved group name in manifest, skipping");
                continue;
            }
            fragment.declare_group(group_name.as_str());

            for entry in host_entries(group_data) {
                // Entries without a name are dropped without comment.
                let Some(host) = HostVars::from_entry(entry) else {
                    continue;
                };
                fragment.add_host(&group_name, self.with_derived_address(host));
            }
        }

        if fragment.groups.is_empty() {
            return Err(ManifestError::Empty);
        }
        Ok(fragment)
    }

    fn with_derived_address(&self, mut host: HostVars) -> HostVars {
        if let Some(address) = host.ansible_host.as_deref() {
            match self.address.derive(address) {
                Some(derived) => {
                    host.extra.remove("inventory_nebula_ip");
                    host.inventory_nebula_ip = Some(derived);
                }
                None => {
                    debug!(host = %host.name, address, "ansible_host is not an IPv4 address")
                }
            }
        }
        host
    }
}

fn host_entries(group: Value) -> impl Iterator<Item = Map<String, Value>> {
    let hosts = match group {
        Value::Object(mut body) => match body.remove("hosts") {
            Some(Value::Array(hosts)) => hosts,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };
    hosts.into_iter().filter_map(|entry| match entry {
        Value::Object(entry) => Some(entry),
        _ => None,
    })
}
