//! Inventory document model
//!
//! An [`Inventory`] is the document Ansible expects from a dynamic inventory script:
//!
//! ```text
//! {
//!   "_meta": { "hostvars": { host: { ...vars } } },
//!   "all": { "children": [group, ...] },
//!   group: { "hosts": [host, ...] } | { "children": [group, ...] }
//! }
//! ```
//!
//! Sets are kept in `BTreeSet`s so membership is deduplicated and emitted sorted no
//! matter in which order fragments were merged.

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Name of the implicit root group.
pub const ROOT_GROUP: &str = "all";

/// Key holding per-host variables.
pub const META_KEY: &str = "_meta";

/// Returns true for names that can never be used as a regular group.
pub fn is_reserved_group(name: &str) -> bool {
    name == ROOT_GROUP || name == META_KEY
}

/// A group record: either a leaf holding hosts or a parent holding other groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Group {
    Hosts(BTreeSet<String>),
    Children(BTreeSet<String>),
}

impl Group {
    /// An empty leaf group.
    pub fn leaf() -> Self {
        Group::Hosts(BTreeSet::new())
    }

    pub fn parent<I, S>(children: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Group::Children(children.into_iter().map(Into::into).collect())
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Group::Hosts(_))
    }

    /// Host names for a leaf, child group names for a parent.
    pub fn members(&self) -> &BTreeSet<String> {
        match self {
            Group::Hosts(members) | Group::Children(members) => members,
        }
    }

    pub fn hosts(&self) -> Option<&BTreeSet<String>> {
        match self {
            Group::Hosts(hosts) => Some(hosts),
            Group::Children(_) => None,
        }
    }

    pub fn children(&self) -> Option<&BTreeSet<String>> {
        match self {
            Group::Children(children) => Some(children),
            Group::Hosts(_) => None,
        }
    }

    /// Union `other` into `self`.
    ///
    /// Returns false when the two records are of different kinds; `other` then
    /// replaces `self` outright.
    pub fn absorb(&mut self, other: Group) -> bool {
        match (self, other) {
            (Group::Hosts(ours), Group::Hosts(theirs))
            | (Group::Children(ours), Group::Children(theirs)) => {
                ours.extend(theirs);
                true
            }
            (this, other) => {
                *this = other;
                false
            }
        }
    }
}

/// Variables attached to one host.
///
/// `name`, `ansible_host` and `inventory_nebula_ip` are typed; every other field of
/// the manifest entry lives in `extra` and is emitted unchanged.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostVars {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ansible_host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inventory_nebula_ip: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl HostVars {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ansible_host: None,
            inventory_nebula_ip: None,
            extra: Map::new(),
        }
    }

    pub fn with_ansible_host(mut self, address: impl Into<String>) -> Self {
        self.ansible_host = Some(address.into());
        self
    }

    /// Attach a passthrough field. Use the typed fields for the known keys.
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Build host variables from a raw manifest entry.
    ///
    /// Returns `None` when the entry has no usable `name`. Known keys holding a
    /// non-string value stay in `extra` untouched.
    pub fn from_entry(mut entry: Map<String, Value>) -> Option<Self> {
        let name = match entry.remove("name") {
            Some(Value::String(name)) if !name.is_empty() => name,
            _ => return None,
        };
        let ansible_host = take_string(&mut entry, "ansible_host");
        let inventory_nebula_ip = take_string(&mut entry, "inventory_nebula_ip");
        Some(Self {
            name,
            ansible_host,
            inventory_nebula_ip,
            extra: entry,
        })
    }
}

fn take_string(entry: &mut Map<String, Value>, key: &str) -> Option<String> {
    if !matches!(entry.get(key), Some(Value::String(_))) {
        return None;
    }
    match entry.remove(key) {
        Some(Value::String(value)) => Some(value),
        _ => None,
    }
}

/// The merged inventory, or a fragment of it produced from a single manifest.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inventory {
    pub(crate) hostvars: BTreeMap<String, HostVars>,
    pub(crate) groups: BTreeMap<String, Group>,
    pub(crate) children: BTreeSet<String>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hostvars(&self) -> &BTreeMap<String, HostVars> {
        &self.hostvars
    }

    pub fn host(&self, name: &str) -> Option<&HostVars> {
        self.hostvars.get(name)
    }

    pub fn groups(&self) -> &BTreeMap<String, Group> {
        &self.groups
    }

    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.get(name)
    }

    /// Group names listed under `all.children`.
    pub fn all_children(&self) -> &BTreeSet<String> {
        &self.children
    }

    pub fn is_empty(&self) -> bool {
        self.hostvars.is_empty() && self.groups.is_empty() && self.children.is_empty()
    }

    /// Declare a top-level leaf group. Existing records are left as they are.
    pub fn declare_group(&mut self, name: impl Into<String>) {
        let name = name.into();
        self.groups.entry(name.clone()).or_insert_with(Group::leaf);
        self.children.insert(name);
    }

    /// Add `host` to `group` and register its variables, replacing any earlier
    /// variables for the same host name.
    pub fn add_host(&mut self, group: &str, host: HostVars) {
        if !self.groups.contains_key(group) {
            self.declare_group(group);
        }
        match self.groups.get_mut(group) {
            Some(Group::Hosts(members)) => {
                members.insert(host.name.clone());
            }
            Some(Group::Children(_)) => {
                tracing::warn!(group, host = %host.name, "cannot add a host to a parent group");
            }
            None => {}
        }
        self.hostvars.insert(host.name.clone(), host);
    }
}

#[derive(Serialize)]
struct MetaRef<'a> {
    hostvars: &'a BTreeMap<String, HostVars>,
}

#[derive(Serialize)]
struct RootRef<'a> {
    children: &'a BTreeSet<String>,
}

impl Serialize for Inventory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.groups.len() + 2))?;
        map.serialize_entry(
            META_KEY,
            &MetaRef {
                hostvars: &self.hostvars,
            },
        )?;
        map.serialize_entry(
            ROOT_GROUP,
            &RootRef {
                children: &self.children,
            },
        )?;
        for (name, group) in &self.groups {
            if is_reserved_group(name) {
                continue;
            }
            map.serialize_entry(name, group)?;
        }
        map.end()
    }
}
