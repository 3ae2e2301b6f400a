//! End-to-end scans over manifest trees written to a temporary directory.

use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tf_inventory::{HierarchyRules, Pipeline, TreeWalker};

fn write_manifest(root: &Path, module: &str, manifest: Value) {
    let dir = root.join(module);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("manifest.json"), manifest.to_string()).unwrap();
}

fn k3s_pipeline() -> Pipeline {
    Pipeline::new(
        TreeWalker::default(),
        HierarchyRules::new().with_parent("k3s_cluster", ["vyom_control_plane", "vyom_workers"]),
    )
}

fn samsara_tree() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("samsara/terraform");
    write_manifest(
        &root,
        "kshitiz",
        json!({"kshitiz_lighthouse": {"hosts": [
            {"name": "kshitiz-lighthouse", "ansible_host": "13.214.253.51"}
        ]}}),
    );
    write_manifest(
        &root,
        "vyom",
        json!({
            "vyom_control_plane": {"hosts": [
                {"name": "vyom-master-01", "ansible_host": "192.168.68.201"}
            ]},
            "vyom_workers": {"hosts": [
                {"name": "vyom-worker-01", "ansible_host": "192.168.68.202"}
            ]}
        }),
    );
    dir
}

#[test]
fn two_modules_fold_into_cluster_inventory() {
    let dir = samsara_tree();
    let inventory = k3s_pipeline().run(&dir.path().join("samsara/terraform"));

    assert_eq!(
        serde_json::to_value(&inventory).unwrap(),
        json!({
            "_meta": {"hostvars": {
                "kshitiz-lighthouse": {
                    "name": "kshitiz-lighthouse",
                    "ansible_host": "13.214.253.51",
                    "inventory_nebula_ip": "10.42.1.51"
                },
                "vyom-master-01": {
                    "name": "vyom-master-01",
                    "ansible_host": "192.168.68.201",
                    "inventory_nebula_ip": "10.42.1.201"
                },
                "vyom-worker-01": {
                    "name": "vyom-worker-01",
                    "ansible_host": "192.168.68.202",
                    "inventory_nebula_ip": "10.42.1.202"
                }
            }},
            "all": {"children": ["k3s_cluster", "kshitiz_lighthouse"]},
            "k3s_cluster": {"children": ["vyom_control_plane", "vyom_workers"]},
            "kshitiz_lighthouse": {"hosts": ["kshitiz-lighthouse"]},
            "vyom_control_plane": {"hosts": ["vyom-master-01"]},
            "vyom_workers": {"hosts": ["vyom-worker-01"]}
        })
    );
}

#[test]
fn walk_without_rules_keeps_groups_flat() {
    let dir = samsara_tree();
    let inventory = TreeWalker::default().walk(&dir.path().join("samsara/terraform"));
    assert_eq!(
        inventory.all_children().iter().collect::<Vec<_>>(),
        vec!["kshitiz_lighthouse", "vyom_control_plane", "vyom_workers"]
    );
}

#[test]
fn missing_root_is_an_empty_inventory() {
    let dir = tempfile::tempdir().unwrap();
    let inventory = k3s_pipeline().run(&dir.path().join("no/such/dir"));
    assert_eq!(
        serde_json::to_value(&inventory).unwrap(),
        json!({"_meta": {"hostvars": {}}, "all": {"children": []}})
    );
}

#[test]
fn broken_and_empty_manifests_contribute_nothing() {
    let dir = samsara_tree();
    let root = dir.path().join("samsara/terraform");
    write_manifest(&root, "empty", json!({}));
    fs::create_dir_all(root.join("broken")).unwrap();
    fs::write(root.join("broken/manifest.json"), "{ not json").unwrap();

    let with_noise = k3s_pipeline().run(&root);

    let clean = samsara_tree();
    let without_noise = k3s_pipeline().run(&clean.path().join("samsara/terraform"));
    assert_eq!(with_noise, without_noise);
}

#[test]
fn deeply_nested_manifests_are_found() {
    let dir = tempfile::tempdir().unwrap();
    write_manifest(
        dir.path(),
        "envs/prod/eu/db",
        json!({"db": {"hosts": [{"name": "db-01", "role": "primary", "port": 5432}]}}),
    );

    let inventory = TreeWalker::default().walk(dir.path());
    let host = inventory.host("db-01").unwrap();
    assert_eq!(host.extra["role"], json!("primary"));
    assert_eq!(host.extra["port"], json!(5432));
    assert_eq!(host.inventory_nebula_ip, None);
}

#[test]
fn nameless_hosts_never_appear() {
    let dir = tempfile::tempdir().unwrap();
    write_manifest(
        dir.path(),
        "m",
        json!({"g": {"hosts": [{"ansible_host": "10.1.1.1"}, {"name": "ok"}]}}),
    );

    let inventory = TreeWalker::default().walk(dir.path());
    let rendered = serde_json::to_string(&inventory).unwrap();
    assert!(!rendered.contains("10.1.1.1"));
    assert_eq!(inventory.hostvars().len(), 1);
}

#[test]
fn host_conflicts_resolve_in_file_name_order() {
    let dir = tempfile::tempdir().unwrap();
    write_manifest(
        dir.path(),
        "a",
        json!({"g1": {"hosts": [{"name": "shared", "source": "a"}]}}),
    );
    write_manifest(
        dir.path(),
        "b",
        json!({"g2": {"hosts": [{"name": "shared", "source": "b"}]}}),
    );

    let inventory = TreeWalker::default().walk(dir.path());
    assert_eq!(inventory.host("shared").unwrap().extra["source"], json!("b"));
    assert!(inventory.group("g1").unwrap().members().contains("shared"));
    assert!(inventory.group("g2").unwrap().members().contains("shared"));
}
