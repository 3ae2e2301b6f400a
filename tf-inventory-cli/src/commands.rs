//! Handlers for the `--list` and `--host` modes.

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Serializer};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tf_inventory::{Inventory, Pipeline};
use tf_inventory_config::{ConfigError, InventoryConfig, Loader};

#[derive(Debug, Error)]
pub enum CliError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
    #[error("failed to encode output: {0}")]
    Json(#[from] serde_json::Error),
}

/// Resolved configuration for one invocation.
pub struct Settings {
    pipeline: Pipeline,
    root: PathBuf,
}

impl Settings {
    /// Layer defaults, an optional user file and the environment. `root` is applied
    /// as an override so it wins over every layer; relative roots are taken from the
    /// working directory.
    pub fn load(config_file: Option<&Path>, root: Option<PathBuf>) -> Result<Self, CliError> {
        let mut loader = Loader::new();
        if let Some(path) = config_file {
            loader = loader.with_file(path);
        }
        loader = loader.with_env();
        if let Some(root) = root {
            let root = std::env::current_dir()?.join(root);
            loader = loader.set_override("discovery.root", root.to_string_lossy().into_owned())?;
        }
        let config = loader.build()?;

        let root = config.resolve_root(&executable_dir());
        tracing::debug!(root = %root.display(), "manifest root");
        Ok(Self::from_config(&config, root))
    }

    fn from_config(config: &InventoryConfig, root: PathBuf) -> Self {
        Self {
            pipeline: config.pipeline(),
            root,
        }
    }

    pub fn inventory(&self) -> Inventory {
        self.pipeline.run(&self.root)
    }
}

/// Directory of the running binary, the anchor for a relative manifest root.
fn executable_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.canonicalize().ok())
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn handle_list_command(settings: &Settings) -> Result<(), CliError> {
    let inventory = settings.inventory();
    write_json(&inventory, io::stdout().lock())
}

/// Unknown hosts print an empty object, as Ansible expects.
pub fn handle_host_command(settings: &Settings, host: &str) -> Result<(), CliError> {
    let inventory = settings.inventory();
    match inventory.host(host) {
        Some(vars) => write_json(vars, io::stdout().lock()),
        None => write_json(&Map::new(), io::stdout().lock()),
    }
}

/// Pretty-print with a four-space indent and a trailing newline.
fn write_json<T: Serialize + ?Sized, W: Write>(value: &T, out: W) -> Result<(), CliError> {
    let mut serializer = Serializer::with_formatter(out, PrettyFormatter::with_indent(b"    "));
    value.serialize(&mut serializer)?;
    let mut out = serializer.into_inner();
    writeln!(out)?;
    out.flush()?;
    Ok(())
}
