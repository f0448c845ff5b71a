//! OCI image configuration building.
//!
//! Derives a child image configuration from a parent by layering settings on
//! top: runtime config overrides and augmentations, appended rootfs diff IDs,
//! and exactly one appended history entry. Output is reproducible: creation
//! timestamps are fixed and all map-backed fields serialize in sorted key
//! order.

use crate::constants::{
    HISTORY_CREATED_BY, IMAGE_ARCHITECTURE, IMAGE_AUTHOR, IMAGE_CREATED, IMAGE_OS, ROOTFS_TYPE,
    SHA256_PREFIX,
};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

// =============================================================================
// Image Configuration Document
// =============================================================================

/// An OCI image configuration document
/// (`application/vnd.oci.image.config.v1+json`), reduced to the fields this
/// tool reads and writes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Image {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default)]
    pub architecture: String,
    #[serde(default)]
    pub os: String,
    #[serde(default)]
    pub config: RuntimeConfig,
    #[serde(default)]
    pub rootfs: RootFs,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<HistoryEntry>,
}

/// Runtime configuration carried inside an image config.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(rename = "User", default, skip_serializing_if = "String::is_empty")]
    pub user: String,
    #[serde(
        rename = "ExposedPorts",
        default,
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub exposed_ports: BTreeMap<String, Empty>,
    #[serde(rename = "Env", default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<String>,
    #[serde(rename = "Entrypoint", default, skip_serializing_if = "Vec::is_empty")]
    pub entrypoint: Vec<String>,
    #[serde(rename = "Cmd", default, skip_serializing_if = "Vec::is_empty")]
    pub cmd: Vec<String>,
    #[serde(
        rename = "Volumes",
        default,
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub volumes: BTreeMap<String, Empty>,
    #[serde(
        rename = "WorkingDir",
        default,
        skip_serializing_if = "String::is_empty"
    )]
    pub working_dir: String,
    #[serde(rename = "Labels", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

/// Root filesystem section: ordered layer diff IDs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RootFs {
    #[serde(rename = "type", default)]
    pub fs_type: String,
    #[serde(default)]
    pub diff_ids: Vec<String>,
}

/// One image history entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub empty_layer: bool,
}

/// Serializes as `{}`, the image spec's "set of strings" convention for
/// port and volume keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Empty {}

// =============================================================================
// Patch Application
// =============================================================================

/// Settings layered onto a parent image configuration.
///
/// Empty collections and `None` fields leave the parent's value untouched;
/// ports, volumes, and labels augment rather than replace.
#[derive(Debug, Clone, Default)]
pub struct ImagePatch {
    /// Layer diff hashes (hex, without algorithm prefix) this image adds,
    /// bottom-most to top-most.
    pub layers: Vec<String>,
    /// Overrides the parent's `User`.
    pub user: Option<String>,
    /// Ports to expose; `80` becomes `80/tcp`.
    pub ports: Vec<String>,
    /// `KEY=value` pairs merged over the parent environment.
    pub env: Vec<String>,
    /// Replaces the parent's `Entrypoint` when non-empty.
    pub entrypoint: Vec<String>,
    /// Replaces the parent's `Cmd` when non-empty.
    pub command: Vec<String>,
    /// Volume paths to add.
    pub volumes: Vec<String>,
    /// Overrides the parent's `WorkingDir`.
    pub working_dir: Option<String>,
    /// `key=value` labels to add.
    pub labels: Vec<String>,
}

impl ImagePatch {
    /// Builds the child image configuration from a parent.
    pub fn apply(&self, parent: Image) -> Image {
        Image {
            created: Some(IMAGE_CREATED.to_string()),
            author: Some(IMAGE_AUTHOR.to_string()),
            architecture: IMAGE_ARCHITECTURE.to_string(),
            os: IMAGE_OS.to_string(),
            config: self.apply_runtime_config(parent.config),
            rootfs: self.apply_rootfs(parent.rootfs),
            history: self.apply_history(parent.history),
        }
    }

    fn apply_runtime_config(&self, mut config: RuntimeConfig) -> RuntimeConfig {
        if let Some(user) = &self.user {
            config.user = user.clone();
        }

        for port in &self.ports {
            // Port specs have the form 80/tcp or 1234/udp; bare ports
            // default to tcp.
            let key = if port.contains('/') {
                port.clone()
            } else {
                format!("{}/tcp", port)
            };
            config.exposed_ports.insert(key, Empty {});
        }

        if !self.env.is_empty() {
            let parent_env = pairs_to_map(&config.env);
            let mut merged = parent_env.clone();
            for pair in &self.env {
                let (key, value) = split_pair(pair);
                merged.insert(key.to_string(), expand(value, &parent_env));
            }
            config.env = merged
                .into_iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
        }

        if !self.entrypoint.is_empty() {
            config.entrypoint = self.entrypoint.clone();
        }
        if !self.command.is_empty() {
            config.cmd = self.command.clone();
        }

        for volume in &self.volumes {
            config.volumes.insert(volume.clone(), Empty {});
        }

        if let Some(dir) = &self.working_dir {
            config.working_dir = dir.clone();
        }

        for label in &self.labels {
            let (key, value) = split_pair(label);
            config.labels.insert(key.to_string(), value.to_string());
        }

        config
    }

    fn apply_rootfs(&self, mut rootfs: RootFs) -> RootFs {
        rootfs.fs_type = ROOTFS_TYPE.to_string();
        // diff_ids are ordered from bottom-most to top-most
        for layer in &self.layers {
            rootfs.diff_ids.push(format!("{}{}", SHA256_PREFIX, layer));
        }
        rootfs
    }

    fn apply_history(&self, mut history: Vec<HistoryEntry>) -> Vec<HistoryEntry> {
        // docker only allows the child one more history entry than the parent
        history.push(HistoryEntry {
            created: Some(IMAGE_CREATED.to_string()),
            created_by: Some(HISTORY_CREATED_BY.to_string()),
            author: Some(IMAGE_AUTHOR.to_string()),
            empty_layer: self.layers.is_empty(),
        });
        history
    }
}

// =============================================================================
// File Operations
// =============================================================================

/// Loads a parent image configuration, or a default one when no base config
/// is given.
pub fn load_parent_image(path: Option<&Path>) -> Result<Image> {
    match path {
        Some(path) => {
            let contents = fs::read_to_string(path)?;
            serde_json::from_str(&contents).map_err(|e| Error::InvalidImageConfig(e.to_string()))
        }
        None => Ok(Image::default()),
    }
}

/// Writes an image configuration as JSON.
pub fn write_image(image: &Image, path: &Path) -> Result<()> {
    let json = serde_json::to_string(image).map_err(|e| Error::Serialization(e.to_string()))?;
    fs::write(path, json)?;
    Ok(())
}

// =============================================================================
// Helpers
// =============================================================================

/// Splits `key=value`, yielding an empty value when there is no `=`.
fn split_pair(pair: &str) -> (&str, &str) {
    pair.split_once('=').unwrap_or((pair, ""))
}

fn pairs_to_map(pairs: &[String]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|pair| {
            let (key, value) = split_pair(pair);
            (key.to_string(), value.to_string())
        })
        .collect()
}

/// Expands `$VAR` and `${VAR}` references against `vars`.
///
/// Unknown names expand to the name itself, so values can pass through
/// environments that do not define them.
fn expand(value: &str, vars: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('{') => {
                chars.next();
                let mut name = String::new();
                for c in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                    name.push(c);
                }
                out.push_str(vars.get(&name).map(String::as_str).unwrap_or(&name));
            }
            Some(next) if next.is_ascii_alphanumeric() || *next == '_' => {
                let mut name = String::new();
                while let Some(next) = chars.peek() {
                    if next.is_ascii_alphanumeric() || *next == '_' {
                        name.push(*next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                out.push_str(vars.get(&name).map(String::as_str).unwrap_or(&name));
            }
            _ => out.push('$'),
        }
    }
    out
}
