//! Building one image from a config, new layers, and an optional base.
//!
//! The output tarball contains the config at `<identifier>.json`, each new
//! layer at `<identifier>/<name>.tar`, and a one-record `manifest.json`.
//! When a base image is given, the new record chains onto it: the base's
//! layer paths become the prefix of the new record's `Layers`, and the base
//! config name `<digest>.json` yields `Parent = "sha256:<digest>"`.

use crate::archive::{ImageArchiveWriter, open_source};
use crate::constants::{CONFIG_SUFFIX, LAYER_SUFFIX, MANIFEST_FILE};
use crate::error::Result;
use crate::manifest::{ManifestRecord, latest_record_from_archive, manifest_json, parent_digest};
use std::path::PathBuf;
use tracing::{debug, info};

/// A new layer to add: a caller-supplied name (typically a content digest)
/// and the tar file holding its bytes. The layer is treated as an opaque
/// byte stream; its contents are never inspected.
#[derive(Debug, Clone)]
pub struct LayerFile {
    /// Identifier used in the layer's entry path.
    pub name: String,
    /// Path of the layer tar on disk.
    pub path: PathBuf,
}

/// Inputs for [`create_image`].
#[derive(Debug, Clone)]
pub struct CreateOptions {
    /// Path of the image tarball to create.
    pub output: PathBuf,
    /// Identifier for this image, names the config entry.
    pub identifier: String,
    /// New layers to add, in overlay order.
    pub layers: Vec<LayerFile>,
    /// Path of the JSON configuration file for the image.
    pub config: PathBuf,
    /// Repository tags to apply, order preserved.
    pub tags: Vec<String>,
    /// Optional base image tarball to chain onto.
    pub base: Option<PathBuf>,
}

/// Creates a container image tarball from the given inputs.
///
/// A base image without a usable manifest record, or whose config name does
/// not match `<digest>.json`, degrades gracefully: the record simply carries
/// no base layers or no `Parent`. That is the only non-fatal input condition.
pub fn create_image(opts: &CreateOptions) -> Result<()> {
    let mut writer = ImageArchiveWriter::create(&opts.output)?;

    // The config name can be anything; docker uses `<identifier>.json`.
    let config_name = format!("{}{}", opts.identifier, CONFIG_SUFFIX);
    writer.add_file_from_path(&config_name, &opts.config)?;

    let mut layer_names = Vec::with_capacity(opts.layers.len());
    for layer in &opts.layers {
        let entry_name = format!("{}/{}{}", opts.identifier, layer.name, LAYER_SUFFIX);
        debug!("adding layer {} as {}", layer.path.display(), entry_name);
        writer.add_file_from_path(&entry_name, &layer.path)?;
        layer_names.push(entry_name);
    }

    let mut base_layers = Vec::new();
    let mut parent = None;
    if let Some(base) = &opts.base {
        if let Some(record) = latest_record_from_archive(open_source(base)?)? {
            parent = parent_digest(&record.config);
            base_layers = record.layers;
        }
    }

    let mut layers = base_layers;
    layers.extend(layer_names);

    let record = ManifestRecord {
        config: config_name,
        layers,
        parent,
        repo_tags: opts.tags.clone(),
    };
    let contents = manifest_json(std::slice::from_ref(&record))?;
    writer.add_file(MANIFEST_FILE, contents.as_bytes())?;
    writer.finish()?;

    info!(
        "created image {} with {} new layers",
        opts.output.display(),
        opts.layers.len()
    );
    Ok(())
}
