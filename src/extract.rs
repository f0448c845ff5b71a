//! Digest extraction from OCI manifest documents.
//!
//! Pulls the config digest and the ordered layer digest list out of a
//! registry-style manifest. Extraction is purely structural: digest strings
//! are not validated, layer order is preserved as-is because it is the
//! overlay order.

use crate::error::{Error, Result};
use std::fs;
use std::path::Path;

/// Extracts the config digest and layer digests from an OCI manifest.
///
/// Fails with [`Error::MissingField`] when `config.digest` or any
/// `layers[].digest` is absent, and [`Error::InvalidManifest`] when the
/// input is not valid JSON.
pub fn extract_digests(manifest_json: &str) -> Result<(String, Vec<String>)> {
    let manifest: serde_json::Value =
        serde_json::from_str(manifest_json).map_err(|e| Error::InvalidManifest(e.to_string()))?;

    let config = manifest
        .get("config")
        .ok_or_else(|| Error::MissingField {
            field: "config".to_string(),
        })?
        .get("digest")
        .and_then(|d| d.as_str())
        .ok_or_else(|| Error::MissingField {
            field: "config.digest".to_string(),
        })?
        .to_string();

    let layers = manifest
        .get("layers")
        .and_then(|l| l.as_array())
        .ok_or_else(|| Error::MissingField {
            field: "layers".to_string(),
        })?;

    let mut digests = Vec::with_capacity(layers.len());
    for layer in layers {
        let digest = layer
            .get("digest")
            .and_then(|d| d.as_str())
            .ok_or_else(|| Error::MissingField {
                field: "layers.digest".to_string(),
            })?;
        digests.push(digest.to_string());
    }

    Ok((config, digests))
}

/// Reads an OCI manifest file and writes the config digest and the
/// newline-joined layer digests to the two output paths.
pub fn parse_manifest(manifest: &Path, config_out: &Path, layers_out: &Path) -> Result<()> {
    let contents = fs::read_to_string(manifest)?;
    let (config, layers) = extract_digests(&contents)?;
    fs::write(config_out, config)?;
    fs::write(layers_out, layers.join("\n"))?;
    Ok(())
}
