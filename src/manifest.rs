//! Manifest records for the Docker image tarball layout.
//!
//! A `manifest.json` is a JSON array of records, each describing how a config
//! and an ordered list of layer tarballs combine into one image. Layer order
//! is the overlay order from base to top and is never de-duplicated or
//! re-sorted here.
//!
//! Serialization is deterministic: struct fields are declared in sorted key
//! order (`Config`, `Layers`, `Parent`, `RepoTags`), so identical input
//! always produces byte-identical manifest output. That determinism is what
//! makes the output usable for content-addressed caching upstream.

use crate::archive::invalid_archive;
use crate::constants::{CONFIG_SUFFIX, MANIFEST_FILE, MAX_MANIFEST_SIZE, SHA256_PREFIX};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::io::Read;

/// One record in a `manifest.json` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestRecord {
    /// Name of the JSON config entry within the archive.
    #[serde(rename = "Config")]
    pub config: String,

    /// Ordered layer entry paths, base to top.
    #[serde(rename = "Layers", default)]
    pub layers: Vec<String>,

    /// Digest reference (`sha256:<id>`) of the record this one extends.
    /// Present only when a base image supplied one.
    #[serde(rename = "Parent", default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,

    /// Human-assigned repository tags, order preserved from input.
    #[serde(rename = "RepoTags", default)]
    pub repo_tags: Vec<String>,
}

/// Serializes manifest records as the `manifest.json` array.
pub fn manifest_json(records: &[ManifestRecord]) -> Result<String> {
    serde_json::to_string(records).map_err(|e| Error::Serialization(e.to_string()))
}

/// Reads the manifest records embedded in an image tarball.
///
/// Fails with [`Error::ManifestNotFound`] when the archive has no
/// `manifest.json` entry at the top level.
pub fn manifest_from_archive<R: Read>(source: R) -> Result<Vec<ManifestRecord>> {
    let mut archive = tar::Archive::new(source);
    for entry in archive.entries().map_err(invalid_archive)? {
        let mut entry = entry.map_err(invalid_archive)?;
        let name = entry
            .path()
            .map_err(invalid_archive)?
            .to_string_lossy()
            .into_owned();
        let basename = name.rsplit('/').next().unwrap_or(&name);
        if basename != MANIFEST_FILE {
            continue;
        }

        if entry.header().size()? > MAX_MANIFEST_SIZE {
            return Err(Error::InvalidManifest(format!(
                "manifest entry exceeds {} bytes",
                MAX_MANIFEST_SIZE
            )));
        }

        let mut contents = String::new();
        entry.read_to_string(&mut contents)?;
        return serde_json::from_str(&contents).map_err(|e| Error::InvalidManifest(e.to_string()));
    }
    Err(Error::ManifestNotFound)
}

/// Returns the last manifest record of a base image, if it has one.
///
/// The base archive may itself hold a multi-record manifest from a prior
/// merge; only the final record is the current head. A base without a
/// manifest, or with an empty record list, yields `None` rather than an
/// error.
pub fn latest_record_from_archive<R: Read>(source: R) -> Result<Option<ManifestRecord>> {
    match manifest_from_archive(source) {
        Ok(mut records) => Ok(records.pop()),
        Err(Error::ManifestNotFound) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Derives a parent digest from a config entry name of the form
/// `<digest>.json`.
///
/// Returns `None` when the name does not match the pattern; callers degrade
/// to a record with no parent.
pub fn parent_digest(config_name: &str) -> Option<String> {
    config_name
        .strip_suffix(CONFIG_SUFFIX)
        .filter(|digest| !digest.is_empty())
        .map(|digest| format!("{}{}", SHA256_PREFIX, digest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_digest_from_config_name() {
        assert_eq!(
            parent_digest("deadbeef.json"),
            Some("sha256:deadbeef".to_string())
        );
        assert_eq!(parent_digest(".json"), None);
        assert_eq!(parent_digest("deadbeef.tar"), None);
        assert_eq!(parent_digest("deadbeef"), None);
    }

    #[test]
    fn record_keys_are_sorted() {
        let record = ManifestRecord {
            config: "id.json".to_string(),
            layers: vec!["id/layer.tar".to_string()],
            parent: Some("sha256:abc".to_string()),
            repo_tags: vec!["repo/name:tag".to_string()],
        };
        let json = serde_json::to_string(&record).unwrap();
        let config = json.find("\"Config\"").unwrap();
        let layers = json.find("\"Layers\"").unwrap();
        let parent = json.find("\"Parent\"").unwrap();
        let tags = json.find("\"RepoTags\"").unwrap();
        assert!(config < layers && layers < parent && parent < tags);
    }
}
