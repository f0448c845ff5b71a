//! Constants for the Docker/OCI image tarball layout.
//!
//! Entry naming conventions and bounds used throughout the crate. The entry
//! names follow the Docker image tarball format: one top-level
//! `manifest.json`, a config entry at `<identifier>.json`, and layer entries
//! at `<identifier>/<name>.tar`.

// =============================================================================
// Tarball Entry Names
// =============================================================================

/// Name of the manifest entry inside an image tarball.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Suffix of the image config entry (`<identifier>.json`).
pub const CONFIG_SUFFIX: &str = ".json";

/// Suffix of a layer entry (`<identifier>/<name>.tar`).
pub const LAYER_SUFFIX: &str = ".tar";

/// Digest algorithm prefix used for parent references and diff IDs.
pub const SHA256_PREFIX: &str = "sha256:";

// =============================================================================
// Bounds
// =============================================================================

/// Maximum manifest size accepted when reading one out of an image tarball
/// (1 MiB).
///
/// Prevents memory exhaustion from a malformed archive claiming a huge
/// manifest entry. Standard manifests are well under 100 KiB.
pub const MAX_MANIFEST_SIZE: u64 = 1024 * 1024;

/// Mode applied to entries the writer materializes itself (config, layer
/// tars, manifest). Fixed so byte-identical inputs produce byte-identical
/// archives.
pub const DEFAULT_ENTRY_MODE: u32 = 0o644;

// =============================================================================
// Image Configuration Defaults
// =============================================================================

/// Fixed creation timestamp stamped into generated image configurations.
///
/// A constant timestamp keeps configuration output reproducible for
/// content-addressed caching upstream.
pub const IMAGE_CREATED: &str = "0001-01-01T00:00:00Z";

/// Author recorded in generated image configurations and history entries.
pub const IMAGE_AUTHOR: &str = "layerstack";

/// Architecture recorded in generated image configurations.
pub const IMAGE_ARCHITECTURE: &str = "amd64";

/// Operating system recorded in generated image configurations.
pub const IMAGE_OS: &str = "linux";

/// Root filesystem type; the only value the image spec defines.
pub const ROOTFS_TYPE: &str = "layers";

/// `created_by` recorded in appended history entries.
pub const HISTORY_CREATED_BY: &str = "layerstack build";
