//! # layerstack
//!
//! **Container image tarball assembly from pre-built layers.**
//!
//! This crate composes pre-built filesystem layers, a JSON image
//! configuration, and optional base-image metadata into a layered archive
//! conforming to the Docker/OCI image tarball layout: a set of layer
//! tarballs plus a top-level `manifest.json` describing how they chain
//! together.
//!
//! # Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          layerstack                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  assemble                       create                          │
//! │  partial images ──┐             config + layers + base ──┐      │
//! │                   ▼                                       ▼      │
//! │  ┌──────────────────────┐       ┌─────────────────────────┐     │
//! │  │  ImageArchiveWriter  │◄──────│  ManifestRecord builder │     │
//! │  │  add_file / add_tar  │       │  layer chaining, Parent │     │
//! │  └──────────┬───────────┘       └─────────────────────────┘     │
//! │             ▼                                                   │
//! │     output tarball: layers + config + manifest.json             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  rewrite (standalone pre-processing)                            │
//! │     layer.tar ──► two-pass prefix rename ──► layer'.tar         │
//! │  extract (standalone post-processing)                           │
//! │     OCI manifest ──► config digest + layer digests              │
//! │  config (image configuration builder)                           │
//! │     parent config + patch ──► child config JSON                 │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Processing Model
//!
//! Everything is single-threaded, forward-only streaming: each archive is
//! read and written entry by entry, one entry in memory at a time. Every run
//! operates on its own inputs and produces its own output; there is no
//! shared or persistent state between invocations. Layers are opaque byte
//! streams; this crate never inspects, diffs, compresses, or hashes their
//! contents.
//!
//! # Determinism
//!
//! Manifest and image-config JSON serialize with a fixed key order, and
//! entries materialized by the writer carry normalized headers (fixed mode,
//! zero mtime and ownership), so byte-identical inputs always produce
//! byte-identical archives. Upstream build systems rely on that for
//! content-addressed caching.
//!
//! # Example
//!
//! ```rust,ignore
//! use layerstack::{CreateOptions, LayerFile, create_image};
//!
//! create_image(&CreateOptions {
//!     output: "app.tar".into(),
//!     identifier: "deadbeef".into(),
//!     layers: vec![LayerFile { name: "cafe".into(), path: "layer.tar".into() }],
//!     config: "config.json".into(),
//!     tags: vec!["repo/app:latest".into()],
//!     base: Some("base.tar".into()),
//! })?;
//! # Ok::<(), layerstack::Error>(())
//! ```

pub mod archive;
pub mod assemble;
pub mod config;
pub mod constants;
pub mod create;
pub mod error;
pub mod extract;
pub mod manifest;
pub mod rewrite;

// Re-exports
pub use archive::{ImageArchiveWriter, exclude_manifest, open_source};
pub use assemble::{AssembleOptions, assemble_image};
pub use config::{Image, ImagePatch, load_parent_image, write_image};
pub use create::{CreateOptions, LayerFile, create_image};
pub use error::{Error, Result};
pub use extract::{extract_digests, parse_manifest};
pub use manifest::{
    ManifestRecord, latest_record_from_archive, manifest_from_archive, manifest_json,
    parent_digest,
};
pub use rewrite::{RenameRule, RewriteOptions, rewrite_layer, rewrite_streams};
