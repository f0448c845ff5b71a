//! Merging partial images into one tarball.
//!
//! A partial image is a previously built image archive intended to be merged
//! with others rather than run standalone. Assembly copies every non-manifest
//! entry from each partial image into the output (in caller-given order),
//! concatenates their manifest records, and writes the merged list as the
//! final `manifest.json`.

use crate::archive::{ImageArchiveWriter, exclude_manifest, open_source};
use crate::constants::MANIFEST_FILE;
use crate::error::Result;
use crate::manifest::{ManifestRecord, manifest_from_archive, manifest_json};
use std::path::PathBuf;
use tracing::{debug, info};

/// Inputs for [`assemble_image`].
#[derive(Debug, Clone)]
pub struct AssembleOptions {
    /// Path of the image tarball to create.
    pub output: PathBuf,
    /// Partial image tarballs to merge, in overlay order.
    pub images: Vec<PathBuf>,
}

/// Creates a container image from a list of partial images.
///
/// Merges the manifests from each image and combines the image tars. Each
/// partial image's own `manifest.json` is filtered out; record order within
/// each manifest is preserved and images are concatenated in the given order.
pub fn assemble_image(opts: &AssembleOptions) -> Result<()> {
    let mut writer = ImageArchiveWriter::create(&opts.output)?;
    let mut manifest: Vec<ManifestRecord> = Vec::new();

    for image in &opts.images {
        debug!("merging partial image: {}", image.display());
        writer.add_archive(open_source(image)?, exclude_manifest)?;
        let mut records = manifest_from_archive(open_source(image)?)?;
        manifest.append(&mut records);
    }

    let contents = manifest_json(&manifest)?;
    writer.add_file(MANIFEST_FILE, contents.as_bytes())?;
    writer.finish()?;

    info!(
        "assembled {} partial images into {}",
        opts.images.len(),
        opts.output.display()
    );
    Ok(())
}
