//! Streaming tar writer for image tarballs.
//!
//! [`ImageArchiveWriter`] appends individual files and whole source archives
//! into one output tar stream. Entries are streamed through one at a time;
//! nothing buffers a full archive in memory. Source archives may be gzip
//! compressed; [`open_source`] sniffs the magic bytes and decompresses
//! transparently.
//!
//! Merging partial images uses [`exclude_manifest`] as the entry filter so
//! that each partial image's own `manifest.json` does not leak into the
//! merged output. The merged manifest is written once, at the end, by the
//! caller.

use crate::constants::{DEFAULT_ENTRY_MODE, MANIFEST_FILE};
use crate::error::{Error, Result};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;
use tracing::debug;

/// Streaming writer for Docker/OCI image tarballs.
///
/// There is no de-duplication guard on [`ImageArchiveWriter::add_file`]: the
/// last write for a given path wins, which is the tar extraction rule.
/// Callers that need uniqueness must enforce it themselves.
pub struct ImageArchiveWriter<W: Write> {
    builder: tar::Builder<W>,
}

impl ImageArchiveWriter<File> {
    /// Creates a writer backed by a new file at `path`.
    ///
    /// If the operation later fails, the partially written file must be
    /// treated as invalid; no rollback is performed.
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::new(file))
    }
}

impl<W: Write> ImageArchiveWriter<W> {
    /// Wraps an arbitrary output stream.
    pub fn new(out: W) -> Self {
        Self {
            builder: tar::Builder::new(out),
        }
    }

    /// Appends a single regular-file entry with the given content.
    ///
    /// Header metadata is normalized (fixed mode, zero mtime and ownership)
    /// so byte-identical inputs produce byte-identical archives.
    pub fn add_file(&mut self, name: &str, content: &[u8]) -> Result<()> {
        let mut header = normalized_header(content.len() as u64);
        self.builder.append_data(&mut header, name, content)?;
        Ok(())
    }

    /// Appends a regular-file entry streamed from a file on disk.
    pub fn add_file_from_path(&mut self, name: &str, src: &Path) -> Result<()> {
        let file = File::open(src)?;
        let len = file.metadata()?.len();
        let mut header = normalized_header(len);
        self.builder.append_data(&mut header, name, file)?;
        Ok(())
    }

    /// Copies every entry from a source tar stream into the output, except
    /// those for which `filter(name)` returns false.
    ///
    /// Entries are copied verbatim: content, mode, and type are preserved,
    /// only the inclusion decision is applied. Directory markers and links
    /// pass through with their headers intact.
    pub fn add_archive<R: Read>(&mut self, source: R, filter: impl Fn(&str) -> bool) -> Result<()> {
        let mut archive = tar::Archive::new(source);
        for entry in archive.entries().map_err(invalid_archive)? {
            let mut entry = entry.map_err(invalid_archive)?;
            let name = entry
                .path()
                .map_err(invalid_archive)?
                .to_string_lossy()
                .into_owned();

            if !filter(&name) {
                debug!("skipping filtered entry: {}", name);
                continue;
            }

            let mut header = entry.header().clone();
            if let Some(link) = entry.link_name().map_err(invalid_archive)? {
                let link = link.into_owned();
                self.builder.append_link(&mut header, &name, link)?;
            } else {
                self.builder.append_data(&mut header, &name, &mut entry)?;
            }
        }
        Ok(())
    }

    /// Writes the archive footer and returns the underlying stream.
    pub fn finish(self) -> Result<W> {
        Ok(self.builder.into_inner()?)
    }
}

/// Default merge filter: excludes any entry whose basename is
/// `manifest.json`.
pub fn exclude_manifest(name: &str) -> bool {
    let basename = name.rsplit('/').next().unwrap_or(name);
    basename != MANIFEST_FILE
}

/// Opens a tar source file, transparently decompressing gzip input.
pub fn open_source(path: &Path) -> Result<Box<dyn Read>> {
    let mut reader = BufReader::new(File::open(path)?);
    let magic = reader.fill_buf()?;
    if magic.starts_with(&[0x1f, 0x8b]) {
        Ok(Box::new(GzDecoder::new(reader)))
    } else {
        Ok(Box::new(reader))
    }
}

/// Maps a tar read failure to [`Error::InvalidArchive`].
pub(crate) fn invalid_archive(err: std::io::Error) -> Error {
    Error::InvalidArchive(err.to_string())
}

fn normalized_header(size: u64) -> tar::Header {
    let mut header = tar::Header::new_gnu();
    header.set_size(size);
    header.set_mode(DEFAULT_ENTRY_MODE);
    header.set_mtime(0);
    header.set_uid(0);
    header.set_gid(0);
    header.set_entry_type(tar::EntryType::Regular);
    header
}
