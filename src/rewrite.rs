//! Prefix-based path rewriting inside a layer tarball.
//!
//! Given an ordered list of [`RenameRule`]s, produces a new tar stream with
//! renamed entries. The engine makes two passes over the source:
//!
//! 1. **Scan**: record every entry name and, for each, the first rule whose
//!    prefix matches (first-match-wins, not longest-prefix).
//! 2. **Emit**: write each entry under its pending new name, unless that name
//!    already exists among the *original* entry names; in that case the
//!    renamed entry is dropped entirely, favoring the already-present path.
//!    Entries without a pending rename are copied through unchanged.
//!
//! Two passes are required because collision resolution needs the full set of
//! original names before any rename is safe, and tar streams are not
//! seekable. Only the name index is buffered between passes, never the
//! archive content.

use crate::archive::invalid_archive;
use crate::error::{Error, Result};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{Read, Write};
use std::path::PathBuf;
use tracing::{debug, info};

/// An ordered prefix rename rule.
///
/// Rules overlap on a first-in-given-order basis: callers must order rules
/// from most-specific to least-specific prefix if overlap is possible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameRule {
    /// Entry-name prefix to match.
    pub prefix: String,
    /// Replacement for the matched prefix.
    pub replacement: String,
}

impl RenameRule {
    /// Parses a `prefix:replacement` rule.
    ///
    /// A leading `/` on either side is normalized to `./` to match tar entry
    /// naming conventions. Rules lacking the separator, or with an empty
    /// prefix, are configuration errors rejected before any archive I/O.
    pub fn parse(rule: &str) -> Result<Self> {
        let (prefix, replacement) =
            rule.split_once(':')
                .ok_or_else(|| Error::InvalidRenameRule {
                    rule: rule.to_string(),
                    reason: "missing ':' separator".to_string(),
                })?;
        if prefix.is_empty() {
            return Err(Error::InvalidRenameRule {
                rule: rule.to_string(),
                reason: "empty prefix".to_string(),
            });
        }
        Ok(Self {
            prefix: normalize(prefix),
            replacement: normalize(replacement),
        })
    }
}

/// Rewrites a leading `/` to the relative form tar entries use.
fn normalize(path: &str) -> String {
    match path.strip_prefix('/') {
        Some(rest) => format!("./{}", rest),
        None => path.to_string(),
    }
}

/// Inputs for [`rewrite_layer`].
#[derive(Debug, Clone)]
pub struct RewriteOptions {
    /// Path of the rewritten layer tarball to create.
    pub output: PathBuf,
    /// Source layer tarball.
    pub source: PathBuf,
    /// Rename rules, applied first-match-wins in this order.
    pub renames: Vec<RenameRule>,
}

/// Rewrites entry paths in a layer tarball per the configured rules.
///
/// The source is opened twice, once per pass; both handles are scoped and
/// closed on every exit path.
pub fn rewrite_layer(opts: &RewriteOptions) -> Result<()> {
    let scan = crate::archive::open_source(&opts.source)?;
    let emit = crate::archive::open_source(&opts.source)?;
    let out = File::create(&opts.output)?;
    rewrite_streams(scan, emit, out, &opts.renames)?;
    info!(
        "rewrote {} into {}",
        opts.source.display(),
        opts.output.display()
    );
    Ok(())
}

/// Two-pass rewrite over two independently opened reads of the same source.
///
/// `scan` and `emit` must yield identical byte streams. Exposed separately
/// from [`rewrite_layer`] so the engine can run over in-memory archives.
pub fn rewrite_streams<R1, R2, W>(
    scan: R1,
    emit: R2,
    out: W,
    rules: &[RenameRule],
) -> Result<W>
where
    R1: Read,
    R2: Read,
    W: Write,
{
    // Scan pass: index every original name and compute pending renames.
    let mut names: HashSet<String> = HashSet::new();
    let mut pending: HashMap<String, String> = HashMap::new();

    let mut archive = tar::Archive::new(scan);
    for entry in archive.entries().map_err(invalid_archive)? {
        let entry = entry.map_err(invalid_archive)?;
        let name = entry
            .path()
            .map_err(invalid_archive)?
            .to_string_lossy()
            .into_owned();
        for rule in rules {
            if let Some(suffix) = name.strip_prefix(&rule.prefix) {
                pending.insert(name.clone(), format!("{}{}", rule.replacement, suffix));
                break;
            }
        }
        names.insert(name);
    }

    // Emit pass: apply safe renames, drop colliding ones, copy the rest.
    let mut builder = tar::Builder::new(out);
    let mut archive = tar::Archive::new(emit);
    for entry in archive.entries().map_err(invalid_archive)? {
        let mut entry = entry.map_err(invalid_archive)?;
        let name = entry
            .path()
            .map_err(invalid_archive)?
            .to_string_lossy()
            .into_owned();

        let target = match pending.get(&name) {
            Some(new_name) if names.contains(new_name) => {
                debug!(
                    "dropping {}: rename target {} already exists",
                    name, new_name
                );
                continue;
            }
            Some(new_name) => new_name.clone(),
            None => name,
        };

        let mut header = entry.header().clone();
        if let Some(link) = entry.link_name().map_err(invalid_archive)? {
            let link = link.into_owned();
            builder.append_link(&mut header, &target, link)?;
        } else {
            builder.append_data(&mut header, &target, &mut entry)?;
        }
    }

    Ok(builder.into_inner()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_splits_on_first_separator() {
        let rule = RenameRule::parse("a:b:c").unwrap();
        assert_eq!(rule.prefix, "a");
        assert_eq!(rule.replacement, "b:c");
    }

    #[test]
    fn parse_normalizes_absolute_paths() {
        let rule = RenameRule::parse("/usr/lib:/opt/lib").unwrap();
        assert_eq!(rule.prefix, "./usr/lib");
        assert_eq!(rule.replacement, "./opt/lib");
    }

    #[test]
    fn parse_rejects_missing_separator() {
        assert!(matches!(
            RenameRule::parse("no-separator"),
            Err(Error::InvalidRenameRule { .. })
        ));
    }

    #[test]
    fn parse_rejects_empty_prefix() {
        assert!(matches!(
            RenameRule::parse(":replacement"),
            Err(Error::InvalidRenameRule { .. })
        ));
    }
}
