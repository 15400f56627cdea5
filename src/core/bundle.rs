//! # Package Archives
//!
//! A package is a single file:
//!
//! ```text
//! #!/usr/bin/env voltcli                  <- interpreter line
//! VOLTPKG <format> <blake3 of payload>    <- header line
//! <payload>                               <- LZ4 (size prepended) of bincode(BundlePayload)
//! ```
//!
//! [`BundleWriter`] builds one and [`Bundle`] reads one back, verifying the
//! format version and checksum before anything inside is trusted.

use crate::{
    constants::{PACKAGE_BOOTSTRAP_ENTRY, PACKAGE_FORMAT_VERSION, PACKAGE_MAGIC},
    core::utility,
    models::{Bootstrap, BundleEntry, BundlePayload},
};
use anyhow::{Context, Result};
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Reasons a file cannot be opened as a package.
#[derive(Error, Debug)]
pub enum BundleError {
    /// The file could not be read.
    #[error("I/O error while reading package: {0}")]
    Io(#[from] std::io::Error),
    /// Missing shebang or `VOLTPKG` header.
    #[error("'{0}' is not a package.")]
    NotABundle(PathBuf),
    /// Written by a newer runtime.
    #[error("Package format {found} is newer than the supported format {supported}.")]
    UnsupportedFormat {
        /// Format in the header.
        found: u32,
        /// Newest format this runtime reads.
        supported: u32,
    },
    /// The payload does not hash to the header checksum.
    #[error("Package checksum mismatch. The file is likely truncated or modified.")]
    ChecksumMismatch,
    /// Decompression or decoding failed.
    #[error("Package payload could not be decoded: {0}")]
    Corrupt(String),
    /// No `__main__` entry.
    #[error("Package has no bootstrap entry.")]
    MissingBootstrap,
    /// `__main__` is not a valid bootstrap.
    #[error("Package bootstrap entry is invalid: {0}")]
    InvalidBootstrap(#[from] toml::de::Error),
}

/// A package loaded into memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    path: PathBuf,
    entries: BTreeMap<String, Vec<u8>>,
}

/// Splits `bytes` after the first newline.
fn split_line(bytes: &[u8]) -> Option<(&[u8], &[u8])> {
    let newline = bytes.iter().position(|b| *b == b'\n')?;
    Some((bytes.get(..newline)?, bytes.get(newline + 1..)?))
}

/// Parses the header line. Returns the format version and checksum.
fn parse_header(line: &[u8]) -> Option<(u32, String)> {
    let line = std::str::from_utf8(line).ok()?;
    let mut parts = line.split_whitespace();
    if parts.next()? != PACKAGE_MAGIC {
        return None;
    }
    let format = parts.next()?.parse().ok()?;
    let checksum = parts.next()?.to_string();
    Some((format, checksum))
}

impl Bundle {
    /// Cheap check used at startup to decide whether `argv[1]` is a package.
    pub fn is_bundle(path: &Path) -> bool {
        let Ok(mut file) = fs::File::open(path) else {
            return false;
        };
        let mut head = vec![0u8; 512];
        let Ok(read) = file.read(&mut head) else {
            return false;
        };
        head.truncate(read);
        if !head.starts_with(b"#!") {
            return false;
        }
        split_line(&head)
            .and_then(|(_, rest)| split_line(rest))
            .and_then(|(header, _)| parse_header(header))
            .is_some()
    }

    /// Reads and verifies the package at `path`.
    pub fn open(path: &Path) -> Result<Self, BundleError> {
        let bytes = fs::read(path)?;
        Self::from_bytes(&bytes, path)
    }

    /// Verifies and decodes an in-memory package. `path` is only used for messages.
    pub fn from_bytes(bytes: &[u8], path: &Path) -> Result<Self, BundleError> {
        let not_a_bundle = || BundleError::NotABundle(path.to_path_buf());
        if !bytes.starts_with(b"#!") {
            return Err(not_a_bundle());
        }
        let (_, rest) = split_line(bytes).ok_or_else(not_a_bundle)?;
        let (header, payload) = split_line(rest).ok_or_else(not_a_bundle)?;
        let (format, checksum) = parse_header(header).ok_or_else(not_a_bundle)?;
        if format > PACKAGE_FORMAT_VERSION {
            return Err(BundleError::UnsupportedFormat {
                found: format,
                supported: PACKAGE_FORMAT_VERSION,
            });
        }
        if blake3::hash(payload).to_hex().as_str() != checksum {
            return Err(BundleError::ChecksumMismatch);
        }

        let decompressed = lz4_flex::decompress_size_prepended(payload)
            .map_err(|e| BundleError::Corrupt(e.to_string()))?;
        let (decoded, _): (BundlePayload, usize) =
            bincode::serde::decode_from_slice(&decompressed, bincode::config::standard())
                .map_err(|e| BundleError::Corrupt(e.to_string()))?;
        log::debug!(
            "Opened package '{}' with {} entries.",
            path.display(),
            decoded.entries.len()
        );

        Ok(Self {
            path: path.to_path_buf(),
            entries: decoded
                .entries
                .into_iter()
                .map(|entry| (entry.path, entry.data))
                .collect(),
        })
    }

    /// Where the package was read from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The contents of entry `name`, if present.
    pub fn file(&self, name: &str) -> Option<&[u8]> {
        self.entries.get(name).map(Vec::as_slice)
    }

    /// Entries whose path starts with `prefix`, in path order.
    pub fn entries_under<'b>(&'b self, prefix: &'b str) -> impl Iterator<Item = (&'b str, &'b [u8])> + 'b {
        self.entries
            .range(prefix.to_string()..)
            .take_while(move |(path, _)| path.starts_with(prefix))
            .map(|(path, data)| (path.as_str(), data.as_slice()))
    }

    /// Reads the generated `__main__` entry.
    pub fn bootstrap(&self) -> Result<Bootstrap, BundleError> {
        let data = self
            .file(PACKAGE_BOOTSTRAP_ENTRY)
            .ok_or(BundleError::MissingBootstrap)?;
        let text = String::from_utf8_lossy(data);
        Ok(toml::from_str(&text)?)
    }
}

/// Accumulates package entries and writes the archive on [`close`](Self::close).
#[derive(Debug)]
pub struct BundleWriter {
    output_path: PathBuf,
    preamble: String,
    excludes: Vec<Regex>,
    entries: BTreeMap<String, Vec<u8>>,
}

impl BundleWriter {
    /// Starts a package at `output_path`. Refuses an existing path unless `force`.
    pub fn open(output_path: &Path, force: bool, preamble: &str, excludes: &[&str]) -> Result<Self> {
        if output_path.exists() && !force {
            return Err(utility::abort([
                format!("Output file \"{}\" exists.", output_path.display()),
                "Use the --force option to overwrite it.".to_string(),
            ]));
        }
        let excludes = excludes
            .iter()
            .map(|pattern| Regex::new(pattern))
            .collect::<Result<Vec<_>, _>>()
            .context("Invalid package exclude pattern")?;
        Ok(Self {
            output_path: output_path.to_path_buf(),
            preamble: preamble.to_string(),
            excludes,
            entries: BTreeMap::new(),
        })
    }

    fn is_excluded(&self, path: &str) -> bool {
        self.excludes.iter().any(|re| re.is_match(path))
    }

    /// Stores `contents` as entry `name`. Exclusions do not apply.
    pub fn add_file_from_string(&mut self, contents: &str, name: &str) {
        self.entries
            .insert(name.to_string(), contents.as_bytes().to_vec());
    }

    /// Recursively adds the files under `dir`, stored below `prefix`.
    pub fn add_directory(&mut self, dir: &Path, prefix: &str) -> Result<usize> {
        let mut added = 0;
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.with_context(|| format!("Failed to walk '{}'", dir.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(dir)
                .with_context(|| format!("'{}' is outside '{}'", entry.path().display(), dir.display()))?;
            let relative = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            let stored = join_entry(prefix, &relative);
            if self.is_excluded(&stored) {
                log::trace!("Excluding '{}' from package.", stored);
                continue;
            }
            let data = fs::read(entry.path())
                .with_context(|| format!("Failed to read '{}'", entry.path().display()))?;
            self.entries.insert(stored, data);
            added += 1;
        }
        Ok(added)
    }

    /// Copies the entries of another package stored under `prefix`.
    pub fn add_bundle_tree(&mut self, bundle: &Bundle, prefix: &str) -> usize {
        let mut added = 0;
        for (path, data) in bundle.entries_under(prefix) {
            if self.is_excluded(path) {
                continue;
            }
            self.entries.insert(path.to_string(), data.to_vec());
            added += 1;
        }
        added
    }

    /// Writes the archive and optionally marks it executable.
    pub fn close(self, make_executable: bool) -> Result<PathBuf> {
        let payload = BundlePayload {
            entries: self
                .entries
                .into_iter()
                .map(|(path, data)| BundleEntry { path, data })
                .collect(),
        };
        let raw = bincode::serde::encode_to_vec(&payload, bincode::config::standard())
            .context("Failed to serialize package payload.")?;
        let compressed = lz4_flex::compress_prepend_size(&raw);
        let checksum = blake3::hash(&compressed);
        log::debug!(
            "Package payload: {} bytes raw, {} compressed, checksum {}",
            raw.len(),
            compressed.len(),
            hex::encode(&checksum.as_bytes()[..8])
        );

        // Write next to the target and rename so a failure never clobbers an existing file.
        let parent = match self.output_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)
            .with_context(|| format!("Failed to create '{}'", parent.display()))?;
        let mut temp = tempfile::NamedTempFile::new_in(&parent)
            .with_context(|| format!("Failed to create a temporary file in '{}'", parent.display()))?;
        temp.write_all(self.preamble.as_bytes())?;
        temp.write_all(
            format!(
                "{} {} {}\n",
                PACKAGE_MAGIC,
                PACKAGE_FORMAT_VERSION,
                checksum.to_hex()
            )
            .as_bytes(),
        )?;
        temp.write_all(&compressed)?;
        temp.flush()?;

        #[cfg(unix)]
        if make_executable {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(temp.path(), fs::Permissions::from_mode(0o755))?;
        }
        #[cfg(not(unix))]
        let _ = make_executable;

        temp.persist(&self.output_path).with_context(|| {
            format!("Failed to write package '{}'", self.output_path.display())
        })?;
        Ok(self.output_path)
    }
}

/// Joins a package prefix and a relative path with `/`.
pub fn join_entry(prefix: &str, relative: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        relative.to_string()
    } else {
        format!("{}/{}", prefix, relative)
    }
}
