//! Koma Tape (`.kmt`) backups of a VFS tree.
//!
//! A tape is a JSON envelope whose `data` field is the base64 encoding of a
//! compact JSON array of entries. Directories are stored before files and
//! shallower paths before deeper ones, so a restore can replay the entries
//! in order without creating parents on demand.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use koma_types::error::{KomaError, Result};

use crate::{EntryKind, Vfs};

/// Value of the envelope's `format` field.
pub const TAPE_FORMAT: &str = "kmt";

/// Tape format version written by [`Tape::capture`].
pub const TAPE_VERSION: &str = "1.0";

/// Serialized envelope of a `.kmt` file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tape {
    pub format: String,
    pub version: String,
    pub created: String,
    pub label: String,
    pub compression: String,
    pub checksum: TapeChecksum,
    pub stats: TapeStats,
    /// Base64 of the JSON entry array.
    pub data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TapeChecksum {
    /// Hex SHA-256 of the decoded entry array. Fixture tapes may carry a
    /// placeholder here, which is not verified.
    pub uncompressed: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TapeStats {
    pub files: u64,
    pub directories: u64,
    /// Length in bytes of the decoded entry array.
    pub size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TapeEntryKind {
    File,
    Directory,
}

/// One file or directory on a tape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TapeEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: TapeEntryKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    pub created: String,
    pub modified: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

fn is_sha256_hex(value: &str) -> bool {
    value.len() == 64 && value.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Restore order: directories, then depth, then path.
fn sort_entries(entries: &mut [TapeEntry]) {
    entries.sort_by(|a, b| {
        let rank = |e: &TapeEntry| (e.kind == TapeEntryKind::File, e.path.matches('/').count());
        rank(a).cmp(&rank(b)).then_with(|| a.path.cmp(&b.path))
    });
}

fn collect(vfs: &dyn Vfs, dir: &str, stamp: &str, out: &mut Vec<TapeEntry>) -> Result<()> {
    for entry in vfs.readdir(dir)? {
        let path = if dir == "/" {
            format!("/{}", entry.name)
        } else {
            format!("{dir}/{}", entry.name)
        };
        match entry.kind {
            EntryKind::Directory => {
                out.push(TapeEntry {
                    path: path.clone(),
                    kind: TapeEntryKind::Directory,
                    size: None,
                    created: stamp.to_string(),
                    modified: stamp.to_string(),
                    content: None,
                });
                collect(vfs, &path, stamp, out)?;
            },
            EntryKind::File => {
                let content = vfs.read_to_string(&path)?;
                out.push(TapeEntry {
                    path,
                    kind: TapeEntryKind::File,
                    size: Some(content.len() as u64),
                    created: stamp.to_string(),
                    modified: stamp.to_string(),
                    content: Some(content),
                });
            },
        }
    }
    Ok(())
}

impl Tape {
    /// Build a tape from pre-made entries.
    pub fn from_entries(label: &str, mut entries: Vec<TapeEntry>) -> Result<Self> {
        sort_entries(&mut entries);
        let json = serde_json::to_string(&entries)?;
        let files = entries
            .iter()
            .filter(|e| e.kind == TapeEntryKind::File)
            .count() as u64;
        Ok(Self {
            format: TAPE_FORMAT.to_string(),
            version: TAPE_VERSION.to_string(),
            created: now_timestamp(),
            label: label.to_string(),
            compression: "none".to_string(),
            checksum: TapeChecksum {
                uncompressed: sha256_hex(json.as_bytes()),
            },
            stats: TapeStats {
                files,
                directories: entries.len() as u64 - files,
                size: json.len() as u64,
            },
            data: STANDARD.encode(json.as_bytes()),
        })
    }

    /// Snapshot every file and directory below `/`.
    pub fn capture(vfs: &dyn Vfs, label: &str) -> Result<Self> {
        let stamp = now_timestamp();
        let mut entries = Vec::new();
        collect(vfs, "/", &stamp, &mut entries)?;
        let tape = Self::from_entries(label, entries)?;
        log::debug!(
            "Captured tape '{label}': {} dirs, {} files",
            tape.stats.directories,
            tape.stats.files
        );
        Ok(tape)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let tape: Tape = serde_json::from_str(text)?;
        if tape.format != TAPE_FORMAT {
            return Err(KomaError::Tape(format!(
                "unsupported format: {}",
                tape.format
            )));
        }
        Ok(tape)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Decode the entry array.
    pub fn entries(&self) -> Result<Vec<TapeEntry>> {
        if self.compression != "none" {
            return Err(KomaError::Tape(format!(
                "unsupported compression: {}",
                self.compression
            )));
        }
        let bytes = STANDARD
            .decode(self.data.trim())
            .map_err(|e| KomaError::Tape(format!("invalid data encoding: {e}")))?;
        let expected = &self.checksum.uncompressed;
        if is_sha256_hex(expected) && !expected.eq_ignore_ascii_case(&sha256_hex(&bytes)) {
            return Err(KomaError::Tape("checksum mismatch".to_string()));
        }
        let mut entries: Vec<TapeEntry> = serde_json::from_slice(&bytes)?;
        sort_entries(&mut entries);
        Ok(entries)
    }

    /// Replay the tape into `vfs`, overwriting files that already exist.
    pub fn restore(&self, vfs: &mut dyn Vfs) -> Result<TapeStats> {
        let mut stats = TapeStats::default();
        for entry in self.entries()? {
            match entry.kind {
                TapeEntryKind::Directory => {
                    vfs.mkdir(&entry.path)?;
                    stats.directories += 1;
                },
                TapeEntryKind::File => {
                    let content = entry.content.unwrap_or_default();
                    vfs.write(&entry.path, content.as_bytes())?;
                    stats.files += 1;
                    stats.size += content.len() as u64;
                },
            }
        }
        log::info!(
            "Restored tape '{}': {} dirs, {} files",
            self.label,
            stats.directories,
            stats.files
        );
        Ok(stats)
    }
}
