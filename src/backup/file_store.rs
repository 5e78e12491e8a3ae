//! Backup directory management
//!
//! Artifacts are named `backup-YYYYMMDD-HHMMSS.drb` after their local
//! creation time, with `-N` appended when that name is taken. They are
//! written to a hidden temporary file in the backup directory first and
//! only linked under their final name once complete, so `list` never sees a
//! partial artifact.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use chrono::{NaiveDateTime, Timelike};
use serde::Serialize;
use tempfile::{Builder, NamedTempFile};

use crate::crypto::encryption::MAGIC;

/// File name prefix of every artifact
pub const BACKUP_PREFIX: &str = "backup-";

/// File extension of every artifact, encrypted or not
pub const BACKUP_EXTENSION: &str = "drb";

const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";
const TIMESTAMP_LEN: usize = 15;
const MAX_SUFFIX: u32 = 999;

/// A completed backup file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackupArtifact {
    pub file_name: String,
    pub path: PathBuf,
    /// Exact size of the file on disk
    pub size_bytes: u64,
    /// Creation time in local time, second resolution
    pub created_at: NaiveDateTime,
    pub is_encrypted: bool,
}

/// Build the artifact file name for a timestamp and collision suffix
pub fn artifact_file_name(created_at: NaiveDateTime, suffix: u32) -> String {
    let stamp = created_at.format(TIMESTAMP_FORMAT);
    if suffix == 0 {
        format!("{}{}.{}", BACKUP_PREFIX, stamp, BACKUP_EXTENSION)
    } else {
        format!("{}{}-{}.{}", BACKUP_PREFIX, stamp, suffix, BACKUP_EXTENSION)
    }
}

/// Parse an artifact file name into its timestamp and collision suffix
pub fn parse_artifact_file_name(file_name: &str) -> Option<(NaiveDateTime, u32)> {
    let stem = file_name
        .strip_prefix(BACKUP_PREFIX)?
        .strip_suffix(BACKUP_EXTENSION)?
        .strip_suffix('.')?;

    let stamp = stem.get(..TIMESTAMP_LEN)?;
    let created_at = NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).ok()?;

    let suffix = match &stem[TIMESTAMP_LEN..] {
        "" => 0,
        rest => {
            let digits = rest.strip_prefix('-')?;
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            match digits.parse::<u32>().ok()? {
                0 => return None,
                n => n,
            }
        }
    };

    Some((created_at, suffix))
}

/// Whether a file starts with the encrypted container magic
fn peek_encrypted(path: &Path) -> io::Result<bool> {
    let mut head = [0u8; 4];
    let mut file = File::open(path)?;
    let mut filled = 0;
    while filled < head.len() {
        match file.read(&mut head[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled == head.len() && &head == MAGIC)
}

/// Manages the backup directory
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write bytes to a temporary file in the backup directory
    ///
    /// Nothing is visible to `list` until [`PendingArtifact::commit`];
    /// dropping the pending artifact removes the temporary file.
    pub fn stage(&self, bytes: &[u8]) -> io::Result<PendingArtifact> {
        fs::create_dir_all(&self.dir)?;

        let mut temp = Builder::new()
            .prefix(".backup-")
            .suffix(".partial")
            .tempfile_in(&self.dir)?;
        temp.write_all(bytes)?;
        temp.as_file().sync_all()?;

        Ok(PendingArtifact {
            temp,
            dir: self.dir.clone(),
            size_bytes: bytes.len() as u64,
            is_encrypted: bytes.starts_with(MAGIC),
        })
    }

    /// Stage and commit in one step
    pub fn write_atomic(
        &self,
        created_at: NaiveDateTime,
        bytes: &[u8],
    ) -> io::Result<BackupArtifact> {
        self.stage(bytes)?.commit(created_at)
    }

    /// Every recognized artifact, most recent first
    pub fn list(&self) -> io::Result<Vec<BackupArtifact>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut artifacts = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            let Some((created_at, suffix)) = entry
                .file_name()
                .to_str()
                .and_then(parse_artifact_file_name)
            else {
                continue;
            };

            match self.describe(&path, created_at) {
                Ok(artifact) => artifacts.push((suffix, artifact)),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable backup")
                }
            }
        }

        artifacts.sort_by(|(a_suffix, a), (b_suffix, b)| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b_suffix.cmp(a_suffix))
        });

        Ok(artifacts.into_iter().map(|(_, artifact)| artifact).collect())
    }

    pub fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    /// Delete an artifact; files not named like an artifact are refused
    pub fn delete(&self, path: &Path) -> io::Result<()> {
        recognized_name(path)?;
        fs::remove_file(path)
    }

    fn describe(&self, path: &Path, created_at: NaiveDateTime) -> io::Result<BackupArtifact> {
        let metadata = fs::metadata(path)?;
        if !metadata.is_file() {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"));
        }

        Ok(BackupArtifact {
            file_name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            path: path.to_path_buf(),
            size_bytes: metadata.len(),
            created_at,
            is_encrypted: peek_encrypted(path)?,
        })
    }
}

fn recognized_name(path: &Path) -> io::Result<(NaiveDateTime, u32)> {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(parse_artifact_file_name)
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a backup file", path.display()),
            )
        })
}

/// A fully written artifact waiting for its final name
#[derive(Debug)]
pub struct PendingArtifact {
    temp: NamedTempFile,
    dir: PathBuf,
    size_bytes: u64,
    is_encrypted: bool,
}

impl PendingArtifact {
    /// Link the artifact under its final name without replacing any file
    pub fn commit(self, created_at: NaiveDateTime) -> io::Result<BackupArtifact> {
        let created_at = created_at.with_nanosecond(0).unwrap_or(created_at);
        let mut temp = self.temp;

        for suffix in 0..=MAX_SUFFIX {
            let file_name = artifact_file_name(created_at, suffix);
            let path = self.dir.join(&file_name);

            match temp.persist_noclobber(&path) {
                Ok(_) => {
                    return Ok(BackupArtifact {
                        file_name,
                        path,
                        size_bytes: self.size_bytes,
                        created_at,
                        is_encrypted: self.is_encrypted,
                    })
                }
                Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => temp = e.file,
                Err(e) => return Err(e.error),
            }
        }

        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("no free backup name for {}", created_at.format(TIMESTAMP_FORMAT)),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 11, 27)
            .unwrap()
            .and_hms_milli_opt(h, m, s, 250)
            .unwrap()
    }

    fn store() -> (FileStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        (FileStore::new(temp_dir.path().join("backups")), temp_dir)
    }

    #[test]
    fn test_file_names() {
        assert_eq!(artifact_file_name(at(14, 30, 22), 0), "backup-20251127-143022.drb");
        assert_eq!(artifact_file_name(at(14, 30, 22), 3), "backup-20251127-143022-3.drb");

        let (created, suffix) = parse_artifact_file_name("backup-20251127-143022-12.drb").unwrap();
        assert_eq!(created, at(14, 30, 22).with_nanosecond(0).unwrap());
        assert_eq!(suffix, 12);

        for name in [
            "backup-20251127-143022.json",
            "backup-20251127.drb",
            "backup-20251327-143022.drb",
            "backup-20251127-143022-.drb",
            "backup-20251127-143022-0.drb",
            "backup-20251127-143022-x1.drb",
            ".backup-abc.partial",
        ] {
            assert!(parse_artifact_file_name(name).is_none(), "{}", name);
        }
    }

    #[test]
    fn test_write_atomic_reports_exact_size() {
        let (store, _temp) = store();
        let artifact = store.write_atomic(at(9, 0, 0), b"\x1f\x8bdata").unwrap();

        assert_eq!(artifact.file_name, "backup-20251127-090000.drb");
        assert_eq!(artifact.size_bytes, fs::metadata(&artifact.path).unwrap().len());
        assert!(!artifact.is_encrypted);
        assert_eq!(store.list().unwrap(), vec![artifact]);
    }

    #[test]
    fn test_collision_appends_suffix() {
        let (store, _temp) = store();
        let first = store.write_atomic(at(9, 0, 0), b"one").unwrap();
        let second = store.write_atomic(at(9, 0, 0), b"two").unwrap();
        let third = store.write_atomic(at(9, 0, 0), b"three").unwrap();

        assert_eq!(second.file_name, "backup-20251127-090000-1.drb");
        assert_eq!(third.file_name, "backup-20251127-090000-2.drb");
        assert_eq!(fs::read(&first.path).unwrap(), b"one");

        let names: Vec<_> = store.list().unwrap().into_iter().map(|a| a.file_name).collect();
        assert_eq!(names, vec![third.file_name, second.file_name, first.file_name]);
    }

    #[test]
    fn test_list_newest_first_and_filters() {
        let (store, _temp) = store();
        store.write_atomic(at(8, 0, 0), b"old").unwrap();
        store.write_atomic(at(10, 0, 0), b"DRBE-sealed").unwrap();
        store.write_atomic(at(9, 0, 0), b"mid").unwrap();
        fs::write(store.dir().join("notes.txt"), "ignore me").unwrap();
        fs::write(store.dir().join("backup-20251127-110000.json"), "{}").unwrap();

        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 3);
        assert_eq!(listed[0].created_at, at(10, 0, 0).with_nanosecond(0).unwrap());
        assert!(listed[0].is_encrypted);
        assert_eq!(listed[2].created_at, at(8, 0, 0).with_nanosecond(0).unwrap());
    }

    #[test]
    fn test_uncommitted_stage_leaves_nothing() {
        let (store, _temp) = store();
        let pending = store.stage(b"half a backup").unwrap();
        assert!(store.list().unwrap().is_empty());

        drop(pending);
        assert_eq!(fs::read_dir(store.dir()).unwrap().count(), 0);
    }

    #[test]
    fn test_missing_dir_lists_empty() {
        let (store, _temp) = store();
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_delete_refuses_other_files() {
        let (store, _temp) = store();
        let artifact = store.write_atomic(at(9, 0, 0), b"bytes").unwrap();
        let other = store.dir().join("keep.json");
        fs::write(&other, "{}").unwrap();

        let err = store.delete(&other).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(other.exists());

        store.delete(&artifact.path).unwrap();
        assert!(!artifact.path.exists());
        assert_eq!(
            store.delete(&artifact.path).unwrap_err().kind(),
            io::ErrorKind::NotFound
        );
    }
}
