//! Version-directory enumeration and race-free creation.
//!
//! Versions live as numbered subdirectories (`v001`, `v002`, ...) under a
//! resolved task directory. Multiple host processes publish into the same
//! shared storage, so the mutual-exclusion primitive is the filesystem
//! itself: exclusive directory creation, retried with an incremented number
//! on collision, never an in-process lock.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{Result, VersionError};

/// Default bounded retry count for contended version creation.
const DEFAULT_MAX_RETRIES: usize = 32;

/// Enumerates and creates version directories under a fixed naming
/// convention: `prefix` followed by a zero-padded integer.
#[derive(Debug, Clone)]
pub struct VersionManager {
    prefix: String,
    padding: usize,
    max_retries: usize,
}

impl Default for VersionManager {
    fn default() -> Self {
        Self {
            prefix: "v".to_string(),
            padding: 3,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl VersionManager {
    pub fn new(prefix: impl Into<String>, padding: usize, max_retries: usize) -> Self {
        Self {
            prefix: prefix.into(),
            padding,
            max_retries,
        }
    }

    /// Directory name for a version number, e.g. `v007`.
    pub fn dir_name(&self, version: u32) -> String {
        format!("{}{:0width$}", self.prefix, version, width = self.padding)
    }

    /// Parse a directory entry name back to a version number. Any digit
    /// width is accepted on read; only creation enforces the padding.
    fn parse_entry(&self, name: &str) -> Option<u32> {
        let digits = name.strip_prefix(&self.prefix)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }

    /// All version numbers present under `dir`, ascending. A directory that
    /// does not exist yet simply has no versions.
    pub fn list<P: AsRef<Path>>(&self, dir: P) -> Result<Vec<u32>> {
        let dir = dir.as_ref();
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut versions = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name();
            match self.parse_entry(&name.to_string_lossy()) {
                Some(version) => versions.push(version),
                None => debug!("Ignoring non-version entry {:?} in {:?}", name, dir),
            }
        }

        versions.sort_unstable();
        Ok(versions)
    }

    /// Highest existing version under `dir`. Read-only; fails with
    /// [`VersionError::NoVersionsFound`] when nothing has been published,
    /// which callers must distinguish from a version numbered zero.
    pub fn latest<P: AsRef<Path>>(&self, dir: P) -> Result<u32> {
        let dir = dir.as_ref();
        self.list(dir)?
            .last()
            .copied()
            .ok_or_else(|| {
                VersionError::NoVersionsFound {
                    directory: dir.display().to_string(),
                }
                .into()
            })
    }

    /// The version number the next publish would receive. Read-only and
    /// advisory: another process may claim it first. Use
    /// [`VersionManager::create_next`] to actually claim a number.
    pub fn peek_next<P: AsRef<Path>>(&self, dir: P) -> Result<u32> {
        Ok(self.list(dir)?.last().map_or(1, |v| v + 1))
    }

    /// Claim and materialize the next version directory under `dir`.
    ///
    /// Safe under cross-process contention: the candidate is claimed with an
    /// exclusive `create_dir`, and a collision (someone else claimed it
    /// between our listing and our create) bumps the number and retries, up
    /// to a bounded count. Persistent contention surfaces as
    /// [`VersionError::VersionExhausted`].
    pub fn create_next<P: AsRef<Path>>(&self, dir: P) -> Result<(u32, PathBuf)> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        let mut candidate = self.peek_next(dir)?;
        for attempt in 0..self.max_retries {
            let path = dir.join(self.dir_name(candidate));
            match std::fs::create_dir(&path) {
                Ok(()) => {
                    info!("Created version {} at {:?}", candidate, path);
                    return Ok((candidate, path));
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!(
                        "Version {} already claimed (attempt {}), retrying",
                        candidate,
                        attempt + 1
                    );
                    candidate += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }

        warn!(
            "Gave up claiming a version under {:?} after {} attempts",
            dir, self.max_retries
        );
        Err(VersionError::VersionExhausted {
            directory: dir.display().to_string(),
            attempts: self.max_retries,
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_first_version_is_one() {
        let tmp = tempdir().unwrap();
        let versions = VersionManager::default();

        let (version, path) = versions.create_next(tmp.path()).unwrap();
        assert_eq!(version, 1);
        assert_eq!(path, tmp.path().join("v001"));
        assert!(path.is_dir());
    }

    #[test]
    fn test_next_skips_gaps_to_max_plus_one() {
        let tmp = tempdir().unwrap();
        let versions = VersionManager::default();
        std::fs::create_dir(tmp.path().join("v001")).unwrap();
        std::fs::create_dir(tmp.path().join("v005")).unwrap();

        assert_eq!(versions.peek_next(tmp.path()).unwrap(), 6);
        let (version, _) = versions.create_next(tmp.path()).unwrap();
        assert_eq!(version, 6);
    }

    #[test]
    fn test_latest_on_empty_directory_is_an_error() {
        let tmp = tempdir().unwrap();
        let versions = VersionManager::default();

        let result = versions.latest(tmp.path());
        assert!(matches!(
            result,
            Err(crate::PipelineError::Version(
                VersionError::NoVersionsFound { .. }
            ))
        ));
    }

    #[test]
    fn test_latest_ignores_foreign_entries() {
        let tmp = tempdir().unwrap();
        let versions = VersionManager::default();
        std::fs::create_dir(tmp.path().join("v002")).unwrap();
        std::fs::create_dir(tmp.path().join("preview")).unwrap();
        std::fs::create_dir(tmp.path().join("v_old")).unwrap();
        std::fs::write(tmp.path().join("v099"), b"a file, not a version").unwrap();

        assert_eq!(versions.latest(tmp.path()).unwrap(), 2);
    }

    #[test]
    fn test_unpadded_entries_still_count() {
        let tmp = tempdir().unwrap();
        let versions = VersionManager::default();
        std::fs::create_dir(tmp.path().join("v7")).unwrap();

        assert_eq!(versions.latest(tmp.path()).unwrap(), 7);
        assert_eq!(versions.peek_next(tmp.path()).unwrap(), 8);
    }

    #[test]
    fn test_missing_parent_means_no_versions() {
        let tmp = tempdir().unwrap();
        let versions = VersionManager::default();
        let dir = tmp.path().join("does/not/exist");

        assert!(versions.list(&dir).unwrap().is_empty());
        assert!(versions.latest(&dir).is_err());
        assert_eq!(versions.peek_next(&dir).unwrap(), 1);
    }

    #[test]
    fn test_concurrent_claims_get_distinct_consecutive_numbers() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path().to_path_buf();
        const N: usize = 8;

        let mut claimed: Vec<u32> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..N)
                .map(|_| {
                    let versions = VersionManager::default();
                    let dir = dir.clone();
                    scope.spawn(move || versions.create_next(&dir).unwrap().0)
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        claimed.sort_unstable();
        let expected: Vec<u32> = (1..=N as u32).collect();
        assert_eq!(claimed, expected, "no collisions, no gaps");
    }

    #[test]
    fn test_exhaustion_is_bounded() {
        let tmp = tempdir().unwrap();
        // Zero retries allowed: the very first claim attempt cannot happen.
        let versions = VersionManager::new("v", 3, 0);

        let result = versions.create_next(tmp.path());
        assert!(matches!(
            result,
            Err(crate::PipelineError::Version(
                VersionError::VersionExhausted { attempts: 0, .. }
            ))
        ));
    }
}
