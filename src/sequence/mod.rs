//! Frame-sequence tokenizing, compaction, and directory scanning.
//!
//! A render writes hundreds of numbered files; this module folds them back
//! into compact, human-readable descriptors (`bg.1-3,5-6,8#.exr`) and expands
//! descriptors back to the exact frame set that was observed.

pub mod compactor;
pub mod token;

pub use compactor::{compact, SequenceDescriptor, SequenceRange};
pub use token::FrameToken;

use std::path::Path;

use tracing::{debug, info};

use crate::error::{Result, SequenceError};

/// Scan a directory and compact its regular files into sequence descriptors.
///
/// Subdirectories and hidden files are ignored; everything else flows through
/// [`compact`], so a file name without an extension separator surfaces as
/// [`SequenceError::MalformedName`] rather than being dropped silently.
pub fn scan_sequences<P: AsRef<Path>>(dir: P) -> Result<Vec<SequenceDescriptor>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(SequenceError::NotADirectory {
            path: dir.display().to_string(),
        }
        .into());
    }

    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            debug!("Skipping non-file entry: {:?}", entry.path());
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            debug!("Skipping hidden file: {}", name);
            continue;
        }
        names.push(name);
    }

    let descriptors = compact(names)?;
    info!(
        "Scanned {:?}: {} sequence(s) found",
        dir,
        descriptors.len()
    );
    Ok(descriptors)
}
