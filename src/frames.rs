//! Frame discovery and decoding.
//!
//! A frame set is the list of `.png` files sitting directly inside one
//! directory, ordered by file name. Nothing below the top level is visited,
//! and hidden files (leading `.`) are not frames.

use std::collections::BTreeSet;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use image::RgbImage;
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Extension (without the dot) of the files picked up as frames.
pub const FRAME_EXTENSION: &str = "png";

/// The `.png` frames of one directory in lexicographic file-name order.
#[derive(Debug, Clone)]
pub struct FrameSet {
    dir: PathBuf,
    names: Vec<OsString>,
}

impl FrameSet {
    /// List the frames of `dir`.
    pub fn scan(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(Error::io(
                dir,
                std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
            ));
        }

        let mut names: Vec<OsString> = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(dir).to_path_buf();
                Error::io(path, e.into())
            })?;
            let path = entry.path();
            if !path.extension().is_some_and(|e| e == FRAME_EXTENSION) {
                continue;
            }
            if entry.file_type().is_dir() || is_hidden(entry.file_name()) {
                continue;
            }
            names.push(entry.file_name().to_os_string());
        }
        names.sort();

        Ok(Self {
            dir: dir.to_path_buf(),
            names,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn names(&self) -> &[OsString] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Full path of frame `name` inside this set's directory.
    pub fn path_of(&self, name: &OsStr) -> PathBuf {
        self.dir.join(name)
    }

    pub fn paths(&self) -> impl Iterator<Item = PathBuf> + '_ {
        self.names.iter().map(|n| self.dir.join(n))
    }
}

fn is_hidden(name: &OsStr) -> bool {
    name.as_encoded_bytes().starts_with(b".")
}

/// Decode one frame as 8-bit RGB.
pub fn load_frame(path: &Path) -> Result<RgbImage> {
    let img = image::open(path).map_err(|source| match source {
        image::ImageError::IoError(io) => Error::io(path, io),
        other => Error::Decode {
            path: path.to_path_buf(),
            source: other,
        },
    })?;
    Ok(img.to_rgb8())
}

/// Check that every set holds exactly the frame names of the first one.
pub fn check_matching_sets(sets: &[FrameSet]) -> Result<()> {
    let Some((reference, rest)) = sets.split_first() else {
        return Ok(());
    };
    let want: BTreeSet<&OsStr> = reference.names.iter().map(OsString::as_os_str).collect();

    for set in rest {
        let have: BTreeSet<&OsStr> = set.names.iter().map(OsString::as_os_str).collect();
        if have == want {
            continue;
        }
        let missing = want
            .difference(&have)
            .map(|s| s.to_string_lossy().into_owned())
            .collect();
        let extra = have
            .difference(&want)
            .map(|s| s.to_string_lossy().into_owned())
            .collect();
        return Err(Error::FrameSetMismatch {
            reference: reference.dir.clone(),
            dir: set.dir.clone(),
            missing,
            extra,
        });
    }
    Ok(())
}
