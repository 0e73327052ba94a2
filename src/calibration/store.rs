//! Flat-field profile persistence.
//!
//! Profiles are stored as 16-bit grayscale PNGs of the flat-field mean,
//! named `ffc_<camera>_<YYYYmmdd_HHMMSSmmm>.png`. The camera tag and
//! capture time live in the name, so the newest profile for a camera is
//! the lexicographically greatest matching file.

use super::FfcProfile;
use crate::capture::CameraType;
use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use image::{ImageBuffer, Luma};
use std::path::{Path, PathBuf};
use thiserror::Error;

const PREFIX: &str = "ffc_";
const EXTENSION: &str = "png";
const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Errors that can occur while saving or loading profiles.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("profile I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("profile image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("not a flat-field profile name: {0}")]
    InvalidName(PathBuf),
    #[error("malformed profile: {0}")]
    Malformed(String),
}

/// Save/load capability for flat-field profiles.
pub trait ProfileStore {
    /// Persists `profile` and returns where it was written.
    fn save(&mut self, profile: &FfcProfile) -> Result<PathBuf, ProfileError>;

    /// Loads the profile at `path`.
    fn load(&self, path: &Path) -> Result<FfcProfile, ProfileError>;

    /// Loads the most recent profile for `camera_type`, if any exists.
    fn latest(&self, camera_type: CameraType) -> Result<Option<FfcProfile>, ProfileError>;
}

/// Profile store backed by a directory of PNG files.
#[derive(Debug, Clone)]
pub struct DirectoryProfileStore {
    dir: PathBuf,
}

impl DirectoryProfileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name for a profile captured at `at`.
    pub fn file_name(camera_type: CameraType, at: DateTime<Local>) -> String {
        format!(
            "{PREFIX}{}_{}{:03}.{EXTENSION}",
            camera_type.tag(),
            at.format(STAMP_FORMAT),
            at.timestamp_subsec_millis().min(999)
        )
    }

    fn candidates(&self, camera_type: CameraType) -> Result<Vec<PathBuf>, ProfileError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let prefix = format!("{PREFIX}{}_", camera_type.tag());
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let matches = path
                .file_name()
                .and_then(|n| n.to_str())
                .map_or(false, |n| n.starts_with(&prefix) && n.ends_with(".png"));
            if matches {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }
}

/// Parses camera tag and capture time out of a profile file name.
fn parse_name(path: &Path) -> Result<(CameraType, DateTime<Local>), ProfileError> {
    let invalid = || ProfileError::InvalidName(path.to_path_buf());
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .and_then(|s| s.strip_prefix(PREFIX))
        .ok_or_else(invalid)?;
    let (tag, stamp) = stem.split_once('_').ok_or_else(invalid)?;
    let camera_type: CameraType = tag.parse().map_err(|_| invalid())?;
    let stamp = stamp.get(..15).ok_or_else(invalid)?;
    let naive = NaiveDateTime::parse_from_str(stamp, STAMP_FORMAT).map_err(|_| invalid())?;
    let captured_at = Local
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(invalid)?;
    Ok((camera_type, captured_at))
}

impl ProfileStore for DirectoryProfileStore {
    fn save(&mut self, profile: &FfcProfile) -> Result<PathBuf, ProfileError> {
        std::fs::create_dir_all(&self.dir)?;
        let (width, height) = profile.dimensions();
        let image: ImageBuffer<Luma<u16>, Vec<u16>> =
            ImageBuffer::from_raw(width, height, profile.mean().to_vec()).ok_or_else(|| {
                ProfileError::Malformed(format!("mean does not fill {width}x{height}"))
            })?;

        let path = self
            .dir
            .join(Self::file_name(profile.camera_type(), profile.captured_at()));
        image.save(&path)?;
        tracing::info!(path = %path.display(), "Flat-field profile saved");
        Ok(path)
    }

    fn load(&self, path: &Path) -> Result<FfcProfile, ProfileError> {
        let (camera_type, captured_at) = parse_name(path)?;
        let image = image::open(path)?.into_luma16();
        let (width, height) = image.dimensions();
        let profile =
            FfcProfile::from_mean(image.into_raw(), width, height, camera_type, captured_at)
                .ok_or_else(|| ProfileError::Malformed(format!("{} is empty", path.display())))?;
        Ok(profile.with_path(path))
    }

    fn latest(&self, camera_type: CameraType) -> Result<Option<FfcProfile>, ProfileError> {
        // Newest first; skip files that fail to parse or decode.
        for path in self.candidates(camera_type)?.into_iter().rev() {
            match self.load(&path) {
                Ok(profile) => return Ok(Some(profile)),
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Skipping unreadable profile"
                    )
                }
            }
        }
        Ok(None)
    }
}
