//! Asset store: the uploads and outputs areas on disk.
//!
//! All file naming, listing and deletion inside the two areas goes through
//! here. Listings are derived from filesystem metadata on every call.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::error::{Result, SstvError};

/// Folder name of the uploads area, as used in asset references.
pub const UPLOADS_FOLDER: &str = "uploads";
/// Folder name of the generated-outputs area.
pub const OUTPUTS_FOLDER: &str = "data";

pub const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "gif"];
pub const AUDIO_EXTENSIONS: [&str; 3] = ["wav", "mp3", "flac"];

/// Second-resolution timestamp appended to generated names.
const NAME_TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";
const RECORD_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Image,
    Audio,
}

impl AssetKind {
    /// Image for the image extensions, audio for anything else.
    pub fn of(path: &Path) -> Self {
        if has_extension(path, &IMAGE_EXTENSIONS) {
            AssetKind::Image
        } else {
            AssetKind::Audio
        }
    }
}

/// Which files a listing keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KindFilter {
    Image,
    Audio,
    #[default]
    All,
}

impl KindFilter {
    fn accepts(self, path: &Path) -> bool {
        match self {
            KindFilter::Image => has_extension(path, &IMAGE_EXTENSIONS),
            KindFilter::Audio => has_extension(path, &AUDIO_EXTENSIONS),
            KindFilter::All => true,
        }
    }
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .is_some_and(|e| extensions.contains(&e.as_str()))
}

/// A file in one of the areas, as seen at listing time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetRecord {
    pub name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub created_at: String,
    pub modified_at: String,
    /// Modification time in seconds since the epoch, for ordering.
    pub timestamp: f64,
    pub kind: AssetKind,
    /// Base name of the containing directory.
    pub folder: String,
}

impl AssetRecord {
    fn from_path(path: &Path) -> std::io::Result<Self> {
        let metadata = std::fs::metadata(path)?;
        let modified = metadata.modified()?;
        let created = metadata.created().unwrap_or(modified);

        Ok(AssetRecord {
            name: file_name(path),
            path: path.to_path_buf(),
            size_bytes: metadata.len(),
            created_at: format_time(created),
            modified_at: format_time(modified),
            timestamp: modified
                .duration_since(SystemTime::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs_f64(),
            kind: AssetKind::of(path),
            folder: path.parent().map(file_name).unwrap_or_default(),
        })
    }

    pub fn size_display(&self) -> String {
        format_size(self.size_bytes)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn format_time(time: SystemTime) -> String {
    DateTime::<Local>::from(time)
        .format(RECORD_TIME_FORMAT)
        .to_string()
}

/// A file named by area folder and file name, as a caller would send it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRef {
    pub folder: String,
    pub filename: String,
}

impl AssetRef {
    pub fn new(folder: &str, filename: &str) -> Self {
        Self {
            folder: folder.to_string(),
            filename: filename.to_string(),
        }
    }
}

/// Counts from a best-effort batch delete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchDeleteReport {
    pub deleted: usize,
    pub failed: usize,
}

/// Name `original` with the current local time appended.
pub fn name_for(original: &str, prefix: Option<&str>) -> String {
    name_for_at(original, prefix, &Local::now())
}

/// `<stem>-<YYYY-MM-DD-HH-MM-SS>.<ext>`, or `<prefix>-<stem>-...` with a
/// prefix.
pub fn name_for_at(original: &str, prefix: Option<&str>, at: &DateTime<Local>) -> String {
    let path = Path::new(original);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let timestamp = at.format(NAME_TIMESTAMP_FORMAT);

    let mut name = match prefix {
        Some(prefix) if !prefix.is_empty() => format!("{}-{}-{}", prefix, stem, timestamp),
        _ => format!("{}-{}", stem, timestamp),
    };
    if let Some(ext) = path.extension() {
        name.push('.');
        name.push_str(&ext.to_string_lossy());
    }
    name
}

/// Reduce an arbitrary client-supplied name to a plain ASCII file name.
///
/// Path separators become spaces, runs of whitespace become `_`, and only
/// ASCII letters, digits, `_`, `.` and `-` survive. Leading and trailing
/// dots and underscores are stripped, so the result may be empty.
pub fn sanitize_filename(name: &str) -> String {
    let spaced: String = name
        .chars()
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();
    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();
    kept.trim_matches(|c| c == '.' || c == '_').to_string()
}

/// Human-readable size: `N B`, `N.NN KB` or `N.NN MB`.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * 1024;
    if bytes < KB {
        format!("{} B", bytes)
    } else if bytes < MB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    }
}

/// List regular files in `directory` accepted by `filter`, sorted by name.
///
/// A missing or unreadable directory lists as empty.
pub fn list(directory: &Path, filter: KindFilter) -> Vec<AssetRecord> {
    let entries = match std::fs::read_dir(directory) {
        Ok(entries) => entries,
        Err(e) => {
            log::debug!("Cannot list '{}': {}", directory.display(), e);
            return Vec::new();
        }
    };

    let mut records: Vec<AssetRecord> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && filter.accepts(path))
        .filter_map(|path| match AssetRecord::from_path(&path) {
            Ok(record) => Some(record),
            Err(e) => {
                log::warn!("Skipping '{}': {}", path.display(), e);
                None
            }
        })
        .collect();

    records.sort_by(|a, b| a.name.cmp(&b.name));
    records
}

/// Remove the file at `path`. Returns false if nothing was removed.
pub fn delete(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }
    match std::fs::remove_file(path) {
        Ok(()) => {
            log::debug!("Deleted '{}'", path.display());
            true
        }
        Err(e) => {
            log::warn!("Failed to delete '{}': {}", path.display(), e);
            false
        }
    }
}

/// Delete files in `directory` last modified at least `max_age_hours` ago.
/// Returns how many were removed.
pub fn expire(directory: &Path, max_age_hours: u64) -> usize {
    let max_age = Duration::from_secs(max_age_hours.saturating_mul(3600));
    let now = SystemTime::now();

    let entries = match std::fs::read_dir(directory) {
        Ok(entries) => entries,
        Err(e) => {
            log::debug!("Nothing to expire in '{}': {}", directory.display(), e);
            return 0;
        }
    };

    let mut removed = 0;
    for path in entries.filter_map(|e| e.ok()).map(|e| e.path()) {
        let Ok(modified) = std::fs::metadata(&path).and_then(|m| m.modified()) else {
            continue;
        };
        // Files dated in the future count as brand new.
        let age = now.duration_since(modified).unwrap_or_default();
        if age >= max_age && delete(&path) {
            removed += 1;
        }
    }

    if removed > 0 {
        log::info!(
            "Expired {} file(s) older than {}h in '{}'",
            removed,
            max_age_hours,
            directory.display()
        );
    }
    removed
}

/// The two storage areas.
#[derive(Debug, Clone)]
pub struct AssetStore {
    uploads_dir: PathBuf,
    outputs_dir: PathBuf,
}

impl AssetStore {
    /// Create a store over the given directories.
    /// Does not create them - call `ensure_dirs()` before first use.
    pub fn new(uploads_dir: impl Into<PathBuf>, outputs_dir: impl Into<PathBuf>) -> Self {
        Self {
            uploads_dir: uploads_dir.into(),
            outputs_dir: outputs_dir.into(),
        }
    }

    /// Create both areas if missing.
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.uploads_dir)?;
        std::fs::create_dir_all(&self.outputs_dir)?;
        Ok(())
    }

    pub fn uploads_dir(&self) -> &Path {
        &self.uploads_dir
    }

    pub fn outputs_dir(&self) -> &Path {
        &self.outputs_dir
    }

    /// Directory for an area folder name.
    pub fn area(&self, folder: &str) -> Result<&Path> {
        match folder {
            UPLOADS_FOLDER => Ok(&self.uploads_dir),
            OUTPUTS_FOLDER => Ok(&self.outputs_dir),
            other => Err(SstvError::InvalidLocation(format!(
                "unknown folder '{}', expected '{}' or '{}'",
                other, UPLOADS_FOLDER, OUTPUTS_FOLDER
            ))),
        }
    }

    /// Copy an inbound file into the uploads area under a timestamped name.
    pub fn ingest(&self, source: &Path, at: &DateTime<Local>) -> Result<PathBuf> {
        if !source.is_file() {
            return Err(SstvError::FileNotFound(source.to_path_buf()));
        }
        let original = upload_name(source);
        std::fs::create_dir_all(&self.uploads_dir)?;
        let target = self.uploads_dir.join(name_for_at(&original, None, at));
        std::fs::copy(source, &target)?;
        log::info!("Stored '{}' as '{}'", source.display(), target.display());
        Ok(target)
    }

    /// `<stem>-<ts>.wav` in the outputs area.
    pub fn encoded_audio_path(&self, source: &Path, at: &DateTime<Local>) -> PathBuf {
        let name = format!("{}.wav", stem_of(source));
        self.outputs_dir.join(name_for_at(&name, None, at))
    }

    /// `decoded-<stem>-<ts>.jpg` in the outputs area.
    pub fn decoded_image_path(&self, source: &Path, at: &DateTime<Local>) -> PathBuf {
        let name = format!("{}.jpg", stem_of(source));
        self.outputs_dir.join(name_for_at(&name, Some("decoded"), at))
    }

    /// `decoded-mic-<ts>.jpg` in the outputs area.
    pub fn mic_image_path(&self, at: &DateTime<Local>) -> PathBuf {
        self.outputs_dir.join(name_for_at("mic.jpg", Some("decoded"), at))
    }

    /// Scratch WAV for a live capture that will become `image_path`, kept
    /// in the outputs area only while it is being decoded.
    pub fn recording_path(&self, image_path: &Path) -> PathBuf {
        self.outputs_dir
            .join(format!("{}.recording.wav", stem_of(image_path)))
    }

    /// Validated path of an existing file in one of the areas.
    pub fn resolve(&self, folder: &str, filename: &str) -> Result<PathBuf> {
        let dir = self.area(folder)?;
        if filename.is_empty()
            || filename == "."
            || filename == ".."
            || filename.contains(['/', '\\'])
        {
            return Err(SstvError::InvalidLocation(format!(
                "'{}' is not a plain file name",
                filename
            )));
        }
        let path = dir.join(filename);
        if !path.is_file() {
            return Err(SstvError::FileNotFound(path));
        }
        Ok(path)
    }

    /// Delete one file by folder and name.
    pub fn remove(&self, folder: &str, filename: &str) -> Result<PathBuf> {
        let path = self.resolve(folder, filename)?;
        std::fs::remove_file(&path)?;
        log::info!("Deleted '{}'", path.display());
        Ok(path)
    }

    /// Copy a stored file out of the store. A directory `dest` receives the
    /// file under its stored name. Returns the written path.
    pub fn export(&self, folder: &str, filename: &str, dest: &Path) -> Result<PathBuf> {
        let source = self.resolve(folder, filename)?;
        let target = if dest.is_dir() {
            dest.join(filename)
        } else {
            dest.to_path_buf()
        };
        if let Some(parent) = target.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::copy(&source, &target)?;
        log::info!("Exported '{}' to '{}'", source.display(), target.display());
        Ok(target)
    }

    /// Delete every referenced file that resolves. Invalid or missing
    /// references count as failures and do not stop the batch.
    pub fn delete_many(&self, refs: &[AssetRef]) -> BatchDeleteReport {
        let mut report = BatchDeleteReport::default();
        for asset in refs {
            match self.resolve(&asset.folder, &asset.filename) {
                Ok(path) if delete(&path) => report.deleted += 1,
                Ok(_) => report.failed += 1,
                Err(e) => {
                    log::warn!("Not deleting {}/{}: {}", asset.folder, asset.filename, e);
                    report.failed += 1;
                }
            }
        }
        report
    }

    /// Both areas filtered by kind, newest first. Records carry the area
    /// folder name whatever the directories are called on disk.
    pub fn browse(&self, filter: KindFilter) -> Vec<AssetRecord> {
        let mut records = Vec::new();
        for (folder, dir) in [
            (UPLOADS_FOLDER, &self.uploads_dir),
            (OUTPUTS_FOLDER, &self.outputs_dir),
        ] {
            records.extend(list(dir, filter).into_iter().map(|mut r| {
                r.folder = folder.to_string();
                r
            }));
        }
        records.sort_by(|a, b| b.timestamp.total_cmp(&a.timestamp));
        records
    }

    /// Expire old files in both areas.
    pub fn expire_all(&self, max_age_hours: u64) -> usize {
        expire(&self.uploads_dir, max_age_hours) + expire(&self.outputs_dir, max_age_hours)
    }
}

/// Sanitized file name of an inbound file, never empty.
fn upload_name(source: &Path) -> String {
    let name = sanitize_filename(&file_name(source));
    if name.is_empty() {
        "upload".to_string()
    } else {
        name
    }
}

fn stem_of(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| sanitize_filename(&s.to_string_lossy()))
        .unwrap_or_default();
    if stem.is_empty() {
        "upload".to_string()
    } else {
        stem
    }
}
