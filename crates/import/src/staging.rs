//! Staging of uploaded activity files.
//!
//! An upload is saved into a staging directory, read, and deleted again.
//! Files already resident on disk are read in place and left alone.

use regex::Regex;
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tally_core::ActivityRecordSet;

use crate::csv::{ActivityError, ActivityParser};

static UNSAFE_FILENAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_.-]").expect("filename pattern is valid"));

/// A file handed over by the host, not yet written anywhere.
pub trait ActivityUpload {
    /// The client-supplied name; untrusted.
    fn filename(&self) -> &str;

    fn save(&self, destination: &Path) -> io::Result<()>;
}

/// An upload held entirely in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferedUpload {
    pub filename: String,
    pub contents: Vec<u8>,
}

impl BufferedUpload {
    pub fn new(filename: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            contents: contents.into(),
        }
    }
}

impl ActivityUpload for BufferedUpload {
    fn filename(&self) -> &str {
        &self.filename
    }

    fn save(&self, destination: &Path) -> io::Result<()> {
        fs::write(destination, &self.contents)
    }
}

/// Where the activity comes from.
#[derive(Clone, Copy)]
pub enum ActivitySource<'a> {
    Path(&'a Path),
    Upload(&'a dyn ActivityUpload),
}

/// Reduces an untrusted filename to a safe, flat ASCII name.
///
/// Path separators become whitespace, whitespace runs become `_`, anything
/// outside `[A-Za-z0-9_.-]` is dropped and leading or trailing `.`/`_` are
/// stripped. The result may be empty.
pub fn secure_filename(filename: &str) -> String {
    let flattened = filename.replace(['/', '\\'], " ");
    let joined = flattened.split_whitespace().collect::<Vec<_>>().join("_");
    UNSAFE_FILENAME_CHARS
        .replace_all(&joined, "")
        .trim_matches(|c: char| c == '.' || c == '_')
        .to_string()
}

/// Saves uploads into a staging directory and removes them again.
///
/// Each staged file gets a unique name built from the sanitized upload name,
/// so loaders sharing a directory never touch each other's files. Staged
/// files are deleted by [`cleanup`](Self::cleanup) or, failing that,
/// when the loader is dropped.
#[derive(Debug)]
pub struct ActivityLoader {
    staging_dir: PathBuf,
    loaded_files: Vec<PathBuf>,
}

impl ActivityLoader {
    pub fn new(staging_dir: impl Into<PathBuf>) -> Result<Self, ActivityError> {
        let staging_dir = staging_dir.into();
        fs::create_dir_all(&staging_dir)?;
        Ok(Self {
            staging_dir,
            loaded_files: Vec::new(),
        })
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    pub fn loaded_files(&self) -> &[PathBuf] {
        &self.loaded_files
    }

    pub fn upload(&mut self, upload: &dyn ActivityUpload) -> Result<PathBuf, ActivityError> {
        let filename = secure_filename(upload.filename());
        if filename.is_empty() {
            return Err(ActivityError::NoFileSpecified);
        }

        let (stem, extension) = match filename.rsplit_once('.') {
            Some((stem, extension)) => (stem, format!(".{extension}")),
            None => (filename.as_str(), String::new()),
        };
        let (_, path) = tempfile::Builder::new()
            .prefix(&format!("{stem}-"))
            .suffix(&extension)
            .tempfile_in(&self.staging_dir)?
            .keep()
            .map_err(|e| e.error)?;
        self.loaded_files.push(path.clone());

        upload.save(&path)?;
        tracing::debug!(path = %path.display(), "staged activity upload");
        Ok(path)
    }

    pub fn cleanup(&mut self) -> Result<(), ActivityError> {
        while let Some(path) = self.loaded_files.pop() {
            match fs::remove_file(&path) {
                Ok(()) => tracing::debug!(path = %path.display(), "removed staged activity file"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

impl Drop for ActivityLoader {
    fn drop(&mut self) {
        if let Err(e) = self.cleanup() {
            tracing::warn!(error = %e, "failed to remove staged activity files");
        }
    }
}

/// Stages (if needed) and parses an activity file.
pub fn parse_activity_file(
    source: ActivitySource<'_>,
    staging_dir: &Path,
) -> Result<ActivityRecordSet, ActivityError> {
    let mut loader = ActivityLoader::new(staging_dir)?;
    let path = match source {
        ActivitySource::Path(path) => path.to_path_buf(),
        ActivitySource::Upload(upload) => loader.upload(upload)?,
    };

    let file = File::open(&path)?;
    let records = ActivityParser::parse_reader(BufReader::new(file))?;
    loader.cleanup()?;
    tracing::info!(path = %path.display(), records = records.len(), "loaded activity file");
    Ok(records)
}

/// Like [`parse_activity_file`], but an unrecognized format yields `Ok(None)`
/// so the host can ask for a different file.
pub fn parse_transaction_activity_file(
    source: ActivitySource<'_>,
    staging_dir: &Path,
) -> Result<Option<ActivityRecordSet>, ActivityError> {
    match parse_activity_file(source, staging_dir) {
        Ok(records) => Ok(Some(records)),
        Err(e @ ActivityError::UnrecognizedFormat { .. }) => {
            tracing::warn!(message = %e.user_message(), "activity format not recognized");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
