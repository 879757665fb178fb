use crate::error::{UploadError, UploadResult};
use crate::upload::types::UploadCandidate;
use crate::upload::validator::{count_error, file_errors, ValidationResult, ValidationRules};
use crate::utils::byte_size::ByteSize;
use ignore::Walk;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A file picked from disk, loaded only when the rules could accept it.
#[derive(Debug)]
pub enum StagedFile {
    Ready(UploadCandidate),
    /// Known from metadata alone; the content was never read.
    Unread {
        path: PathBuf,
        name: String,
        mime_type: String,
        size_bytes: u64,
    },
}

impl StagedFile {
    pub fn name(&self) -> &str {
        match self {
            StagedFile::Ready(candidate) => candidate.display_name(),
            StagedFile::Unread { name, .. } => name,
        }
    }

    pub fn mime_type(&self) -> &str {
        match self {
            StagedFile::Ready(candidate) => candidate.mime_type(),
            StagedFile::Unread { mime_type, .. } => mime_type,
        }
    }

    pub fn size_bytes(&self) -> u64 {
        match self {
            StagedFile::Ready(candidate) => candidate.size_bytes(),
            StagedFile::Unread { size_bytes, .. } => *size_bytes,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, StagedFile::Ready(_))
    }
}

#[derive(Debug, Default)]
pub struct StagedBatch {
    files: Vec<StagedFile>,
}

impl StagedBatch {
    pub fn files(&self) -> &[StagedFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Same rules and message order as [`validate`](crate::upload::validate),
    /// applied to every staged file whether or not it was loaded.
    pub fn validate(&self, rules: &ValidationRules) -> ValidationResult {
        let mut errors: Vec<String> = count_error(self.files.len(), rules).into_iter().collect();
        for file in &self.files {
            file_errors(
                file.name(),
                file.mime_type(),
                file.size_bytes(),
                rules,
                &mut errors,
            );
        }
        ValidationResult::from_errors(errors)
    }

    /// Loaded candidates, in staging order. Unread files are dropped.
    pub fn into_candidates(self) -> Vec<UploadCandidate> {
        self.files
            .into_iter()
            .filter_map(|file| match file {
                StagedFile::Ready(candidate) => Some(candidate),
                StagedFile::Unread { .. } => None,
            })
            .collect()
    }
}

fn file_name(path: &Path) -> UploadResult<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .ok_or_else(|| UploadError::config(format!("{} has no file name", path.display())))
}

fn guess_mime(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .to_string()
}

/// Name, guessed MIME type and on-disk size, without touching the content.
async fn inspect(path: &Path) -> UploadResult<(String, String, u64)> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| UploadError::io(path, e))?;
    Ok((file_name(path)?, guess_mime(path), metadata.len()))
}

async fn unread(path: &Path) -> UploadResult<StagedFile> {
    let (name, mime_type, size_bytes) = inspect(path).await?;
    Ok(StagedFile::Unread {
        path: path.to_path_buf(),
        name,
        mime_type,
        size_bytes,
    })
}

/// Stages one file. Content over `max_size_bytes` is left on disk.
pub async fn stage_file(path: &Path, rules: &ValidationRules) -> UploadResult<StagedFile> {
    let (name, mime_type, size_bytes) = inspect(path).await?;
    if size_bytes > rules.max_size_bytes {
        warn!(
            file = %name,
            size = %ByteSize(size_bytes),
            limit = %ByteSize(rules.max_size_bytes),
            "File over size limit, not reading it"
        );
        return Ok(StagedFile::Unread {
            path: path.to_path_buf(),
            name,
            mime_type,
            size_bytes,
        });
    }

    let payload = tokio::fs::read(path)
        .await
        .map_err(|e| UploadError::io(path, e))?;

    debug!(file = %name, mime = %mime_type, size = %ByteSize(payload.len() as u64), "Staged file");
    Ok(StagedFile::Ready(UploadCandidate::new(name, mime_type, payload)))
}

/// Regular files under `folder`, skipping whatever `.gitignore` excludes.
pub fn collect_folder(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in Walk::new(folder) {
        match entry {
            Ok(entry) if entry.path().is_file() => files.push(entry.into_path()),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Skipping unreadable entry"),
        }
    }
    files
}

/// Stages every file named in `paths`, expanding folders.
///
/// A batch over `max_file_count` is rejected anyway, so none of its files are read.
pub async fn stage_paths(paths: &[PathBuf], rules: &ValidationRules) -> UploadResult<StagedBatch> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            files.extend(collect_folder(path));
        } else {
            files.push(path.clone());
        }
    }

    let over_count = files.len() > rules.max_file_count;
    if over_count {
        warn!(
            files = files.len(),
            limit = rules.max_file_count,
            "Too many files, staging metadata only"
        );
    }

    let mut staged = Vec::with_capacity(files.len());
    for file in files {
        staged.push(if over_count {
            unread(&file).await?
        } else {
            stage_file(&file, rules).await?
        });
    }
    Ok(StagedBatch { files: staged })
}
