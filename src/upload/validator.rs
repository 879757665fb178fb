use crate::upload::types::UploadCandidate;
use crate::utils::byte_size::ByteSize;
use glob::Pattern;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_SIZE_BYTES: u64 = 10 * ByteSize::MIB;
pub const DEFAULT_MAX_FILE_COUNT: usize = 10;
pub const PDF_MIME_TYPE: &str = "application/pdf";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationRules {
    pub max_size_bytes: u64,
    /// Exact MIME types or wildcards such as `image/*`.
    pub allowed_mime_types: Vec<String>,
    pub max_file_count: usize,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            max_size_bytes: DEFAULT_MAX_SIZE_BYTES,
            allowed_mime_types: vec![PDF_MIME_TYPE.to_string()],
            max_file_count: DEFAULT_MAX_FILE_COUNT,
        }
    }
}

impl ValidationRules {
    pub fn allows_mime_type(&self, mime_type: &str) -> bool {
        let mime_type = essence(mime_type);
        self.allowed_mime_types.iter().any(|allowed| {
            let allowed = essence(allowed);
            if allowed == mime_type {
                return true;
            }
            allowed.contains('*')
                && Pattern::new(&allowed)
                    .map(|pattern| pattern.matches(&mime_type))
                    .unwrap_or(false)
        })
    }
}

/// Lowercased MIME type without parameters.
fn essence(mime_type: &str) -> String {
    mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationResult {
    pub fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

pub(crate) fn count_error(count: usize, rules: &ValidationRules) -> Option<String> {
    (count > rules.max_file_count).then(|| format!("Only {} files are allowed", rules.max_file_count))
}

/// Size then type violations for one file, appended in that order.
pub(crate) fn file_errors(
    name: &str,
    mime_type: &str,
    size_bytes: u64,
    rules: &ValidationRules,
    errors: &mut Vec<String>,
) {
    if size_bytes > rules.max_size_bytes {
        errors.push(format!(
            "{} exceeds the maximum size of {}",
            name,
            ByteSize(rules.max_size_bytes)
        ));
    }

    if !rules.allows_mime_type(mime_type) {
        errors.push(format!(
            "{} has type {}; allowed types: {}",
            name,
            mime_type,
            rules.allowed_mime_types.join(", ")
        ));
    }
}

/// Checks a batch against the rules, reporting every violation in one pass.
///
/// The count check comes first, then size and type for each file in order.
/// An empty batch is valid.
pub fn validate(candidates: &[UploadCandidate], rules: &ValidationRules) -> ValidationResult {
    let mut errors: Vec<String> = count_error(candidates.len(), rules).into_iter().collect();

    for candidate in candidates {
        file_errors(
            candidate.display_name(),
            candidate.mime_type(),
            candidate.size_bytes(),
            rules,
            &mut errors,
        );
    }

    ValidationResult::from_errors(errors)
}
