//! Sanity checks for Netscape-format cookie files.

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::error::ValidationError;

/// Verifies that `path` points at a non-empty, readable text file whose first
/// line is a `#` comment, and returns the path on success.
///
/// Only the first line is read; the cookies themselves are left for the
/// extractor to interpret.
pub fn validate_cookie_file(path: impl AsRef<Path>) -> Result<PathBuf, ValidationError> {
    let path = path.as_ref().to_path_buf();

    let meta = match fs::metadata(&path) {
        Ok(meta) => meta,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(ValidationError::NotFound(path));
        }
        Err(_) => return Err(ValidationError::Unreadable(path)),
    };

    if !meta.is_file() {
        return Err(ValidationError::NotAFile(path));
    }
    if meta.len() == 0 {
        return Err(ValidationError::Empty(path));
    }

    let file = File::open(&path).map_err(|_| ValidationError::Unreadable(path.clone()))?;
    let mut first_line = String::new();
    match BufReader::new(file).read_line(&mut first_line) {
        Ok(_) => {}
        Err(err) if err.kind() == io::ErrorKind::InvalidData => {
            return Err(ValidationError::NotText(path));
        }
        Err(_) => return Err(ValidationError::Unreadable(path)),
    }

    if !first_line.trim().starts_with('#') {
        return Err(ValidationError::NotNetscape(path));
    }
    Ok(path)
}
