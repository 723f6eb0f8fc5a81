use std::path::Path;

use crate::error::{Result, WrappedError};

/// Magic string at the start of every SQLite 3 database file.
pub const SQLITE_HEADER: &[u8; 16] = b"SQLite format 3\0";

/// Size of the fixed database header.
const SQLITE_HEADER_LEN: usize = 100;

/// Earliest year representable with the iMessage epoch.
pub const MIN_YEAR: i32 = 2001;
/// Latest year accepted as an analysis target.
pub const MAX_YEAR: i32 = 2100;

/// Validation utilities for input sanitization and edge case handling
#[derive(Debug, Copy, Clone)]
pub struct InputValidator;

impl InputValidator {
    /// Validate that bytes look like a SQLite database image
    pub fn validate_database_image(bytes: &[u8]) -> Result<()> {
        if bytes.is_empty() {
            return Err(WrappedError::Load("database file is empty".to_string()));
        }

        if bytes.len() < SQLITE_HEADER_LEN {
            return Err(WrappedError::Load(format!(
                "database file too short ({} bytes)",
                bytes.len()
            )));
        }

        if !bytes.starts_with(SQLITE_HEADER) {
            return Err(WrappedError::Load(
                "not a SQLite database (bad header)".to_string(),
            ));
        }

        Ok(())
    }

    /// Validate analysis target year
    pub fn validate_year(year: i32) -> Result<()> {
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(WrappedError::InvalidInput(format!(
                "year {year} out of range ({MIN_YEAR}-{MAX_YEAR})"
            )));
        }
        Ok(())
    }

    /// Validate a top-K / limit value
    pub fn validate_limit(name: &str, value: usize, max: usize) -> Result<()> {
        if value == 0 || value > max {
            return Err(WrappedError::InvalidInput(format!(
                "{name} must be between 1 and {max}, got {value}"
            )));
        }
        Ok(())
    }

    /// Validate file path
    pub fn validate_file_path(path: &Path) -> Result<()> {
        let path_str = path.to_string_lossy();
        if path_str.is_empty() {
            return Err(WrappedError::InvalidInput("File path cannot be empty".to_string()));
        }

        if path_str.contains('\0') {
            return Err(WrappedError::InvalidInput(
                "File path contains a null byte".to_string(),
            ));
        }

        // Check path length
        if path_str.len() > 4096 {
            return Err(WrappedError::InvalidInput(
                "File path too long (max 4096 characters)".to_string(),
            ));
        }

        Ok(())
    }

    /// Validate that an input file exists and is a regular file
    pub fn validate_input_file(path: &Path) -> Result<()> {
        Self::validate_file_path(path)?;

        if !path.is_file() {
            return Err(WrappedError::InvalidInput(format!(
                "{} does not exist or is not a file",
                path.display()
            )));
        }

        Ok(())
    }
}
