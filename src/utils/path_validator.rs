use crate::error::{DockupError, Result};
use std::path::{Path, PathBuf};

/// Guards the scan root before any Dockerfile below it is rewritten.
pub struct PathValidator;

impl PathValidator {
    const FORBIDDEN: &'static [&'static str] = &["/etc", "/sys", "/proc", "/dev", "/boot"];

    /// Validates and canonicalises the directory that will be scanned.
    pub fn validate_root(path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = path.as_ref();

        let canonical = path.canonicalize().map_err(|e| {
            DockupError::ProjectValidation(format!("Invalid path '{}': {e}", path.display()))
        })?;

        if !canonical.is_dir() {
            return Err(DockupError::ProjectValidation(format!(
                "Path '{}' is not a directory",
                canonical.display()
            )));
        }

        for forbidden in Self::FORBIDDEN {
            let forbidden_path = Path::new(forbidden);
            let canonical_forbidden = forbidden_path
                .canonicalize()
                .unwrap_or_else(|_| forbidden_path.to_path_buf());

            if canonical.starts_with(forbidden_path) || canonical.starts_with(&canonical_forbidden)
            {
                return Err(DockupError::ProjectValidation(format!(
                    "Refusing to rewrite files under system directory '{}'",
                    forbidden
                )));
            }
        }

        Ok(canonical)
    }
}
