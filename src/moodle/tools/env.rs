use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::moodle::tools::error::Result;

/// Loads `.env` from the working directory or its parents.
///
/// Returns the path that was loaded, or `None` when there is no such file.
/// A file that exists but cannot be read or parsed is an error.
pub fn load_dotenv() -> Result<Option<PathBuf>> {
    skip_missing(dotenvy::dotenv())
}

/// Loads the environment file at `path`; returns whether it existed.
pub fn load_env_file(path: &Path) -> Result<bool> {
    Ok(skip_missing(dotenvy::from_path(path))?.is_some())
}

fn skip_missing<T>(result: dotenvy::Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(dotenvy::Error::Io(error)) if error.kind() == ErrorKind::NotFound => Ok(None),
        Err(error) => Err(error.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moodle::tools::error::ToolError;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn absent_file_is_skipped() {
        let temp_dir = tempdir().expect("temporary directory");
        let loaded = load_env_file(&temp_dir.path().join(".env")).expect("no error");
        assert!(!loaded);
    }

    #[test]
    fn well_formed_file_sets_variables() {
        let temp_dir = tempdir().expect("temporary directory");
        let path = temp_dir.path().join(".env");
        fs::write(&path, "MOODLE_TOOLS_ENV_LOADED=yes\n").expect("file written");

        assert!(load_env_file(&path).expect("file loaded"));
        assert_eq!(
            std::env::var("MOODLE_TOOLS_ENV_LOADED").as_deref(),
            Ok("yes")
        );
    }

    #[test]
    fn malformed_file_is_reported() {
        let temp_dir = tempdir().expect("temporary directory");
        let path = temp_dir.path().join(".env");
        fs::write(&path, "MOODLE_TOOLS_ENV_OK=1\nthis line has no assignment\n")
            .expect("file written");

        assert!(matches!(load_env_file(&path), Err(ToolError::Env(_))));
    }
}
