// Path helpers with the platform length limit applied

use crate::error::SplashError;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// Join `name` onto `base`, failing if the result would not fit in `max_len` bytes
///
/// `max_len` counts the terminator, so the joined path must be strictly shorter.
pub fn join_bounded(base: &Utf8Path, name: &str, max_len: usize) -> Result<Utf8PathBuf, SplashError> {
    let joined = base.join(name);
    if joined.as_str().len() >= max_len {
        return Err(SplashError::PathTooLong {
            path: joined,
            limit: max_len,
        });
    }
    Ok(joined)
}

pub fn exists(path: &Utf8Path) -> bool {
    path.exists()
}

/// Create `path` (and missing parents)
pub fn make_directory(path: &Utf8Path) -> Result<(), SplashError> {
    fs::create_dir_all(path).map_err(|source| SplashError::DirectoryCreation {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!("Created directory: {}", path);
    Ok(())
}
