//! Upload storage.
//!
//! Uploaded files are stored flat in one directory under the client-supplied
//! name. There is no deduplication or versioning; re-uploading a name
//! overwrites the previous content.

use std::path::{Path, PathBuf};

use kiosk_core::{Error, Result};

/// Validates a client-supplied file name.
///
/// Accepts plain names only: no path separators, no parent references, no
/// empty names. Returns the name unchanged on success.
///
/// # Errors
///
/// Returns [`Error::UnsafeFileName`] for anything that could escape the
/// upload directory.
pub fn sanitize_filename(name: &str) -> Result<&str> {
    let unsafe_name = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\');

    if unsafe_name {
        return Err(Error::UnsafeFileName {
            name: name.to_string(),
        });
    }
    Ok(name)
}

/// Stores `data` under `name` in the upload directory, creating the
/// directory on first use. Returns the path written.
///
/// # Errors
///
/// Returns an error for unsafe names or filesystem failures.
pub async fn store(dir: &Path, name: &str, data: &[u8]) -> Result<PathBuf> {
    let name = sanitize_filename(name)?;
    tokio::fs::create_dir_all(dir).await?;

    let path = dir.join(name);
    tokio::fs::write(&path, data).await?;
    Ok(path)
}

/// Reads a previously stored file, returning its content and guessed MIME
/// type.
///
/// # Errors
///
/// Returns [`Error::FileNotFound`] when the name is unknown, or
/// [`Error::UnsafeFileName`] when it could escape the directory.
pub async fn open(dir: &Path, name: &str) -> Result<(Vec<u8>, String)> {
    let name = sanitize_filename(name)?;
    let path = dir.join(name);

    let data = match tokio::fs::read(&path).await {
        Ok(data) => data,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::FileNotFound {
                name: name.to_string(),
            });
        }
        Err(err) => return Err(err.into()),
    };

    let mime = mime_guess::from_path(&path)
        .first_or_octet_stream()
        .to_string();
    Ok((data, mime))
}
