//! Path validation for vault-relative storage paths.
//!
//! Every path handed to a backend is relative to the vault root. Validation
//! resolves `.` and `..` lexically and refuses anything that would climb
//! above the root, so a document can never coax the pipeline into writing
//! media outside the vault.

use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Validates and normalizes a vault-relative path.
///
/// > **Note:** This does **not** normalize backslashes or non-UTF8 bytes.
/// >           Null bytes are explicitly rejected.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use mdlocal_storage::validate_path;
/// assert!(validate_path("notes/today.md").is_ok());
/// assert!(validate_path("media/../notes/today.md").is_ok());
/// assert!(validate_path("../outside.md").is_err());
/// assert_eq!(validate_path("./media//cat.png").unwrap(), Path::new("media/cat.png"));
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let original = path.as_ref();
    let mut components = Vec::new();
    for component in original.components() {
        match component {
            Component::Normal(segment) => {
                // Null bytes survive Path::components() on Unix but truncate
                // the path once it reaches a syscall.
                if segment.as_encoded_bytes().contains(&0) {
                    exn::bail!(ErrorKind::InvalidPath(original.to_path_buf()));
                }
                components.push(segment);
            },
            Component::CurDir | Component::RootDir => {},
            Component::Prefix(_) => exn::bail!(ErrorKind::InvalidPath(original.to_path_buf())),
            Component::ParentDir => {
                if components.pop().is_none() {
                    exn::bail!(ErrorKind::InvalidPath(original.to_path_buf()));
                }
            },
        }
    }
    if components.is_empty() {
        exn::bail!(ErrorKind::InvalidPath(original.to_path_buf()));
    }
    Ok(components.into_iter().collect())
}

/// Renders a relative path with `/` separators regardless of platform, the
/// form markdown links expect.
///
/// ```
/// use std::path::Path;
/// use mdlocal_storage::to_slash;
/// assert_eq!(to_slash(Path::new("media/cat.png")), "media/cat.png");
/// ```
pub fn to_slash(path: impl AsRef<Path>) -> String {
    path.as_ref()
        .components()
        .filter_map(|component| match component {
            Component::Normal(segment) => Some(segment.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
