//! Local file name selection for downloaded media.
//!
//! Given a hint, a directory and the fetched bytes, [`Resolver::resolve`]
//! walks `name.ext`, `name-1.ext`, `name-2.ext`, ... and settles on the first
//! candidate that is either free or already holds the file this URL was
//! first downloaded as. Re-running over the same links therefore reuses
//! earlier downloads, while different images sharing a name get distinct
//! numbered files.

use crate::cache::{LinkHashCache, content_hash};
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use mdlocal_sniff::MediaType;
use mdlocal_storage::BackendHandle;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::instrument;

/// Number of candidates tried before giving up.
pub const MAX_FILENAME_INDEX: usize = 1000;
/// Base name used when neither the hint nor the URL provide one.
pub const FILENAME_TEMPLATE: &str = "media";
/// Replaces characters that cannot appear in a file name.
const REPLACEMENT: char = '!';
const MAX_BASE_NAME_BYTES: usize = 100;
const WINDOWS_RESERVED: [&str; 4] = ["CON", "PRN", "AUX", "NUL"];

/// Where a media file lives (or should live).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub path: PathBuf,
    /// `false` when the file at [`path`](Self::path) already holds this content.
    pub need_write: bool,
    pub media_type: MediaType,
}

#[derive(Clone)]
pub struct Resolver {
    backend: BackendHandle,
    cache: Arc<LinkHashCache>,
}

impl Resolver {
    pub fn new(backend: BackendHandle, cache: Arc<LinkHashCache>) -> Self {
        Self { backend, cache }
    }

    pub fn cache(&self) -> &LinkHashCache {
        &self.cache
    }

    /// Pick the path `bytes` fetched from `url` should be stored at.
    ///
    /// The URL's hash is recorded in the [`LinkHashCache`] before any
    /// successful return.
    ///
    /// # Errors
    /// - [`ErrorKind::Storage`] if an existence check or read fails.
    /// - [`ErrorKind::FilenameExhausted`] if all [`MAX_FILENAME_INDEX`]
    ///   candidates hold different content.
    #[instrument(skip(self, bytes), fields(directory = %directory.display(), bytes = bytes.len()))]
    pub async fn resolve(&self, directory: &Path, hint: &str, url: &str, bytes: &[u8]) -> Result<Resolution> {
        let media_type = MediaType::from_magic_bytes(bytes);
        let extension = media_type.extension();
        let base = base_name(hint, url, extension);

        for index in 0..MAX_FILENAME_INDEX {
            let path = candidate(directory, &base, index, extension);
            if !self.backend.exists(&path).await.or_raise(|| ErrorKind::Storage)? {
                self.cache.ensure(url, bytes);
                tracing::debug!(path = %path.display(), "Selected free file name");
                return Ok(Resolution { path, need_write: true, media_type });
            }
            let expected = self.cache.ensure(url, bytes);
            let existing = self.backend.read(&path).await.or_raise(|| ErrorKind::Storage)?;
            if content_hash(&existing) == expected {
                tracing::debug!(path = %path.display(), "Reusing previously downloaded file");
                return Ok(Resolution { path, need_write: false, media_type });
            }
        }
        exn::bail!(ErrorKind::FilenameExhausted(base))
    }
}

fn candidate(directory: &Path, base: &str, index: usize, extension: &str) -> PathBuf {
    let name = match (index, extension.is_empty()) {
        (0, true) => base.to_string(),
        (0, false) => format!("{base}.{extension}"),
        (_, true) => format!("{base}-{index}"),
        (_, false) => format!("{base}-{index}.{extension}"),
    };
    directory.join(name)
}

/// The sanitized stem for a download: the hint, else the last URL path
/// segment, else [`FILENAME_TEMPLATE`], minus a trailing `.extension`.
fn base_name(hint: &str, url: &str, extension: &str) -> String {
    let mut name = if hint.is_empty() { last_segment(url) } else { hint.to_string() };
    if name.is_empty() {
        name = FILENAME_TEMPLATE.to_string();
    }
    if !extension.is_empty()
        && let Some(at) = name.len().checked_sub(extension.len() + 1)
        && name.is_char_boundary(at)
        && name[at..].starts_with('.')
        && name[at + 1..].eq_ignore_ascii_case(extension)
    {
        name.truncate(at);
    }
    sanitize(&name)
}

fn last_segment(url: &str) -> String {
    mdlocal_fetch::parse_remote(url)
        .ok()
        .and_then(|url| url.path_segments()?.filter(|segment| !segment.is_empty()).last().map(String::from))
        .unwrap_or_default()
}

/// Turns arbitrary text into something safe to use as a file name on any
/// common filesystem.
///
/// ```
/// use mdlocal_library::sanitize;
/// assert_eq!(sanitize("what? a <cat>"), "what! a !cat");
/// assert_eq!(sanitize("../../etc/passwd"), "etc!passwd");
/// assert_eq!(sanitize("con"), "con!");
/// assert_eq!(sanitize("???"), "media");
/// ```
pub fn sanitize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut replacing = false;
    for ch in name.chars() {
        if matches!(ch, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*') || ch.is_control() {
            if !replacing {
                out.push(REPLACEMENT);
            }
            replacing = true;
        } else {
            out.push(ch);
            replacing = false;
        }
    }

    let mut out = trim(&out).to_string();
    if is_reserved(&out) {
        out.push(REPLACEMENT);
    }
    if out.len() > MAX_BASE_NAME_BYTES {
        let mut end = MAX_BASE_NAME_BYTES;
        while !out.is_char_boundary(end) {
            end -= 1;
        }
        out.truncate(end);
        out = trim(&out).to_string();
    }
    if out.is_empty() { FILENAME_TEMPLATE.to_string() } else { out }
}

fn trim(name: &str) -> &str {
    name.trim_matches(|c: char| c == '.' || c == ' ' || c == REPLACEMENT)
}

fn is_reserved(name: &str) -> bool {
    if WINDOWS_RESERVED.iter().any(|reserved| name.eq_ignore_ascii_case(reserved)) {
        return true;
    }
    // COM1-COM9, LPT1-LPT9
    let bytes = name.as_bytes();
    bytes.len() == 4
        && (bytes[..3].eq_ignore_ascii_case(b"COM") || bytes[..3].eq_ignore_ascii_case(b"LPT"))
        && matches!(bytes[3], b'1'..=b'9')
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdlocal_storage::StorageBackend;
    use mdlocal_storage::backend::MockBackend;
    use rstest::rstest;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR-new";
    const OTHER_PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR-other";

    fn resolver(mock: &Arc<MockBackend>) -> Resolver {
        Resolver::new(mock.clone(), Arc::new(LinkHashCache::new()))
    }

    #[rstest]
    #[case("cat", "https://x/y.png", "png", "cat")]
    #[case("cat.png", "https://x/y.png", "png", "cat")]
    #[case("cat.PNG", "https://x/y.png", "png", "cat")]
    #[case("cat.jpg", "https://x/y.png", "png", "cat.jpg")]
    #[case("", "https://x/photos/sunset.png", "png", "sunset")]
    #[case("", "https://x/photos/sunset/", "png", "sunset")]
    #[case("", "https://x/", "png", "media")]
    #[case("", "https://x/raw", "", "raw")]
    #[case(".png", "https://x/y.png", "png", "media")]
    #[case("a/b: c?", "https://x/y.png", "png", "a!b! c")]
    fn test_base_name(#[case] hint: &str, #[case] url: &str, #[case] extension: &str, #[case] expected: &str) {
        assert_eq!(base_name(hint, url, extension), expected);
    }

    #[rstest]
    #[case("plain", "plain")]
    #[case("tab\there", "tab!here")]
    #[case("a<>b", "a!b")]
    #[case("  .hidden.  ", "hidden")]
    #[case("LPT1", "LPT1!")]
    #[case("com10", "com10")]
    #[case("aux", "aux!")]
    #[case("", "media")]
    #[case("日本語の画像", "日本語の画像")]
    fn test_sanitize(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(sanitize(name), expected);
    }

    #[test]
    fn test_sanitize_truncates_on_char_boundary() {
        let long = "é".repeat(80);
        let sanitized = sanitize(&long);
        assert_eq!(sanitized.len(), MAX_BASE_NAME_BYTES);
        assert!(sanitized.chars().all(|c| c == 'é'));
    }

    #[rstest]
    #[case(0, "png", "media/cat.png")]
    #[case(3, "png", "media/cat-3.png")]
    #[case(0, "", "media/cat")]
    #[case(2, "", "media/cat-2")]
    fn test_candidate(#[case] index: usize, #[case] extension: &str, #[case] expected: &str) {
        assert_eq!(candidate(Path::new("media"), "cat", index, extension), Path::new(expected));
    }

    #[tokio::test]
    async fn test_free_name_needs_write() {
        let mock = Arc::new(MockBackend::default());
        let resolver = resolver(&mock);
        let resolution = resolver.resolve(Path::new("media"), "cat", "https://x/cat", PNG).await.unwrap();
        assert_eq!(resolution.path, Path::new("media/cat.png"));
        assert!(resolution.need_write);
        assert_eq!(resolution.media_type, MediaType::Png);
        assert_eq!(resolver.cache().get("https://x/cat"), Some(content_hash(PNG)));
    }

    #[tokio::test]
    async fn test_identical_existing_file_is_reused() {
        let mock = Arc::new(MockBackend::with_files([("media/cat.png", PNG)]));
        let resolution = resolver(&mock).resolve(Path::new("media"), "cat", "https://x/cat", PNG).await.unwrap();
        assert_eq!(resolution.path, Path::new("media/cat.png"));
        assert!(!resolution.need_write);
    }

    #[tokio::test]
    async fn test_collision_with_different_content_gets_suffix() {
        let mock = Arc::new(MockBackend::with_files([("media/cat.png", OTHER_PNG)]));
        let resolver = resolver(&mock);
        let first = resolver.resolve(Path::new("media"), "cat", "https://a/cat", PNG).await.unwrap();
        assert_eq!(first.path, Path::new("media/cat-1.png"));
        assert!(first.need_write);
    }

    #[tokio::test]
    async fn test_same_name_different_urls_get_distinct_paths() {
        let mock = Arc::new(MockBackend::default());
        let resolver = resolver(&mock);
        let directory = Path::new("media");

        let first = resolver.resolve(directory, "cat", "https://a/cat", PNG).await.unwrap();
        mock.write(&first.path, PNG).await.unwrap();
        let second = resolver.resolve(directory, "cat", "https://b/cat", OTHER_PNG).await.unwrap();
        mock.write(&second.path, OTHER_PNG).await.unwrap();

        assert_eq!(first.path, Path::new("media/cat.png"));
        assert_eq!(second.path, Path::new("media/cat-1.png"));
        assert!(second.need_write);

        // Both URLs resolve back onto their own files on a second pass.
        let again = resolver.resolve(directory, "cat", "https://b/cat", OTHER_PNG).await.unwrap();
        assert_eq!(again, Resolution { path: second.path, need_write: false, media_type: MediaType::Png });
        let again = resolver.resolve(directory, "cat", "https://a/cat", PNG).await.unwrap();
        assert_eq!(again.path, first.path);
        assert!(!again.need_write);
    }

    #[tokio::test]
    async fn test_cached_hash_is_trusted_over_fresh_bytes() {
        let mock = Arc::new(MockBackend::with_files([("media/cat.png", OTHER_PNG)]));
        let resolver = resolver(&mock);
        resolver.cache().ensure("https://x/cat", OTHER_PNG);
        // The remote now serves different bytes, but the first-seen hash
        // still matches the file on disk.
        let resolution = resolver.resolve(Path::new("media"), "cat", "https://x/cat", PNG).await.unwrap();
        assert_eq!(resolution.path, Path::new("media/cat.png"));
        assert!(!resolution.need_write);
    }

    #[tokio::test]
    async fn test_unknown_content_has_no_extension() {
        let mock = Arc::new(MockBackend::default());
        let resolution =
            resolver(&mock).resolve(Path::new("media"), "", "https://x/blob", b"plain text").await.unwrap();
        assert_eq!(resolution.path, Path::new("media/blob"));
        assert_eq!(resolution.media_type, MediaType::Unknown);
    }

    #[tokio::test]
    async fn test_exhaustion() {
        let files = (0..MAX_FILENAME_INDEX).map(|index| {
            let path = candidate(Path::new("media"), "cat", index, "png");
            (path, OTHER_PNG.to_vec())
        });
        let mock = Arc::new(MockBackend::with_files(files));
        let err = resolver(&mock).resolve(Path::new("media"), "cat", "https://x/cat", PNG).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::FilenameExhausted(base) if base == "cat"));
    }
}
