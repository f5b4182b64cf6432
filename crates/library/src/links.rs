//! Markdown image link scanning and cleanup.

use regex::Regex;
use std::borrow::Cow;
use std::ops::Range;
use std::sync::LazyLock;

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

// `.` never crosses a line break, so a link cannot span lines.
regex!(EXTERNAL_MEDIA_LINK, r"!\[(?P<anchor>.*?)\]\((?P<link>.+?)\)");
// An embed wrapped in an extra link by some editors: `[![[anchor]]](target)`.
regex!(DIRTY_IMAGE_TAG, r"\[!\[\[(?P<anchor>.*?)\]\]\]\((?P<link>.+?)\)");

/// One `![anchor](target)` occurrence in a document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkMatch {
    /// Caption between the brackets; possibly empty.
    pub anchor: String,
    /// Everything between the parentheses.
    pub target: String,
    /// Byte range of the whole match in the scanned text.
    pub range: Range<usize>,
    /// The matched text, returned verbatim when materialization fails.
    pub text: String,
}

/// Lazily yields every non-overlapping image link in `text`, in order.
///
/// ```
/// let text = "text ![a](http://x/1.png) more ![](http://x/2.jpg)";
/// let links: Vec<_> = mdlocal_library::links::scan(text).collect();
/// assert_eq!(links[0].anchor, "a");
/// assert_eq!(links[1].target, "http://x/2.jpg");
/// ```
pub fn scan(text: &str) -> impl Iterator<Item = LinkMatch> + '_ {
    EXTERNAL_MEDIA_LINK.captures_iter(text).filter_map(|captures| {
        let whole = captures.get(0)?;
        Some(LinkMatch {
            anchor: captures.name("anchor").map_or_else(String::new, |m| m.as_str().to_string()),
            target: captures.name("link")?.as_str().to_string(),
            range: whole.range(),
            text: whole.as_str().to_string(),
        })
    })
}

/// Rewrites every `[![[anchor]]](target)` into `![anchor](target)`.
///
/// Borrows when there is nothing to repair.
pub fn clean(text: &str) -> Cow<'_, str> {
    DIRTY_IMAGE_TAG.replace_all(text, "![${anchor}](${link})")
}

/// Returns `true` if `target` should be downloaded. Local paths and data
/// URIs are left where they are.
pub fn is_remote(target: &str) -> bool {
    mdlocal_fetch::is_remote(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_scan_anchors_and_targets() {
        let text = "text ![a](http://x/1.png) more ![](http://x/2.jpg)";
        let links: Vec<_> = scan(text).collect();
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].anchor, "a");
        assert_eq!(links[0].target, "http://x/1.png");
        assert_eq!(links[0].range, 5..25);
        assert_eq!(&text[links[0].range.clone()], links[0].text);
        assert_eq!(links[1].anchor, "");
        assert_eq!(links[1].target, "http://x/2.jpg");
    }

    #[rstest]
    #[case("no links here", 0)]
    #[case("[not an image](http://x/1.png)", 0)]
    #[case("![broken](\nhttp://x/1.png)", 0)]
    #[case("![a](http://x/1.png)![b](http://x/2.png)", 2)]
    #[case("line one ![a](x.png)\nline two ![b](y.png)", 2)]
    #[case("![]()", 0)]
    fn test_scan_counts(#[case] text: &str, #[case] expected: usize) {
        assert_eq!(scan(text).count(), expected);
    }

    #[test]
    fn test_scan_is_case_sensitive_and_non_greedy() {
        let links: Vec<_> = scan("![A](HTTP://X/1.PNG) (trailing)").collect();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].target, "HTTP://X/1.PNG");
    }

    #[test]
    fn test_clean_dirty_tag() {
        assert_eq!(clean("[![[caption]]](http://x/y.png)"), "![caption](http://x/y.png)");
    }

    #[rstest]
    #[case("[![[caption]]](http://x/y.png)")]
    #[case("before [![[]]](http://x/y.png) after [![[two]]](z.png)")]
    #[case("already ![clean](http://x/y.png)")]
    fn test_clean_is_idempotent(#[case] text: &str) {
        let once = clean(text).into_owned();
        assert_eq!(clean(&once), once.as_str());
    }

    #[test]
    fn test_clean_borrows_when_untouched() {
        assert!(matches!(clean("![a](http://x/1.png)"), Cow::Borrowed(_)));
    }

    #[rstest]
    #[case("http://x/1.png", true)]
    #[case("media/1.png", false)]
    #[case("data:image/png;base64,AAAA", false)]
    fn test_is_remote(#[case] target: &str, #[case] expected: bool) {
        assert_eq!(is_remote(target), expected);
    }
}
