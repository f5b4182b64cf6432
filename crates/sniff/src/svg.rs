//! SVG detection inside generic XML.

use crate::trim_start;
use memchr::memmem;

/// Returns `true` if the buffer starts like an XML document: an XML
/// declaration, or a bare `<svg` root with the declaration omitted.
pub(crate) fn looks_like_xml(bytes: &[u8]) -> bool {
    let head = trim_start(bytes);
    head.starts_with(b"<?xml") || is_svg_open_tag(head)
}

/// Returns `true` if the buffer holds an SVG document.
///
/// The prolog (XML declaration, processing instructions, comments and a
/// doctype, with or without an internal subset) is skipped; the first
/// element must then be `<svg`, and the document must close it, either
/// self-closing or with a matching `</svg>`.
///
/// ```
/// use mdlocal_sniff::is_svg;
/// assert!(is_svg(b"<?xml version=\"1.0\"?>\n<svg xmlns=\"http://www.w3.org/2000/svg\"></svg>"));
/// assert!(!is_svg(b"<?xml version=\"1.0\"?>\n<rss></rss>"));
/// ```
pub fn is_svg(bytes: &[u8]) -> bool {
    let Some(root) = skip_prolog(bytes) else {
        return false;
    };
    if !is_svg_open_tag(root) {
        return false;
    }
    let Some(tag_end) = memchr::memchr(b'>', root) else {
        return false;
    };
    root[..tag_end].ends_with(b"/") || memmem::rfind(root, b"</svg>").is_some()
}

fn is_svg_open_tag(bytes: &[u8]) -> bool {
    bytes.starts_with(b"<svg") && bytes.get(4).is_some_and(|b| b.is_ascii_whitespace() || matches!(b, b'>' | b'/'))
}

/// Advance past everything that may precede the root element. `None` if the
/// prolog never terminates.
fn skip_prolog(bytes: &[u8]) -> Option<&[u8]> {
    let mut rest = trim_start(bytes);
    loop {
        rest = if rest.starts_with(b"<?") {
            after(rest, b"?>")?
        } else if rest.starts_with(b"<!--") {
            after(rest, b"-->")?
        } else if rest.len() >= 9 && rest[..9].eq_ignore_ascii_case(b"<!DOCTYPE") {
            skip_doctype(rest)?
        } else {
            return Some(rest);
        };
        rest = trim_start(rest);
    }
}

fn skip_doctype(rest: &[u8]) -> Option<&[u8]> {
    let close = memchr::memchr(b'>', rest)?;
    match memchr::memchr(b'[', &rest[..close]) {
        // Internal subset: `<!DOCTYPE svg [ <!ENTITY ...> ]>`
        Some(_) => after(rest, b"]>"),
        None => Some(&rest[close + 1..]),
    }
}

fn after<'a>(haystack: &'a [u8], needle: &[u8]) -> Option<&'a [u8]> {
    memmem::find(haystack, needle).map(|at| &haystack[at + needle.len()..])
}
