//! Path algebra shared by every backend.
//!
//! Paths are plain strings using `/` as the separator. A trailing separator is
//! what makes a path directory-like; nothing else is consulted.

use super::mime;

pub const SEPARATOR: char = '/';

/// Kind of node a path addresses, decided once from its spelling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Directory,
}

impl NodeKind {
    pub fn is_directory(self) -> bool {
        self == NodeKind::Directory
    }

    pub fn is_file(self) -> bool {
        self == NodeKind::File
    }
}

/// Replace every run of separators with a single one
pub fn collapse_separators(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut previous_was_separator = false;
    for ch in path.chars() {
        if ch == SEPARATOR {
            if !previous_was_separator {
                out.push(ch);
            }
            previous_was_separator = true;
        } else {
            out.push(ch);
            previous_was_separator = false;
        }
    }
    out
}

/// Directory iff the path ends with a separator
pub fn classify(path: &str) -> NodeKind {
    if path.ends_with(SEPARATOR) {
        NodeKind::Directory
    } else {
        NodeKind::File
    }
}

/// Split a display name into stem and extension.
///
/// The extension is whatever follows the last `.`. A leading dot does not
/// start an extension, and a blank extension is dropped along with its dot.
pub fn split_stem_extension(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        None | Some(0) => (name, None),
        Some(split) => {
            let (stem, ext) = (&name[..split], &name[split + 1..]);
            if ext.trim().is_empty() {
                (stem, None)
            } else {
                (stem, Some(ext))
            }
        }
    }
}

/// Stem plus the MIME type registered for the extension, if any
pub fn split_stem_mime(name: &str) -> (&str, Option<&'static str>) {
    let (stem, ext) = split_stem_extension(name);
    (stem, mime::extension_to_mime(ext))
}

/// Everything before the last separator, or the whole path when there is none
pub fn before_last_separator(path: &str) -> &str {
    path.rsplit_once(SEPARATOR)
        .map(|(head, _)| head)
        .unwrap_or(path)
}

/// Everything after the last separator, or the whole path when there is none
pub fn after_last_separator(path: &str) -> &str {
    path.rsplit_once(SEPARATOR)
        .map(|(_, tail)| tail)
        .unwrap_or(path)
}

/// Non-blank segments of a multi-segment path
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split(SEPARATOR).filter(|s| !s.trim().is_empty())
}
