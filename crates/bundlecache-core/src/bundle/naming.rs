//! Content-derived local file names.
//!
//! A remote file is stored locally under the SHA-256 hex digest of its
//! identifier, so the same URL appearing in several bundles maps to exactly
//! one cached file.

use std::fmt::Write;

use sha2::{Digest, Sha256};

/// Extension of the remote file, including the leading dot.
///
/// Only the last path segment is considered, query strings and fragments are
/// ignored, and a trailing dot does not count as an extension.
pub fn file_extension(remote: &str) -> Option<&str> {
    let path = remote.split(['?', '#']).next().unwrap_or(remote);
    let segment = path.rsplit('/').next().unwrap_or(path);
    let dot = segment.rfind('.')?;
    if dot + 1 >= segment.len() {
        return None;
    }
    Some(&segment[dot..])
}

/// Local file name for a remote identifier.
pub fn local_file_name(remote: &str) -> String {
    let digest = Sha256::digest(remote.as_bytes());
    let mut name = String::with_capacity(digest.len() * 2 + 8);
    for byte in digest.iter() {
        // Writing to a String cannot fail
        let _ = write!(name, "{byte:02x}");
    }
    if let Some(ext) = file_extension(remote) {
        name.push_str(ext);
    }
    name
}
