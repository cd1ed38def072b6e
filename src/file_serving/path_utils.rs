use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::log_error;
use crate::logging::log_step;

/// Resolves an already decoded request path below `root`.
///
/// `..` segments are resolved lexically and never climb above the root.
/// Returns `Ok(None)` when the resolved file (after following symlinks) lies
/// outside `root`. A path that does not exist is returned as is so the caller
/// can answer 404.
pub fn sanitize_path(root: &Path, url_path: &str) -> io::Result<Option<PathBuf>> {
    let root = log_step("canonicalize", root.display(), || fs::canonicalize(root))?;

    if url_path.contains('\0') {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "NUL byte in request path",
        ));
    }

    let candidate = root.join(clean(Path::new(url_path)));
    log::debug!("{} resolves to {}", url_path, candidate.display());

    let resolved = match fs::canonicalize(&candidate) {
        Ok(resolved) => resolved,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Some(candidate)),
        Err(e) if e.kind() == io::ErrorKind::NotADirectory => return Ok(Some(candidate)),
        Err(e) => {
            log_error!(e, format!("Failed to resolve {}", candidate.display()));
            return Err(e);
        }
    };

    if resolved.starts_with(&root) {
        Ok(Some(candidate))
    } else {
        log::warn!("{} escapes the served directory via a link", url_path);
        Ok(None)
    }
}

/// Lexically normalizes a decoded URL path into a relative filesystem path.
fn clean(path: &Path) -> PathBuf {
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => parts.push(part),
            Component::ParentDir => {
                parts.pop();
            }
            Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
        }
    }
    parts.iter().collect()
}

/// Last non-empty segment of a URL path.
pub fn base_name(url_path: &str) -> &str {
    url_path
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or("")
}
