//! Response metadata inferred from the pre-compressed asset naming convention.
//!
//! A build ships `Build.wasm.br` or `Build.framework.js.gz` next to (or instead
//! of) the originals. The outer extension names the encoding, the inner suffix
//! names the media type of the decoded payload.

use crate::compression::ContentEncoding;

pub const OCTET_STREAM: &str = "application/octet-stream";
pub const JAVASCRIPT: &str = "application/javascript";
pub const WASM: &str = "application/wasm";

/// Inner suffixes tested in order; the first match wins.
static CONTENT_TYPES: &[(&str, &str)] = &[
    (".data", OCTET_STREAM),
    (".symbols.json", OCTET_STREAM),
    (".js", JAVASCRIPT),
    (".wasm", WASM),
];

#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub struct Classification {
    pub content_encoding: Option<ContentEncoding>,
    pub content_type: Option<&'static str>,
}

impl Classification {
    /// `Content-Encoding` header value, empty when nothing was inferred.
    pub fn encoding_token(&self) -> &'static str {
        self.content_encoding.map(ContentEncoding::token).unwrap_or("")
    }

    /// `Content-Type` header value, empty when nothing was inferred.
    pub fn type_token(&self) -> &'static str {
        self.content_type.unwrap_or("")
    }
}

/// Suffix of the final `/`-separated element starting at its last dot.
fn extension(path: &str) -> &str {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rfind('.') {
        Some(i) => &name[i..],
        None => "",
    }
}

/// Infers `Content-Encoding` and `Content-Type` for a request path.
///
/// Only `.br` and `.gz` paths are classified; every other path, including the
/// uncompressed originals, yields an empty classification so the file server
/// falls back to its own type detection.
pub fn classify(path: &str) -> Classification {
    let ext = extension(path);
    let Some(encoding) = ContentEncoding::from_extension(ext) else {
        return Classification::default();
    };

    let original = &path[..path.len() - ext.len()];
    let content_type = CONTENT_TYPES
        .iter()
        .find(|(suffix, _)| original.ends_with(suffix))
        .map(|(_, content_type)| *content_type);

    Classification {
        content_encoding: Some(encoding),
        content_type,
    }
}
