use std::path::PathBuf;

use crate::file_serving::FileServer;
use crate::http::BoxHandler;
use crate::middleware::{CachePolicy, ContentNegotiation, Pipeline, StripPrefix};

/// Settings for [`new_handler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Absolute prefix the application is served under; starts and ends with `/`.
    pub base: String,
    pub no_cache: bool,
}

impl Options {
    pub fn new(base: &str, no_cache: bool) -> Self {
        Self {
            base: normalize_base(base),
            no_cache,
        }
    }
}

impl Default for Options {
    fn default() -> Self {
        Self {
            base: "/".to_string(),
            no_cache: true,
        }
    }
}

/// `""` becomes `/`; otherwise a leading and a trailing `/` are added when
/// missing.
pub fn normalize_base(base: &str) -> String {
    if base.is_empty() {
        return "/".to_string();
    }
    let mut normalized = String::with_capacity(base.len() + 2);
    if !base.starts_with('/') {
        normalized.push('/');
    }
    normalized.push_str(base);
    if !normalized.ends_with('/') {
        normalized.push('/');
    }
    normalized
}

/// Stages placed in front of the file server, outermost first.
///
/// Negotiation runs before the prefix is stripped and therefore classifies
/// the path as the client sent it.
pub fn pipeline(options: &Options) -> Pipeline {
    Pipeline::new()
        .stage(CachePolicy::new(options.no_cache))
        .stage(ContentNegotiation)
        .stage(StripPrefix::new(options.base.clone()))
}

/// Serves `dir` with the content-negotiation, cache and base-path stages.
pub fn new_handler(dir: impl Into<PathBuf>, options: Options) -> BoxHandler {
    let dir = dir.into();
    log::debug!(
        "Creating handler for {} (base: {}, no_cache: {})",
        dir.display(),
        options.base,
        options.no_cache
    );
    pipeline(&options).build(FileServer::new(dir))
}
