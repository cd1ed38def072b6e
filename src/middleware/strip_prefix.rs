use log::debug;
use std::io;

use super::Stage;
use crate::http::response::not_found;
use crate::http::{BoxHandler, Handler, Request, ResponseWriter};

/// Removes the base path before requests reach the file server.
///
/// A base of `""` or `"/"` leaves the downstream handler unwrapped.
#[derive(Debug, Clone)]
pub struct StripPrefix {
    prefix: String,
}

impl StripPrefix {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

struct Strip {
    prefix: String,
    next: BoxHandler,
}

impl Stage for StripPrefix {
    fn name(&self) -> &'static str {
        "strip-prefix"
    }

    fn wrap(self: Box<Self>, next: BoxHandler) -> BoxHandler {
        if self.prefix.is_empty() || self.prefix == "/" {
            return next;
        }
        Box::new(Strip {
            prefix: self.prefix,
            next,
        })
    }
}

/// Strips `prefix` and re-roots the remainder at `/`.
pub fn strip(path: &str, prefix: &str) -> Option<String> {
    let rest = path.strip_prefix(prefix)?;
    if rest.starts_with('/') {
        Some(rest.to_string())
    } else {
        Some(format!("/{rest}"))
    }
}

impl Handler for Strip {
    fn serve(&self, w: &mut dyn ResponseWriter, req: &Request) -> io::Result<()> {
        match strip(&req.path, &self.prefix) {
            Some(path) => {
                debug!("Stripped {} from {} -> {}", self.prefix, req.path, path);
                self.next.serve(w, &req.with_path(path))
            }
            None => {
                debug!("{} is outside {}", req.path, self.prefix);
                not_found(w)
            }
        }
    }
}
