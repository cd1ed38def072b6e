use std::io;

use super::Stage;
use crate::http::{BoxHandler, Handler, Request, ResponseWriter};

pub const NO_CACHE: &str = "no-cache";

/// Marks every response `Cache-Control: no-cache` when enabled, whatever its
/// status.
#[derive(Debug, Clone, Copy)]
pub struct CachePolicy {
    no_cache: bool,
}

impl CachePolicy {
    pub fn new(no_cache: bool) -> Self {
        Self { no_cache }
    }
}

struct NoCache {
    next: BoxHandler,
}

impl Stage for CachePolicy {
    fn name(&self) -> &'static str {
        "cache-policy"
    }

    fn wrap(self: Box<Self>, next: BoxHandler) -> BoxHandler {
        if self.no_cache {
            Box::new(NoCache { next })
        } else {
            next
        }
    }
}

impl Handler for NoCache {
    fn serve(&self, w: &mut dyn ResponseWriter, req: &Request) -> io::Result<()> {
        w.headers_mut().set("Cache-Control", NO_CACHE);
        self.next.serve(w, req)
    }
}
