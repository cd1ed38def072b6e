use log::trace;
use std::io;

use super::Stage;
use crate::classify::classify;
use crate::http::{BoxHandler, Handler, Request, ResponseWriter};

/// Annotates pre-compressed assets with `Content-Encoding` and `Content-Type`.
///
/// Must sit outside [`super::StripPrefix`]: the suffix convention is read from
/// the path the client asked for, not from the rewritten one.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContentNegotiation;

struct Negotiate {
    next: BoxHandler,
}

impl Stage for ContentNegotiation {
    fn name(&self) -> &'static str {
        "content-negotiation"
    }

    fn wrap(self: Box<Self>, next: BoxHandler) -> BoxHandler {
        Box::new(Negotiate { next })
    }
}

impl Handler for Negotiate {
    fn serve(&self, w: &mut dyn ResponseWriter, req: &Request) -> io::Result<()> {
        let classification = classify(&req.path);
        trace!("Classified {} as {:?}", req.path, classification);

        if let Some(encoding) = classification.content_encoding {
            w.headers_mut().set("Content-Encoding", encoding.token());
        }
        if let Some(content_type) = classification.content_type {
            w.headers_mut().set("Content-Type", content_type);
        }
        self.next.serve(w, req)
    }
}
