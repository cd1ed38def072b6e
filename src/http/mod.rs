pub mod headers;
pub mod request;
pub mod response;

pub use headers::Headers;
pub use request::Request;
pub use response::{ResponseRecorder, ResponseWriter, StreamWriter};

use std::io;

/// Produces the response for a request.
///
/// `Err` is reserved for failures of the response channel itself; ordinary
/// failures such as a missing file are answered with an error status.
pub trait Handler: Send + Sync {
    fn serve(&self, w: &mut dyn ResponseWriter, req: &Request) -> io::Result<()>;
}

pub type BoxHandler = Box<dyn Handler>;

impl Handler for BoxHandler {
    fn serve(&self, w: &mut dyn ResponseWriter, req: &Request) -> io::Result<()> {
        (**self).serve(w, req)
    }
}

/// Adapts a closure into a [`Handler`].
pub struct HandlerFn<F>(F);

pub fn handler_fn<F>(f: F) -> HandlerFn<F>
where
    F: Fn(&mut dyn ResponseWriter, &Request) -> io::Result<()> + Send + Sync,
{
    HandlerFn(f)
}

impl<F> Handler for HandlerFn<F>
where
    F: Fn(&mut dyn ResponseWriter, &Request) -> io::Result<()> + Send + Sync,
{
    fn serve(&self, w: &mut dyn ResponseWriter, req: &Request) -> io::Result<()> {
        (self.0)(w, req)
    }
}
