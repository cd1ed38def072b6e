use log::debug;
use std::io;
use std::panic::{self, AssertUnwindSafe};

use super::Stage;
use crate::http::response::STATUS_OK;
use crate::http::{BoxHandler, Handler, Headers, Request, ResponseWriter};
use crate::logging::log_access;

/// Whether the response status has been fixed yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusState {
    #[default]
    Uncommitted,
    Committed(u16),
}

impl StatusState {
    /// The only transition: `Uncommitted -> Committed(status)`.
    ///
    /// Returns `false` and leaves the state alone if a status was already
    /// committed.
    pub fn commit(&mut self, status: u16) -> bool {
        match self {
            Self::Uncommitted => {
                *self = Self::Committed(status);
                true
            }
            Self::Committed(_) => false,
        }
    }

    pub fn status(self) -> Option<u16> {
        match self {
            Self::Uncommitted => None,
            Self::Committed(status) => Some(status),
        }
    }
}

/// Observes the status a handler commits without altering the response.
pub struct StatusRecorder<'a> {
    inner: &'a mut dyn ResponseWriter,
    state: StatusState,
}

impl<'a> StatusRecorder<'a> {
    pub fn new(inner: &'a mut dyn ResponseWriter) -> Self {
        Self {
            inner,
            state: StatusState::Uncommitted,
        }
    }

    pub fn state(&self) -> StatusState {
        self.state
    }

    /// Status to report for the exchange. A response that never committed is
    /// completed by the connection writer with 200.
    pub fn status(&self) -> u16 {
        self.state.status().unwrap_or(STATUS_OK)
    }
}

impl ResponseWriter for StatusRecorder<'_> {
    fn headers(&self) -> &Headers {
        self.inner.headers()
    }

    fn headers_mut(&mut self) -> &mut Headers {
        self.inner.headers_mut()
    }

    fn write_header(&mut self, status: u16) {
        if self.state.commit(status) {
            self.inner.write_header(status);
        } else {
            debug!(
                "Ignoring status {}, {:?} already committed",
                status, self.state
            );
        }
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.state == StatusState::Uncommitted {
            self.write_header(STATUS_OK);
        }
        self.inner.write(buf)
    }
}

/// Emits one access record per request, whatever way the handler ends.
#[derive(Debug, Default, Clone, Copy)]
pub struct AccessLog;

struct LogRequests {
    next: BoxHandler,
}

impl Stage for AccessLog {
    fn name(&self) -> &'static str {
        "access-log"
    }

    fn wrap(self: Box<Self>, next: BoxHandler) -> BoxHandler {
        Box::new(LogRequests { next })
    }
}

impl Handler for LogRequests {
    fn serve(&self, w: &mut dyn ResponseWriter, req: &Request) -> io::Result<()> {
        let mut recorder = StatusRecorder::new(w);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.next.serve(&mut recorder, req)));
        log_access(req, recorder.status());

        match outcome {
            Ok(result) => result,
            Err(payload) => panic::resume_unwind(payload),
        }
    }
}
