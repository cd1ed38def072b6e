//! Request-transforming stages and the ordered pipeline that composes them.
//!
//! Every stage exposes the same capability: wrap a downstream handler and
//! return the wrapped one. A [`Pipeline`] lists stages outermost first, so the
//! composition order is read top to bottom instead of being implied by nested
//! constructor calls.

pub mod access_log;
pub mod cache;
pub mod negotiation;
pub mod strip_prefix;

pub use access_log::{AccessLog, StatusRecorder, StatusState};
pub use cache::CachePolicy;
pub use negotiation::ContentNegotiation;
pub use strip_prefix::StripPrefix;

use crate::http::{BoxHandler, Handler};

pub trait Stage: Send + Sync {
    /// Human-readable stage name, used in debug logs.
    fn name(&self) -> &'static str;

    fn wrap(self: Box<Self>, next: BoxHandler) -> BoxHandler;
}

#[derive(Default)]
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stage inside the ones already listed.
    pub fn stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Wraps `endpoint` so the first listed stage sees each request first.
    pub fn build(self, endpoint: impl Handler + 'static) -> BoxHandler {
        log::debug!("Building pipeline: {}", self.names().join(" -> "));
        self.stages
            .into_iter()
            .rev()
            .fold(Box::new(endpoint) as BoxHandler, |next, stage| stage.wrap(next))
    }
}
