pub mod args;
pub mod classify;
pub mod compression;
pub mod file_serving;
pub mod handler;
pub mod http;
pub mod logging;
pub mod middleware;
pub mod server;

pub use classify::{classify, Classification};
pub use handler::{new_handler, Options};
