//! Static file serving below a root directory.

pub mod handlers;
mod path_utils;

pub use handlers::FileServer;
