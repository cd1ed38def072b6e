use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::handler::{normalize_base, Options};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Directory to serve
    #[arg(default_value = ".")]
    pub dir: PathBuf,

    #[arg(long, env = "UNISRV_HOST", default_value = "localhost")]
    pub host: String,

    /// Port to listen on, 0 picks a free one
    #[arg(short, long, env = "UNISRV_PORT", default_value_t = 5000)]
    pub port: u16,

    /// Path prefix the application is served under
    #[arg(long, env = "UNISRV_BASE", default_value = "")]
    pub base: String,

    /// Read timeout in seconds
    #[arg(long, env = "UNISRV_READ_TIMEOUT", default_value_t = 5)]
    pub read_timeout: u64,

    /// Write timeout in seconds
    #[arg(long, env = "UNISRV_WRITE_TIMEOUT", default_value_t = 5)]
    pub write_timeout: u64,

    /// Let clients cache responses
    #[arg(
        long,
        env = "UNISRV_DISABLE_NO_CACHE",
        num_args = 0..=1,
        require_equals = true,
        default_value = "false",
        default_missing_value = "true",
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    pub disable_no_cache: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("host must not be empty")]
    MissingHost,
}

/// Validated, normalized settings the server runs with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub dir: PathBuf,
    pub host: String,
    pub port: u16,
    pub base: String,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub no_cache: bool,
}

impl TryFrom<Args> for Config {
    type Error = ConfigError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        let host = args.host.trim();
        if host.is_empty() {
            return Err(ConfigError::MissingHost);
        }

        Ok(Self {
            dir: args.dir,
            host: host.to_string(),
            port: args.port,
            base: normalize_base(&args.base),
            read_timeout: Duration::from_secs(args.read_timeout),
            write_timeout: Duration::from_secs(args.write_timeout),
            no_cache: !args.disable_no_cache,
        })
    }
}

impl Config {
    pub fn options(&self) -> Options {
        Options {
            base: self.base.clone(),
            no_cache: self.no_cache,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Application URL for the given (actually bound) port.
    pub fn url(&self, port: u16) -> String {
        format!("http://{}:{}{}", self.host, port, self.base)
    }
}
