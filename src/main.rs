use anyhow::Context;
use clap::Parser;

use unisrv::args::{Args, Config};
use unisrv::logging::setup_logging;
use unisrv::server::start_server;

fn main() -> anyhow::Result<()> {
    setup_logging();

    let args = Args::parse();
    let config = Config::try_from(args).context("invalid configuration")?;
    start_server(config).context("server failed")
}
