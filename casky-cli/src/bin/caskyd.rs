use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::info;

use casky_cli::{server, trace};

#[cfg(feature = "thread-safe")]
type Store = casky::storage::shared::SharedCask;
#[cfg(not(feature = "thread-safe"))]
type Store = casky::storage::cask::Cask;

#[derive(Debug, Parser)]
#[command(version, about = "The casky line-protocol TCP daemon")]
struct Args {
    /// TCP port to listen on.
    #[clap(short, long, default_value_t = server::DEFAULT_PORT)]
    port: u16,

    /// Path to the database log file.
    #[clap(short, long, default_value = "caskyd.db")]
    data: PathBuf,

    /// fsync the log after every write. Slower, but maximizes crash
    /// tolerance.
    #[clap(long)]
    sync_on_write: bool,

    /// Log verbosity (DEBUG, INFO, WARN or ERROR).
    #[clap(short, long, env = "CASKYD_LOG_LEVEL", default_value = "INFO")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    trace::init_logging(&args.log_level)?;
    info!("caskyd starting (pid={})", std::process::id());

    let mut engine = Store::open(args.data.clone())?;
    if args.sync_on_write {
        engine.set_sync_on_write(true);
    }
    if engine.corrupted() {
        log::warn!(
            "log {} is partially corrupt; serving what loaded, COMPACT to rewrite it",
            args.data.display()
        );
    }

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", args.port)).await?;
    if cfg!(feature = "thread-safe") {
        info!("caskyd listening on port {} (thread-safe build)", args.port);
    } else {
        info!("caskyd listening on port {} (paper-compatible build)", args.port);
    }

    tokio::select! {
        result = server::serve(listener, engine) => result?,
        _ = tokio::signal::ctrl_c() => info!("shutdown requested"),
    }

    info!("caskyd stopped");
    Ok(())
}
