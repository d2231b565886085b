use std::str::FromStr;

use anyhow::Result;
use log::LevelFilter;

/// Wires the fern dispatch for the daemon: timestamped lines on stdout,
/// verbosity from `CASKYD_LOG_LEVEL` or `--log-level` (DEBUG, INFO, WARN or
/// ERROR).
pub fn init_logging(level: &str) -> Result<()> {
    let level = LevelFilter::from_str(level)?;

    let dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}] - {} - [{}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stdout());

    if dispatch.apply().is_err() {
        eprintln!("logger has already been set");
    }
    Ok(())
}
