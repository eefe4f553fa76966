use std::fs::{File, OpenOptions};
use std::path::Path;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::JsonFields;
use tracing_subscriber::prelude::*;

use crate::config;

/// Installs the global subscriber.
///
/// Events always go to `<data_dir>/devbox-releases.log` as JSON lines. With
/// `verbose`, this crate's debug events are mirrored to stderr as well; stdout
/// is left to lookup output.
pub fn init(verbose: bool) -> anyhow::Result<()> {
    let log_file = open_log_file(&config::data_dir(), &config::log_path())?;

    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(log_file)
        .fmt_fields(JsonFields::default());

    let stderr_layer = verbose.then(|| {
        tracing_subscriber::fmt::layer()
            .compact()
            .with_target(false)
            .with_writer(std::io::stderr)
    });

    // RUST_LOG wins over the verbosity flag
    let default_directive = if verbose {
        "info,devbox_releases=debug"
    } else {
        "info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(stderr_layer)
        .init();

    Ok(())
}

fn open_log_file(data_dir: &Path, log_path: &Path) -> anyhow::Result<File> {
    std::fs::create_dir_all(data_dir).inspect_err(|e| {
        eprintln!("Failed to create data directory {:?}: {}", data_dir, e);
    })?;

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .inspect_err(|e| {
            eprintln!("Failed to open log file {:?}: {}", log_path, e);
        })?;
    Ok(file)
}
