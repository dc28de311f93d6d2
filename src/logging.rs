use log::{LevelFilter, SetLoggerError};

/// Initializes `env_logger`.
///
/// `RUST_LOG` is read first; an explicit `level` (from `--log-level`) takes
/// precedence over it. HTTP client internals are capped at info so debug
/// runs stay readable.
pub fn init_logger(level: Option<LevelFilter>) -> Result<(), SetLoggerError> {
    let mut builder = env_logger::Builder::from_default_env();

    if let Some(level) = level {
        builder.filter_level(level);
    } else if std::env::var_os("RUST_LOG").is_none() {
        builder.filter_level(LevelFilter::Info);
    }
    builder.filter_module("reqwest", LevelFilter::Info);
    builder.filter_module("hyper", LevelFilter::Info);
    builder.filter_module("hyper_util", LevelFilter::Info);
    builder.format_timestamp_millis();

    // try_init so tests can call this more than once
    builder.try_init()
}
