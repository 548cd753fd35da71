use anyhow::Result;

/// Installs the tracing subscriber: a file under the temp directory, plus stdout unless
/// running as a service. Keep the returned guard alive to flush the file writer.
pub fn start_tracing(
    level: log::Level,
    filename: &str,
    stdout: bool,
) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    use time::{format_description, UtcOffset};
    use tracing_appender::rolling;
    use tracing_subscriber::{
        fmt::{self, time::OffsetTime},
        prelude::__tracing_subscriber_SubscriberExt,
        registry,
        util::SubscriberInitExt,
        EnvFilter,
    };

    let env_filter =
        EnvFilter::try_from_env("RUST_LOG").unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let stdout_layer = if stdout {
        Some(fmt::layer().compact().with_writer(std::io::stdout))
    } else {
        None
    };
    let file_appender = rolling::never(std::env::temp_dir(), filename);
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    let local_time = OffsetTime::new(
        offset,
        format_description::parse(
            "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]",
        )?,
    );
    let (non_blocking_appender, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_timer(local_time)
        .with_writer(non_blocking_appender);
    registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()?;

    Ok(guard)
}

/// `<exe>.log` for foreground runs, `<exe>.s.log` when hosted by the service manager.
pub fn log_file_name(exe_stem: &str, daemon: bool) -> String {
    if daemon {
        format!("{}.s.log", exe_stem)
    } else {
        format!("{}.log", exe_stem)
    }
}
