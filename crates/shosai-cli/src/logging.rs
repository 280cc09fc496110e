use shosai_core::config::LoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Directive used when `RUST_LOG` is not set.
pub fn default_directive(config: &LoggingConfig, verbose: bool) -> String {
    let level = if verbose { "debug" } else { config.level.as_str() };
    format!("shosai={level}")
}

/// Install the global subscriber: stderr always, plus a daily-rolling file
/// when `file_dir` is configured. The returned guard flushes the file
/// writer and must be held until exit.
pub fn init(config: &LoggingConfig, verbose: bool) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(config, verbose)));

    let (file_layer, guard) = match &config.file_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "shosai.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive() {
        let config = LoggingConfig {
            level: "warn".into(),
            file_dir: None,
        };
        assert_eq!(default_directive(&config, false), "shosai=warn");
        assert_eq!(default_directive(&config, true), "shosai=debug");
    }
}
