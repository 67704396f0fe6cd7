use env_logger::Env;

use crate::config::LoggingSettings;

/// Installs `env_logger` as the global logger.
///
/// `RUST_LOG` takes precedence over the configured level. Calling this more
/// than once keeps the first logger.
pub fn init(settings: &LoggingSettings) {
    let env = Env::default().default_filter_or(settings.level.as_str());
    if env_logger::Builder::from_env(env).try_init().is_err() {
        log::debug!("Logger already initialized");
    }
}
