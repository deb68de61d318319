use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding a filter directive, e.g. `feedcache=debug`.
pub const LOG_ENV: &str = "FEEDCACHE_LOG";

/// Install the stderr subscriber for the binary.
///
/// `FEEDCACHE_LOG` wins when set; otherwise `verbose` selects debug over warn.
pub fn init(verbose: bool) {
    let default_level = if verbose { Level::DEBUG } else { Level::WARN };
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_level.as_str().to_lowercase()));

    // a second init (tests, embedding) is harmless
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_names(true),
        )
        .with(filter)
        .try_init();
}
