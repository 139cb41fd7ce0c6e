use tracing_subscriber::filter::LevelFilter;

/// Installs a fmt subscriber that also picks up `log` records from the
/// library. Per-toggle messages are only shown in debug builds.
pub fn initialize() {
    let level = if cfg!(debug_assertions) {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();
}
