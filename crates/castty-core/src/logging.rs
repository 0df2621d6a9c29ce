use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

/// Initialize the process-wide tracing subscriber.
///
/// `verbose = false` (the default) gives a compact human-readable format at
/// `info` and above. `verbose = true` switches to pretty multi-line output
/// and lowers the default level to `debug`. Either way `RUST_LOG` overrides
/// the default level per-module, so `RUST_LOG=castty_recorder=trace` works
/// without recompiling.
///
/// Must be called once, at the very start of each CLI entry point, before
/// any terminal-mode change — a logging failure must never leave the
/// controlling terminal in raw mode.
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let subscriber = fmt().with_env_filter(filter).with_target(verbose);

    if verbose {
        let _ = subscriber.pretty().try_init();
    } else {
        let _ = subscriber.compact().try_init();
    }
}
