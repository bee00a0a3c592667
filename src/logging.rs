//! Tracing setup, grounded on `rust_qsim::simulation::logging::init_std_out_logging`,
//! trimmed of its CSV-profiling / per-rank rolling-file machinery which has
//! no counterpart in a single-threaded library.

use std::io;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Installs a stdout tracing subscriber at `INFO`, overridable via
/// `RUST_LOG`. Safe to call more than once; subsequent calls are no-ops.
pub fn init_tracing_subscriber() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let collector = tracing_subscriber::registry().with(fmt::layer().with_writer(io::stdout).with_filter(filter));
    let _ = collector.try_init();
}
