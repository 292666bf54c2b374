//! Cross-module scenarios: full evaluation runs, tail bounds against the
//! terms they are meant to cover, and symplectic bookkeeping on random
//! words.

mod symplectic;

/// Installs a test log subscriber driven by `RUST_LOG`; later calls are
/// no-ops.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
