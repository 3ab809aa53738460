//! Miscellaneous test code for the VAR chain workspace.
//!
//! The main entry point is [`init`], which installs the tracing
//! subscriber and `color-eyre` error reports exactly once per test
//! binary. Every test calls it first so panics and failed `Result`s
//! come with spans and backtraces attached.

use tracing_error::ErrorLayer;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

lazy_static::lazy_static! {
    static ref TRACING: () = {
        let fmt_layer = fmt::layer().with_target(false).with_test_writer();
        // Use the RUST_LOG env var, or by default:
        //  - warn for most tests, and
        //  - for some modules, hide expected warn logs
        let filter_layer = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new("warn"))
            .expect("the fallback filter directive parses");

        tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt_layer)
            .with(ErrorLayer::default())
            .init();

        color_eyre::install().expect("color-eyre is only installed once");
    };
}

/// Initialize global and thread-local settings for tests, once per
/// process. Subsequent calls are no-ops.
pub fn init() {
    lazy_static::initialize(&TRACING);
}
