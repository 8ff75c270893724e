//! Logging setup shared by the server and client binaries.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Crates whose events are shown at the default level.
const WORKSPACE_CRATES: [&str; 3] = ["teamup_server", "teamup_client", "teamup_shared"];

/// Build the default filter directive for a binary.
///
/// Every workspace crate and the binary itself are enabled at
/// `default_log_level`; everything else falls back to `warn`.
pub fn default_directive(binary_name: &str, default_log_level: &str) -> String {
    let mut directives = vec!["warn".to_string()];
    directives.extend(
        WORKSPACE_CRATES
            .iter()
            .map(|name| format!("{}={}", name, default_log_level)),
    );
    directives.push(format!(
        "{}={}",
        binary_name.replace('-', "_"),
        default_log_level
    ));
    directives.join(",")
}

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` takes precedence over the default directive.
///
/// # Examples
///
/// ```no_run
/// use teamup_shared::logger::setup_logger;
///
/// setup_logger("teamup-server", "debug");
/// ```
pub fn setup_logger(binary_name: &str, default_log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_directive(binary_name, default_log_level).into());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}
