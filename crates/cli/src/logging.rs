use rotor_core::config::LoggingConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Builds the filter: `RUST_LOG` wins, `debug` and `trace` shorthands widen only our
/// crates, otherwise the configured level applies to our crates and `warn` elsewhere.
fn build_filter(config: &LoggingConfig, rust_log: Option<&str>) -> EnvFilter {
    match rust_log {
        Some(level @ ("debug" | "trace")) => {
            EnvFilter::new(format!("warn,rotor_core={level},rotor_cli={level}"))
        }
        Some(directives) => EnvFilter::try_new(directives)
            .unwrap_or_else(|_| EnvFilter::new("warn,rotor_core=debug,rotor_cli=debug")),
        None => EnvFilter::new(format!(
            "warn,rotor_core={level},rotor_cli={level}",
            level = config.level
        )),
    }
}

/// Installs the global subscriber. Logs go to stderr so stdout stays parseable.
pub fn init_logging(config: &LoggingConfig) {
    let rust_log = std::env::var("RUST_LOG").ok();
    let filter = build_filter(config, rust_log.as_deref());

    let registry = tracing_subscriber::registry().with(filter);

    if config.format.as_str() == "json" {
        let fmt_layer = tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr);
        registry.with(fmt_layer).init();
    } else {
        // "pretty" and any other format default to pretty logging
        let fmt_layer = tracing_subscriber::fmt::layer()
            .pretty()
            .with_file(true)
            .with_line_number(true)
            .with_target(false)
            .with_writer(std::io::stderr);
        registry.with(fmt_layer).init();
    }
}
