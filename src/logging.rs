use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Filter used when `RUST_LOG` is not set.
pub fn default_filter(level: &str) -> String {
    format!("transcript_gpa={level},{level}")
}

/// Compact stderr logging so stdout stays clean for JSON output.
pub fn init_logging(level: &str) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter(level)))?;

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .compact();

    Registry::default()
        .with(env_filter)
        .with(console_layer)
        .try_init()?;

    tracing::debug!(level, "logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_scopes_crate_and_default() {
        assert_eq!(default_filter("debug"), "transcript_gpa=debug,debug");
    }
}
