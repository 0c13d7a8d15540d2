use tracing_subscriber::EnvFilter;

/// Plain fmt subscriber filtered by RUST_LOG (default "info").
pub fn setup() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}
