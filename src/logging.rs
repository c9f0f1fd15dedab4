use env_logger::Env;

/// `info` unless overridden with RUST_LOG.
pub fn init() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}
