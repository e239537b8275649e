use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVES: &str = "reporting_service=info";

/// Install the global fmt subscriber. `RUST_LOG` overrides the defaults.
pub fn init_tracing() {
    install(EnvFilter::new(DEFAULT_DIRECTIVES));
}

/// Like [`init_tracing`], with extra default directives for a binary whose
/// events are logged under its own target.
pub fn init_tracing_with(directives: &str) {
    install(EnvFilter::new(format!("{DEFAULT_DIRECTIVES},{directives}")));
}

fn install(defaults: EnvFilter) {
    let filter = EnvFilter::try_from_default_env().unwrap_or(defaults);

    // A subscriber may already be installed (e.g. by a test harness).
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
