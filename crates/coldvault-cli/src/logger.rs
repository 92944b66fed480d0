use std::io::IsTerminal;

use tracing_subscriber::EnvFilter;

/// `RUST_LOG` wins; otherwise info and above. Colors only on a terminal.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(std::io::stdout().is_terminal())
        .init();
}
