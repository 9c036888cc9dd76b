//! Log output for the CLI
//!
//! Results go to stdout, so every log line is written to stderr. `RUST_LOG`
//! is honoured; `--verbose` raises this crate to debug on top of it.

use tracing_subscriber::fmt;
use tracing_subscriber::EnvFilter;

const TARGET: &str = "torlink";

/// Filter directives for the given environment value
fn directives(verbose: bool, env: Option<&str>) -> String {
    let env = env.map(str::trim).filter(|e| !e.is_empty());

    let Some(env) = env else {
        let level = if verbose { "debug" } else { "info" };
        return format!("{}={}", TARGET, level);
    };
    if !verbose {
        return env.to_string();
    }

    // Drop any directive for our own target so the debug one wins
    let ours = format!("{}=debug", TARGET);
    let mut parts: Vec<&str> = env
        .split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty() && *d != TARGET && !d.starts_with("torlink="))
        .collect();
    parts.push(&ours);
    parts.join(",")
}

/// Install the global subscriber
pub fn init(verbose: bool) {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let wanted = directives(verbose, env.as_deref());
    let filter = EnvFilter::try_new(&wanted).unwrap_or_else(|e| {
        eprintln!("Ignoring invalid {} ({}): {}", EnvFilter::DEFAULT_ENV, wanted, e);
        EnvFilter::new(directives(verbose, None))
    });

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .with_file(verbose)
        .with_line_number(verbose)
        .init();
}
