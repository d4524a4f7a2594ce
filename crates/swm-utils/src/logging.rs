//! Structured logging setup for the swm daemon.
//!
//! Uses `tracing` with an `EnvFilter` driven by `RUST_LOG`, falling back to a
//! sensible default verbosity. Call [`init_tracing`] once at startup.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the global tracing subscriber.
///
/// `verbose` raises the default filter from `info` to `debug` for the `swm`
/// target when `RUST_LOG` is not set.
pub fn init_tracing(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| {
        if verbose {
            EnvFilter::try_new("swm=debug,info")
        } else {
            EnvFilter::try_new("swm=info,warn")
        }
    })?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .try_init()?;

    Ok(())
}

/// Open a span scoping all log lines emitted while processing one tracker.
pub fn tracker_span(tracker_id: &str) -> tracing::Span {
    tracing::info_span!("tracker", tracker_id)
}

/// Open a span scoping all log lines emitted while running one task handler.
pub fn task_span(tracker_id: &str, task: &str) -> tracing::Span {
    tracing::info_span!("task", tracker_id, task)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spans_carry_tracker_and_task_fields() {
        // Exercise the constructors; tracing spans don't expose field
        // values directly but this ensures the macros compile and run
        // without panicking given arbitrary inputs.
        let _t = tracker_span("123456");
        let _p = task_span("123456", "prepare-package");
    }
}
