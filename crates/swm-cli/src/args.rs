//! CLI argument definitions (spec.md §6): `swm [flags] [<tracker-id>...]`.

use camino::Utf8PathBuf;
use clap::Parser;

/// Stable Kernel Workflow Manager -- crank tracking bugs through the SRU
/// release pipeline.
#[derive(Parser, Debug)]
#[command(name = "swm")]
#[command(version)]
#[command(about = "Drive Ubuntu kernel SRU tracking bugs through the release pipeline")]
pub struct Cli {
    /// Evaluate every handler and log what would change, but perform no
    /// tracker mutations, status-file write, or message publish.
    #[arg(long)]
    pub dryrun: bool,

    /// Run with elevated verbosity suited to unattended / monitored runs
    /// (named for the all-seeing operator persona in the source team's
    /// on-call tooling).
    #[arg(long)]
    pub sauron: bool,

    /// Suppress upload/testing announcements and testing-request messages.
    #[arg(long = "no-announcements")]
    pub no_announcements: bool,

    /// Never assign tasks to an owner.
    #[arg(long = "no-assignments")]
    pub no_assignments: bool,

    /// Never bump `*-changed` timestamps, even when the underlying value
    /// changes (useful for diffing two runs without timestamp noise).
    #[arg(long = "no-timestamps")]
    pub no_timestamps: bool,

    /// Never write task status transitions back to the tracker.
    #[arg(long = "no-status-changes")]
    pub no_status_changes: bool,

    /// Never advance the coarse `phase` / `phase-changed` properties.
    #[arg(long = "no-phase-changes")]
    pub no_phase_changes: bool,

    /// Use a local message broker port instead of the configured one,
    /// for exercising the messaging path against a developer-local queue.
    #[arg(long)]
    pub local_msgqueue_port: Option<u16>,

    /// Point every external client at the staging tracker/archive/store
    /// instead of production.
    #[arg(long)]
    pub staging: bool,

    /// Path to the `swm` config file (overrides discovery).
    #[arg(long)]
    pub config: Option<Utf8PathBuf>,

    /// Raise log verbosity to debug.
    #[arg(short, long)]
    pub verbose: bool,

    /// Crank only these tracker ids instead of scanning every live tracker.
    pub tracker_ids: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_flags_scans_everything_with_every_side_effect_enabled() {
        let cli = Cli::parse_from(["swm"]);
        assert!(!cli.dryrun);
        assert!(!cli.no_announcements);
        assert!(cli.tracker_ids.is_empty());
    }

    #[test]
    fn explicit_tracker_ids_are_collected_positionally() {
        let cli = Cli::parse_from(["swm", "1000", "1001"]);
        assert_eq!(cli.tracker_ids, vec!["1000".to_string(), "1001".to_string()]);
    }

    #[test]
    fn suppression_flags_parse_independently() {
        let cli = Cli::parse_from([
            "swm",
            "--dryrun",
            "--no-announcements",
            "--no-phase-changes",
            "1000",
        ]);
        assert!(cli.dryrun);
        assert!(cli.no_announcements);
        assert!(cli.no_phase_changes);
        assert!(!cli.no_status_changes);
        assert_eq!(cli.tracker_ids, vec!["1000".to_string()]);
    }

    #[test]
    fn local_msgqueue_port_parses_as_u16() {
        let cli = Cli::parse_from(["swm", "--local-msgqueue-port", "5673"]);
        assert_eq!(cli.local_msgqueue_port, Some(5673));
    }
}
