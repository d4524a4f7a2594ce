//! `run()`: parse arguments, wire up the external clients, and drive one
//! scan through [`swm_engine::Manager`] (spec.md §6's CLI surface).

use std::time::Duration;

use camino::Utf8PathBuf;
use chrono::Utc;
use clap::Parser;
use tracing::{error, info};

use swm_catalog::KernelSeries;
use swm_clients::{HttpGitTagChecker, HttpSnapStoreClient, HttpTrackerClient};
use swm_engine::{Clients, CrankOptions, Manager};
use swm_lock::LockFile;
use swm_messaging::{AmqpMessageSink, MessageSink};

use crate::args::Cli;
use crate::config::Config;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Run the `swm` binary end to end, returning the process exit code
/// (spec.md §6: "Exit code 0 on success, non-zero on fatal init failure").
pub fn run() -> i32 {
    let cli = Cli::parse();

    if let Err(e) = swm_utils::logging::init_tracing(cli.verbose || cli.sauron) {
        eprintln!("failed to initialize logging: {e}");
        return 1;
    }

    let config = match Config::discover(&cli) {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "config discovery failed");
            return 1;
        }
    };

    let catalog = match load_catalog(&config.catalog_path) {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "failed to load kernel series catalog");
            return 1;
        }
    };

    let lock = match LockFile::open(&swm_utils::paths::lock_path()) {
        Ok(l) => l,
        Err(e) => {
            error!(error = %e, "failed to open swm.lock");
            return 1;
        }
    };

    let tracker = HttpTrackerClient::new(config.endpoints.tracker_base_url.clone(), HTTP_TIMEOUT);
    let snap_store = HttpSnapStoreClient::new(config.endpoints.snap_store_base_url.clone(), HTTP_TIMEOUT);
    let git_tag = HttpGitTagChecker::new(config.endpoints.git_tag_service_base_url.clone(), HTTP_TIMEOUT);

    let messages: Box<dyn MessageSink> = if cli.dryrun {
        Box::new(swm_messaging::InMemoryMessageSink::new())
    } else {
        match AmqpMessageSink::connect(&config.endpoints.amqp_url) {
            Ok(sink) => Box::new(sink),
            Err(e) => {
                error!(error = %e, "failed to connect to message broker");
                return 1;
            }
        }
    };

    let mut announcements_enabled = !cli.no_announcements;
    if announcements_enabled && !config.email_config_path.exists() {
        // spec.md §7, BugMailConfigFileMissing: print once, continue
        // without announcements rather than fail the whole scan.
        error!(
            path = %config.email_config_path,
            "email config missing, continuing without announcements"
        );
        announcements_enabled = false;
    }

    let options = CrankOptions {
        dryrun: cli.dryrun,
        sauron: cli.sauron,
        announcements: announcements_enabled,
        assignments: !cli.no_assignments,
        timestamps: !cli.no_timestamps,
        status_changes: !cli.no_status_changes,
        phase_changes: !cli.no_phase_changes,
    };

    let clients = Clients {
        tracker: &tracker,
        snap_store: &snap_store,
        git_tag: &git_tag,
        messages: &*messages,
    };

    let manager = Manager::new(clients, &catalog, &lock, options);
    let ids = (!cli.tracker_ids.is_empty()).then_some(cli.tracker_ids.as_slice());
    let report = match manager.run(ids, Utc::now()) {
        Ok(r) => r,
        Err(e) => {
            error!(error = %e, "scan aborted");
            return 1;
        }
    };

    info!(
        cranked = report.cranked.len(),
        failed = report.failed.len(),
        "scan complete"
    );
    for (id, reason) in &report.failed {
        error!(tracker_id = %id, reason, "tracker crank failed");
    }

    // Per-tracker crank failures are non-fatal (spec.md §7): they are
    // logged above and retried on the next scan. Only init-time failures
    // (config, catalog, lock, client construction) produce a non-zero
    // exit code.
    0
}

fn load_catalog(path: &Utf8PathBuf) -> anyhow::Result<KernelSeries> {
    KernelSeries::load(path).map_err(|e| anyhow::anyhow!("{e}"))
}
