use camino::Utf8PathBuf;
use std::cell::RefCell;

// Thread-local override used only in tests to avoid process-global env races.
thread_local! {
    static THREAD_HOME: RefCell<Option<Utf8PathBuf>> = const { RefCell::new(None) };
}

/// Resolve the swm working directory:
/// 1) thread-local override (tests use this)
/// 2) env `SWM_HOME` (opt-in for operators/CI)
/// 3) current directory
///
/// The working directory is where `status.yaml` and the per-tracker lock
/// files live.
#[must_use]
pub fn swm_home() -> Utf8PathBuf {
    if let Some(tl) = THREAD_HOME.with(|tl| tl.borrow().clone()) {
        return tl;
    }
    if let Ok(p) = std::env::var("SWM_HOME") {
        return Utf8PathBuf::from(p);
    }
    Utf8PathBuf::from(".")
}

/// Override `swm_home()` for the current thread. Intended for test isolation.
pub fn set_swm_home_override(path: Option<Utf8PathBuf>) {
    THREAD_HOME.with(|tl| *tl.borrow_mut() = path);
}

/// Returns `<SWM_HOME>/status.yaml`
#[must_use]
pub fn status_path() -> Utf8PathBuf {
    swm_home().join("status.yaml")
}

/// Returns `<SWM_HOME>/swm.lock`, the single lock file whose byte ranges are
/// keyed per tracker id (with offset 1 reserved for status-file mutations).
#[must_use]
pub fn lock_path() -> Utf8PathBuf {
    swm_home().join("swm.lock")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_home_is_current_dir() {
        set_swm_home_override(None);
        // SWM_HOME may or may not be set in the test environment; either
        // way the function must not panic and must return a path.
        let home = swm_home();
        assert!(!home.as_str().is_empty());
    }

    #[test]
    fn override_takes_precedence() {
        set_swm_home_override(Some(Utf8PathBuf::from("/tmp/swm-test-home")));
        assert_eq!(swm_home(), Utf8PathBuf::from("/tmp/swm-test-home"));
        assert_eq!(
            status_path(),
            Utf8PathBuf::from("/tmp/swm-test-home/status.yaml")
        );
        set_swm_home_override(None);
    }
}
