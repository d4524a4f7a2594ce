//! Advisory locking over the single `swm.lock` file.
//!
//! One lock file guards every per-tracker crank and every mutation of the
//! global `status.yaml`. Distinct integer keys serialize distinct critical
//! sections: each tracker id is a key, and key [`STATUS_FILE_KEY`] is
//! reserved for status-file mutations. Concurrent cranks of *different*
//! trackers proceed in parallel; concurrent cranks of the *same* tracker, or
//! concurrent status-file writers, block on each other.
//!
//! Acquisition is blocking and never times out: callers are expected to hold
//! a [`LockGuard`] for the entire critical section, including final
//! persistence, and release it by letting it drop.

use camino::{Utf8Path, Utf8PathBuf};
use std::fs::{File, OpenOptions};
use std::io;
use thiserror::Error;

/// Key reserved for mutations of the global `status.yaml` file. Tracker ids
/// from the upstream bug tracker are always larger than this, so the space
/// never collides in practice; [`LockFile::lock_tracker`] rejects it anyway.
pub const STATUS_FILE_KEY: u64 = 1;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("failed to open lock file {path}: {source}")]
    Open {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to acquire lock on {path} for key {key}: {source}")]
    Acquire {
        path: Utf8PathBuf,
        key: u64,
        #[source]
        source: io::Error,
    },

    #[error("key {0} is reserved for status-file mutations and must not be used for a tracker")]
    ReservedKey(u64),
}

/// The shared `swm.lock` file. One instance is opened per process and
/// reused across the whole scan; each crank calls [`LockFile::lock_tracker`]
/// to serialize against other processes touching the same tracker.
pub struct LockFile {
    path: Utf8PathBuf,
    file: File,
}

impl LockFile {
    /// Open (creating if necessary) the lock file at `path`. Opening never
    /// itself blocks; acquire a specific key with [`LockFile::lock_key`],
    /// [`LockFile::lock_tracker`] or [`LockFile::lock_status_file`].
    pub fn open(path: &Utf8Path) -> Result<Self, LockError> {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path.as_std_path())
            .map_err(|source| LockError::Open {
                path: path.to_owned(),
                source,
            })?;
        Ok(Self {
            path: path.to_owned(),
            file,
        })
    }

    /// Block until an exclusive lock on the byte range identified by `key`
    /// is held, returning a guard that releases it on drop.
    pub fn lock_key(&self, key: u64) -> Result<LockGuard<'_>, LockError> {
        platform::lock_range(&self.file, key).map_err(|source| LockError::Acquire {
            path: self.path.clone(),
            key,
            source,
        })?;
        Ok(LockGuard {
            file: &self.file,
            key,
        })
    }

    /// Block until the lock scoped to `tracker_id` is held. Rejects
    /// [`STATUS_FILE_KEY`], which is reserved for status-file mutations.
    pub fn lock_tracker(&self, tracker_id: u64) -> Result<LockGuard<'_>, LockError> {
        if tracker_id == STATUS_FILE_KEY {
            return Err(LockError::ReservedKey(tracker_id));
        }
        self.lock_key(tracker_id)
    }

    /// Block until the lock guarding `status.yaml` mutations is held.
    pub fn lock_status_file(&self) -> Result<LockGuard<'_>, LockError> {
        self.lock_key(STATUS_FILE_KEY)
    }

    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

/// Holds an exclusive lock on one key of the `swm.lock` file until dropped.
pub struct LockGuard<'a> {
    file: &'a File,
    key: u64,
}

impl LockGuard<'_> {
    #[must_use]
    pub fn key(&self) -> u64 {
        self.key
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        let _ = platform::unlock_range(self.file, self.key);
    }
}

#[cfg(unix)]
mod platform {
    use std::fs::File;
    use std::io;
    use std::os::unix::io::AsRawFd;

    /// Blocking exclusive `fcntl(F_SETLKW)` over the single byte at offset
    /// `key`. `fcntl` record locks are per-(open file description, process),
    /// not per-thread, and are released when any descriptor referring to
    /// this open file description is closed — callers must keep the
    /// `LockFile` alive for as long as any `LockGuard` it issued.
    pub(crate) fn lock_range(file: &File, key: u64) -> io::Result<()> {
        let mut lock: libc::flock = unsafe { std::mem::zeroed() };
        lock.l_type = libc::F_WRLCK as libc::c_short;
        lock.l_whence = libc::SEEK_SET as libc::c_short;
        lock.l_start = key as libc::off_t;
        lock.l_len = 1;

        let fd = file.as_raw_fd();
        loop {
            let rc = unsafe { libc::fcntl(fd, libc::F_SETLKW, &lock) };
            if rc == 0 {
                return Ok(());
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(err);
            }
        }
    }

    pub(crate) fn unlock_range(file: &File, key: u64) -> io::Result<()> {
        let mut lock: libc::flock = unsafe { std::mem::zeroed() };
        lock.l_type = libc::F_UNLCK as libc::c_short;
        lock.l_whence = libc::SEEK_SET as libc::c_short;
        lock.l_start = key as libc::off_t;
        lock.l_len = 1;

        let fd = file.as_raw_fd();
        let rc = unsafe { libc::fcntl(fd, libc::F_SETLK, &lock) };
        if rc == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }
}

/// Non-Unix fallback. Byte-range locks have no portable stdlib primitive
/// outside `fcntl`, so this degrades to serializing *every* key against
/// every other key within the current process — concurrent cranks of
/// distinct trackers on the same host no longer overlap, and no
/// cross-process exclusion is provided at all. `swm` is deployed on Linux
/// build hosts only; this fallback exists so the workspace still links
/// elsewhere, not to make non-Unix a supported target (see DESIGN.md).
#[cfg(not(unix))]
mod platform {
    use std::fs::File;
    use std::io;
    use std::sync::Mutex;

    static WHOLE_FILE: Mutex<()> = Mutex::new(());

    pub(crate) fn lock_range(_file: &File, _key: u64) -> io::Result<()> {
        std::mem::forget(
            WHOLE_FILE
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner),
        );
        Ok(())
    }

    pub(crate) fn unlock_range(_file: &File, _key: u64) -> io::Result<()> {
        // SAFETY: paired 1:1 with the forgotten guard acquired in `lock_range`.
        unsafe {
            WHOLE_FILE.force_unlock();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use tempfile::TempDir;

    fn lock_path(dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().join("swm.lock")).unwrap()
    }

    #[test]
    fn distinct_keys_do_not_block_each_other() {
        let dir = TempDir::new().unwrap();
        let lf = LockFile::open(&lock_path(&dir)).unwrap();
        let g1 = lf.lock_tracker(1000).unwrap();
        let g2 = lf.lock_tracker(1001).unwrap();
        assert_eq!(g1.key(), 1000);
        assert_eq!(g2.key(), 1001);
    }

    #[test]
    fn same_key_is_reentrant_after_drop() {
        let dir = TempDir::new().unwrap();
        let lf = LockFile::open(&lock_path(&dir)).unwrap();
        {
            let _g = lf.lock_tracker(42).unwrap();
        }
        let _g2 = lf.lock_tracker(42).unwrap();
    }

    #[test]
    fn status_file_key_is_reserved() {
        let dir = TempDir::new().unwrap();
        let lf = LockFile::open(&lock_path(&dir)).unwrap();
        let err = lf.lock_tracker(STATUS_FILE_KEY).unwrap_err();
        assert!(matches!(err, LockError::ReservedKey(1)));
    }

    #[test]
    fn status_file_lock_uses_reserved_key() {
        let dir = TempDir::new().unwrap();
        let lf = LockFile::open(&lock_path(&dir)).unwrap();
        let g = lf.lock_status_file().unwrap();
        assert_eq!(g.key(), STATUS_FILE_KEY);
    }

    #[cfg(unix)]
    #[test]
    fn same_key_blocks_a_second_thread_until_first_drops() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::thread;
        use std::time::Duration;

        let dir = TempDir::new().unwrap();
        let path = lock_path(&dir);
        let lf1 = Arc::new(LockFile::open(&path).unwrap());
        let lf2 = Arc::new(LockFile::open(&path).unwrap());

        let released = Arc::new(AtomicBool::new(false));
        let released_reader = Arc::clone(&released);

        let guard = lf1.lock_tracker(7).unwrap();
        let handle = thread::spawn(move || {
            let _g = lf2.lock_tracker(7).unwrap();
            assert!(released_reader.load(Ordering::SeqCst));
        });

        thread::sleep(Duration::from_millis(50));
        released.store(true, Ordering::SeqCst);
        drop(guard);
        handle.join().unwrap();
    }
}
