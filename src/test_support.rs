use std::{
    env,
    ffi::OsString,
    path::Path,
    sync::{Mutex, MutexGuard},
};

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Points `XDG_CONFIG_HOME` at a scratch directory for the guard's lifetime.
///
/// Holds the process-wide env lock so parallel tests never observe each
/// other's value; the previous value is restored on drop.
pub struct ConfigHomeGuard {
    previous: Option<OsString>,
    _lock: MutexGuard<'static, ()>,
}

impl ConfigHomeGuard {
    pub fn set(path: &Path) -> Self {
        let lock = ENV_LOCK
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let previous = env::var_os("XDG_CONFIG_HOME");
        // SAFETY: every test that touches the environment holds ENV_LOCK.
        unsafe { env::set_var("XDG_CONFIG_HOME", path) };
        Self {
            previous,
            _lock: lock,
        }
    }
}

impl Drop for ConfigHomeGuard {
    fn drop(&mut self) {
        match self.previous.take() {
            // SAFETY: the lock is still held until this guard is gone.
            Some(value) => unsafe { env::set_var("XDG_CONFIG_HOME", value) },
            None => unsafe { env::remove_var("XDG_CONFIG_HOME") },
        }
    }
}
