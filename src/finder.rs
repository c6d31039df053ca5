//! Device finder: the process-wide singleton that owns the live set of
//! discovered tokens. One `DeviceFinder` per process; constructed with an
//! interest set of signatures, it exposes `start_scanning`/`stop_scanning`/
//! `scan_now` and a scoped iterator over the current tokens. A second
//! construction while one is already alive is fatal —
//! `std::process::abort()`, not `panic!`, so it survives being called
//! inside a `catch_unwind` boundary.

use std::collections::HashMap;
use std::ffi::{CStr, CString};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use crate::device::DeviceBase;
use crate::listener::{self, Event, ListenerHandle};
use crate::signature::{DeviceSignature, DEVICE_SIGS};
use crate::token::DeviceToken;

static SINGLETON_ALIVE: AtomicBool = AtomicBool::new(false);
static CURRENT: Mutex<Option<Weak<DeviceFinder>>> = Mutex::new(None);

/// Overridable connect/disconnect hooks. Both have empty default bodies so
/// a caller only interested in polling [`DeviceFinder::tokens`] need not
/// implement either.
pub trait FinderDelegate: Send + Sync {
    fn device_connected(&self, _token: &DeviceToken) {}
    fn device_disconnected(&self, _token: &DeviceToken, _base: Option<Arc<dyn DeviceBase>>) {}
}

struct NullDelegate;
impl FinderDelegate for NullDelegate {}

/// Process-wide registry of live [`DeviceToken`]s, gated by `interest` and
/// fed by the platform [`listener`].
pub struct DeviceFinder {
    interest: Vec<DeviceSignature>,
    tokens: Mutex<HashMap<CString, DeviceToken>>,
    scanning_enabled: AtomicBool,
    listener: Mutex<Option<ListenerHandle>>,
    delegate: Arc<dyn FinderDelegate>,
}

impl DeviceFinder {
    /// Constructs the singleton finder with no delegate hooks; only
    /// [`DeviceFinder::tokens`] is useful without one.
    pub fn new(interest_type_hashes: &[u64]) -> Arc<Self> {
        Self::with_delegate(interest_type_hashes, Arc::new(NullDelegate))
    }

    /// Constructs the singleton finder. `interest_type_hashes` selects the
    /// subset of [`DEVICE_SIGS`] this finder cares about — irrelevant for
    /// `Hid`-kind tokens, which [`DeviceSignature::token_matches`] always
    /// accepts regardless of the interest set.
    ///
    /// Aborts the process if a `DeviceFinder` already exists.
    pub fn with_delegate(interest_type_hashes: &[u64], delegate: Arc<dyn FinderDelegate>) -> Arc<Self> {
        if SINGLETON_ALIVE.swap(true, Ordering::AcqRel) {
            tracing::error!(
                target: "hidinputdev::finder",
                "a DeviceFinder already exists in this process"
            );
            std::process::abort();
        }

        let interest = DEVICE_SIGS
            .iter()
            .copied()
            .filter(|sig| interest_type_hashes.contains(&sig.type_hash))
            .collect();

        let finder = Arc::new(Self {
            interest,
            tokens: Mutex::new(HashMap::new()),
            scanning_enabled: AtomicBool::new(false),
            listener: Mutex::new(None),
            delegate,
        });

        *CURRENT.lock().expect("finder singleton lock poisoned") = Some(Arc::downgrade(&finder));
        finder
    }

    /// The currently-live finder, if one exists. Used by the Windows
    /// `WM_DEVICECHANGE` window procedure (and the XInput arbiter) to reach
    /// the singleton without threading a reference through OS callback
    /// state.
    pub fn current() -> Option<Arc<DeviceFinder>> {
        CURRENT
            .lock()
            .expect("finder singleton lock poisoned")
            .as_ref()?
            .upgrade()
    }

    /// Synchronous one-shot enumeration; inserts matching tokens
    /// unconditionally, bypassing the scanning-enabled gate.
    pub fn scan_now(&self) {
        for token in listener::enumerate() {
            self.try_insert(token);
        }
    }

    /// Enables the scanning gate, seeds the map with one [`Self::scan_now`],
    /// then starts the platform hot-plug listener thread if one is not
    /// already running.
    pub fn start_scanning(self: &Arc<Self>) {
        self.scanning_enabled.store(true, Ordering::Release);
        self.scan_now();

        let mut slot = self.listener.lock().expect("listener slot lock poisoned");
        if slot.is_some() {
            return;
        }
        let weak = Arc::downgrade(self);
        *slot = Some(listener::start(move |event| {
            if let Some(finder) = weak.upgrade() {
                finder.handle_event(event);
            }
        }));
    }

    /// Disables the scanning gate and stops the listener thread, if
    /// running. Already-discovered tokens remain in the map.
    pub fn stop_scanning(&self) {
        self.scanning_enabled.store(false, Ordering::Release);
        if let Some(handle) = self.listener.lock().expect("listener slot lock poisoned").take() {
            handle.stop();
        }
    }

    pub fn is_scanning(&self) -> bool {
        self.scanning_enabled.load(Ordering::Acquire)
    }

    fn handle_event(&self, event: Event) {
        if !self.scanning_enabled.load(Ordering::Acquire) {
            return;
        }
        match event {
            Event::Inserted(token) => {
                self.try_insert(token);
            }
            Event::Removed(path) => {
                self.try_remove(&path);
            }
        }
    }

    /// Inserts `token` iff it matches the interest set and no token with the
    /// same path is already present (duplicate paths are rejected, not
    /// replaced).
    fn try_insert(&self, token: DeviceToken) -> bool {
        if !DeviceSignature::token_matches(&token, &self.interest) {
            return false;
        }
        let mut tokens = self.tokens.lock().expect("finder map lock poisoned");
        if tokens.contains_key(token.path()) {
            return false;
        }
        tokens.insert(token.path().to_owned(), token.clone());
        drop(tokens);
        tracing::info!(target: "hidinputdev::finder", path = ?token.path(), "device connected");
        self.delegate.device_connected(&token);
        true
    }

    /// Handles a hot-unplug event at `path`. A token with a live `Base`
    /// keeps its map entry and is only asked to stop its transport; the
    /// worker thread (or, on Windows, the XInput arbiter) removes it from
    /// the map itself via [`notify_disconnected`] once `final_cycle` and
    /// `device_disconnected` have actually run. A token that was never
    /// opened has no worker to wait on, so it is removed and the delegate
    /// notified immediately.
    fn try_remove(&self, path: &CStr) -> bool {
        let token = {
            let tokens = self.tokens.lock().expect("finder map lock poisoned");
            tokens.get(path).cloned()
        };
        let Some(token) = token else {
            return false;
        };

        if token.cached_device().is_some() {
            token.close();
            return true;
        }

        let mut tokens = self.tokens.lock().expect("finder map lock poisoned");
        if tokens.remove(path).is_none() {
            return false;
        }
        drop(tokens);
        tracing::info!(target: "hidinputdev::finder", path = ?path, "device disconnected");
        self.delegate.device_disconnected(&token, None);
        true
    }

    /// Scoped snapshot view that holds the token-map mutex for its
    /// lifetime — callers must not block while holding it, and must not
    /// call back into the finder from a closure run over it.
    pub fn tokens(&self) -> Tokens<'_> {
        Tokens {
            guard: self.tokens.lock().expect("finder map lock poisoned"),
        }
    }

    pub fn token_count(&self) -> usize {
        self.tokens.lock().expect("finder map lock poisoned").len()
    }
}

impl Drop for DeviceFinder {
    /// Stops the listener, then asks every still-present token's worker to
    /// stop. Without this, a finder dropped while devices remain open would
    /// leave their transport threads (and the `Arc<dyn DeviceBase>` cycle
    /// each one keeps alive via its own worker closure) running forever.
    fn drop(&mut self) {
        self.stop_scanning();
        {
            let tokens = self.tokens.lock().expect("finder map lock poisoned");
            for token in tokens.values() {
                token.close();
            }
        }
        *CURRENT.lock().expect("finder singleton lock poisoned") = None;
        SINGLETON_ALIVE.store(false, Ordering::Release);
    }
}

/// Completes the disconnect sequence for the device at `path`: removes its
/// token from the current finder's map and notifies the delegate with the
/// `Base` the worker is finished with. Called by [`crate::transport::Worker`]
/// after `final_cycle`/`device_disconnected` have run, and by the XInput
/// arbiter on a slot going empty, so the map is only ever updated after the
/// device's own teardown has completed.
pub(crate) fn notify_disconnected(path: &CStr) {
    let Some(finder) = DeviceFinder::current() else {
        return;
    };
    let token = {
        let mut tokens = finder.tokens.lock().expect("finder map lock poisoned");
        tokens.remove(path)
    };
    if let Some(token) = token {
        let base = token.clear_base();
        tracing::info!(target: "hidinputdev::finder", path = ?path, "device disconnected");
        finder.delegate.device_disconnected(&token, base);
    }
}

/// Scoped, mutex-holding view over a finder's current tokens.
pub struct Tokens<'a> {
    guard: MutexGuard<'a, HashMap<CString, DeviceToken>>,
}

impl<'a> Tokens<'a> {
    pub fn iter(&self) -> impl Iterator<Item = &DeviceToken> {
        self.guard.values()
    }

    pub fn len(&self) -> usize {
        self.guard.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::token::DeviceKind;
    use serial_test::serial;

    fn fake_token(path: &str) -> DeviceToken {
        DeviceToken::new(
            DeviceKind::Hid,
            0x1234,
            0x5678,
            "Vendor".into(),
            "Product".into(),
            CString::new(path).unwrap(),
        )
    }

    #[test]
    #[serial]
    fn singleton_construction_then_destruction_then_reconstruction() {
        let first = DeviceFinder::new(&[]);
        assert!(DeviceFinder::current().is_some());
        drop(first);
        assert!(DeviceFinder::current().is_none());
        let second = DeviceFinder::new(&[]);
        assert!(Arc::ptr_eq(&second, &DeviceFinder::current().unwrap()));
    }

    #[test]
    #[serial]
    fn insert_rejects_duplicate_path() {
        let finder = DeviceFinder::new(&[]);
        assert!(finder.try_insert(fake_token("/sys/fake/a")));
        assert!(!finder.try_insert(fake_token("/sys/fake/a")));
        assert_eq!(finder.token_count(), 1);
    }

    #[test]
    #[serial]
    fn insert_rejects_tokens_outside_interest_set() {
        let finder = DeviceFinder::new(&[crate::signature::type_hash("GameCubeAdapter")]);
        let non_hid = DeviceToken::new(
            DeviceKind::Usb,
            0x1234,
            0x5678,
            "Vendor".into(),
            "Product".into(),
            CString::new("/sys/fake/b").unwrap(),
        );
        assert!(!finder.try_insert(non_hid));
        assert_eq!(finder.token_count(), 0);
    }

    #[test]
    #[serial]
    fn remove_of_never_opened_token_is_immediate() {
        let finder = DeviceFinder::new(&[]);
        assert!(finder.try_insert(fake_token("/sys/fake/c")));
        assert_eq!(finder.token_count(), 1);

        let path = CString::new("/sys/fake/c").unwrap();
        assert!(finder.try_remove(&path));
        assert_eq!(finder.token_count(), 0);
        assert!(!finder.try_remove(&path));
    }
}
