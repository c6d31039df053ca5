//! Platform HID transport: opens a device by platform path and runs its
//! per-device worker thread.
//!
//! One thread per open device, an atomic `running` flag for shutdown,
//! detach rather than join. Each OS module implements
//! [`crate::device::DeviceIo`] and exposes a single `open` function with the
//! same signature.

#[cfg(target_os = "linux")]
pub mod linux;
#[cfg(target_os = "macos")]
pub mod macos;
#[cfg(windows)]
pub mod windows;

use std::ffi::CStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crate::device::{DeviceBase, DeviceIo};
use crate::error::HidResult;
use crate::token::DeviceToken;

/// Opens the platform device at `path` for interrupt/report transfer.
pub fn open(path: &CStr) -> HidResult<Box<dyn DeviceIo + Send>> {
    #[cfg(target_os = "linux")]
    {
        linux::open(path)
    }
    #[cfg(windows)]
    {
        windows::open(path)
    }
    #[cfg(target_os = "macos")]
    {
        macos::open(path)
    }
    #[cfg(not(any(target_os = "linux", windows, target_os = "macos")))]
    {
        let _ = path;
        compile_error!("hidinputdev has no transport for this target platform");
    }
}

/// Owns the shutdown flag for one device's worker thread. Dropping this
/// does not stop the thread; call [`Worker::stop`] explicitly. The thread
/// itself is detached, never joined, matching the one-thread-per-device,
/// no-teardown-barrier concurrency model.
///
/// Construction (`new`) and spawning (`start`) are split so a driver's
/// `make` can build its `Arc<dyn DeviceBase>` first and hand a clone of it
/// to the worker once the `Arc` exists.
pub struct Worker {
    running: Arc<AtomicBool>,
}

impl Worker {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Spawns the cycle loop: `initial_cycle` once, `transfer_cycle`
    /// repeatedly while `running`, then `final_cycle` followed by
    /// `device_disconnected` before the thread exits. `token` is moved into
    /// the closure only (never stored on the driver), so once the loop
    /// exits it clears the token's cached `Base` and tells the finder the
    /// disconnect sequence is complete — the only things still keeping the
    /// `Arc<dyn DeviceBase>` alive past that point are callers already
    /// holding a clone of it.
    pub fn start(&self, base: Arc<dyn DeviceBase>, io: Box<dyn DeviceIo + Send>, token: DeviceToken) {
        let running_thread = self.running.clone();

        let builder = thread::Builder::new().name("hid-transfer".into());
        if let Err(e) = builder.spawn(move || {
            base.initial_cycle(io.as_ref());
            while running_thread.load(Ordering::Acquire) {
                base.transfer_cycle(io.as_ref());
            }
            base.final_cycle(io.as_ref());
            base.device_disconnected();
            token.clear_base();
            crate::finder::notify_disconnected(token.path());
        }) {
            tracing::error!(target: "hidinputdev::transport", "failed to spawn transfer thread: {e}");
        }
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }
}

impl Default for Worker {
    fn default() -> Self {
        Self::new()
    }
}
