//! Platform half of device discovery: one-shot enumeration plus a hot-plug
//! watch thread per OS.
//!
//! Each platform module exposes `enumerate() -> Vec<DeviceToken>` (a full
//! synchronous scan) and `watch(on_event, stop)` (runs on the dedicated
//! listener thread until `stop` is set).

#[cfg(target_os = "linux")]
pub mod linux;
#[cfg(target_os = "macos")]
pub mod macos;
#[cfg(windows)]
pub mod windows;

use std::ffi::CString;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crate::token::DeviceToken;

#[derive(Debug)]
pub enum Event {
    Inserted(DeviceToken),
    Removed(CString),
}

pub fn enumerate() -> Vec<DeviceToken> {
    #[cfg(target_os = "linux")]
    {
        linux::enumerate()
    }
    #[cfg(windows)]
    {
        windows::enumerate()
    }
    #[cfg(target_os = "macos")]
    {
        macos::enumerate()
    }
    #[cfg(not(any(target_os = "linux", windows, target_os = "macos")))]
    {
        compile_error!("hidinputdev has no listener for this target platform");
    }
}

/// Handle to the running listener thread; dropping it does not stop the
/// thread (detach, not join — see [`crate::transport::Worker`]), call
/// [`ListenerHandle::stop`] explicitly.
pub struct ListenerHandle {
    stop: Arc<AtomicBool>,
}

impl ListenerHandle {
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
    }
}

/// Starts the platform watch thread, invoking `on_event` for every
/// insertion/removal it observes. `Sync` is required (not just `Send`)
/// because the Windows backend additionally shares `on_event` with the
/// independent XInput arbiter thread.
pub fn start(on_event: impl Fn(Event) + Send + Sync + 'static) -> ListenerHandle {
    let stop = Arc::new(AtomicBool::new(false));
    let stop_thread = stop.clone();

    let builder = thread::Builder::new().name("hid-listener".into());
    if let Err(e) = builder.spawn(move || {
        #[cfg(target_os = "linux")]
        linux::watch(on_event, stop_thread);
        #[cfg(windows)]
        windows::watch(on_event, stop_thread);
        #[cfg(target_os = "macos")]
        macos::watch(on_event, stop_thread);
    }) {
        tracing::error!(target: "hidinputdev::listener", "failed to spawn listener thread: {e}");
    }

    ListenerHandle { stop }
}
