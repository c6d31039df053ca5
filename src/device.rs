//! Device base and the transport-facing I/O contract drivers use to talk to
//! the platform transport.
//!
//! A `DeviceBase` is shared between the token (primary owner), the client,
//! and the transport worker thread; in Rust that shared ownership is simply
//! `Arc<dyn DeviceBase>`. The report-kind enum used by
//! `received_hid_report`/`send_hid_report`/`receive_hid_report` is
//! [`crate::hid_parser::ReportKind`].

use std::sync::Mutex;

use crate::error::HidResult;
use crate::hid_parser::ReportKind;

/// Lifecycle callbacks the worker thread invokes on a driver, and the
/// operations it exposes to the driver in turn. Dynamic dispatch happens
/// once per cycle and is not on a hot path, so a trait object is
/// appropriate.
pub trait DeviceBase: Send + Sync + 'static {
    /// Stable hash of this driver's class name (see [`crate::signature::type_hash`]).
    fn type_hash(&self) -> u64;

    /// Narrows the trait object back to its concrete type. Needed only by
    /// [`crate::xinput::XInputArbiter`], which calls into the one driver it
    /// drives directly (`XInputPad::on_state`) rather than through
    /// `transfer_cycle`, since XInput has no per-device transport of its
    /// own for the worker thread to poll.
    fn as_any(&self) -> &dyn std::any::Any;

    /// Runs once before any `transferCycle`, on the worker thread, after the
    /// transport has successfully opened the device.
    fn initial_cycle(&self, _io: &dyn DeviceIo) {}

    /// Runs repeatedly on the worker thread until `running` is cleared.
    fn transfer_cycle(&self, _io: &dyn DeviceIo) {}

    /// Runs once as the worker thread is winding down, before the device is
    /// closed and before `device_disconnected`.
    fn final_cycle(&self, _io: &dyn DeviceIo) {}

    /// Last callback on this device; invoked exactly once, by the worker
    /// thread right after `final_cycle` (see [`crate::transport::Worker`]).
    /// Closing a token only requests the worker stop ([`Self::stop_transport`]);
    /// it never calls this directly, so `final_cycle` always happens-before
    /// `device_disconnected`.
    fn device_disconnected(&self) {}

    /// Requests the device's transport worker thread to stop, if it has
    /// one. Default no-op for drivers with no transport of their own
    /// (e.g. [`crate::drivers::xinput_pad`], arbitrated by
    /// [`crate::xinput::XInputArbiter`] instead).
    fn stop_transport(&self) {}

    /// One inbound HID report. `report_id` is `buf[0]` when the descriptor
    /// uses multiple reports, else 0.
    fn received_hid_report(&self, _data: &[u8], _kind: ReportKind, _report_id: u8) {}

    /// Non-fatal worker-thread error; default implementation logs via the
    /// host logger (`tracing`) rather than propagating.
    fn device_error(&self, message: &str) {
        tracing::warn!(target: "hidinputdev::device", "device error: {message}");
    }
}

/// The operations the core exposes to a driver, implemented once per
/// platform transport (component D).
pub trait DeviceIo: Send + Sync {
    fn send_usb_interrupt_transfer(&self, data: &[u8]) -> HidResult<usize>;
    fn receive_usb_interrupt_transfer(&self, buf: &mut [u8]) -> HidResult<usize>;
    fn send_hid_report(&self, kind: ReportKind, data: &[u8]) -> HidResult<()>;
    fn receive_hid_report(&self, kind: ReportKind, report_id: u8, buf: &mut [u8]) -> HidResult<usize>;
    fn get_report_descriptor(&self) -> HidResult<Vec<u8>>;
}

/// Guards a user-supplied event callback so that setting it and dispatching
/// through it can never interleave torn.
pub struct CallbackSlot<T: ?Sized>(Mutex<Option<Box<T>>>);

impl<T: ?Sized> Default for CallbackSlot<T> {
    fn default() -> Self {
        Self(Mutex::new(None))
    }
}

impl<T: ?Sized> CallbackSlot<T> {
    pub fn set(&self, cb: Box<T>) {
        *self.0.lock().expect("callback lock poisoned") = Some(cb);
    }

    pub fn clear(&self) {
        self.0.lock().expect("callback lock poisoned").take();
    }

    pub fn with<R>(&self, f: impl FnOnce(Option<&mut T>) -> R) -> R {
        let mut guard = self.0.lock().expect("callback lock poisoned");
        f(guard.as_deref_mut())
    }
}
