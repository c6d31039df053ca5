//! Concrete driver classes: each submodule's factory plus its concrete
//! `DeviceBase` implementation.
//!
//! Each submodule exposes a `pub fn make(token: DeviceToken) ->
//! HidResult<Arc<dyn DeviceBase>>` matching the `Factory` type alias in
//! [`crate::signature`].

pub mod dualshock3;
pub mod gamecube_adapter;
pub mod generic_pad;
pub mod powera;
pub mod xinput_pad;

use crate::device::CallbackSlot;

/// One gamepad's digital + analog state, reported to the client callback.
/// Axis values are centered where the source device supports it (see
/// [`gamecube_adapter`]'s stick-centering note) and left raw (0-255) where it
/// does not (triggers on every driver here).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PadState {
    pub buttons: u32,
    pub left_stick_x: i16,
    pub left_stick_y: i16,
    pub right_stick_x: i16,
    pub right_stick_y: i16,
    pub left_trigger: u8,
    pub right_trigger: u8,
}

pub type PadCallback = dyn FnMut(PadState) + Send;

/// Shared callback storage used by every concrete pad driver.
#[derive(Default)]
pub struct PadCallbackSlot(CallbackSlot<PadCallback>);

impl PadCallbackSlot {
    pub fn set_callback(&self, cb: impl FnMut(PadState) + Send + 'static) {
        self.0.set(Box::new(cb));
    }

    pub fn dispatch(&self, state: PadState) {
        self.0.with(|cb| {
            if let Some(cb) = cb {
                cb(state);
            }
        });
    }
}
