//! Driver for an XInput-arbitrated slot (Windows-only; see
//! [`crate::xinput`]).
//!
//! Unlike every other driver here, an XInput pad is never opened through
//! [`crate::device::DeviceIo`]/the platform transport: Windows itself
//! arbitrates the four XInput controller slots and the only way to read one
//! is `XInputGetState`, polled from a dedicated thread
//! ([`crate::xinput::XInputArbiter`]). That thread calls
//! [`XInputPad::on_state`] directly instead of this driver's
//! `transfer_cycle` ever running, and writes rumble back through
//! `XInputSetState` whenever the requested intensity differs from what was
//! last committed.

use std::sync::{Arc, Mutex};

use crate::device::DeviceBase;
use crate::error::HidResult;
use crate::token::DeviceToken;

use super::{PadCallbackSlot, PadState};

/// One `XINPUT_GAMEPAD` snapshot, already byte-order-native (the arbiter
/// reads it straight out of the `windows-sys` struct).
#[derive(Debug, Clone, Copy, Default)]
pub struct XInputGamepadState {
    pub buttons: u16,
    pub left_trigger: u8,
    pub right_trigger: u8,
    pub thumb_lx: i16,
    pub thumb_ly: i16,
    pub thumb_rx: i16,
    pub thumb_ry: i16,
}

pub fn make(_token: DeviceToken) -> HidResult<Arc<dyn DeviceBase>> {
    Ok(Arc::new(XInputPad {
        callback: PadCallbackSlot::default(),
        requested: Mutex::new((0, 0)),
        committed: Mutex::new((0, 0)),
    }))
}

pub struct XInputPad {
    callback: PadCallbackSlot,
    /// Low/high-frequency motor intensity last requested via
    /// [`Self::start_rumble`]/[`Self::stop_rumble`].
    requested: Mutex<(u16, u16)>,
    /// Intensity last actually written back through `XInputSetState`.
    committed: Mutex<(u16, u16)>,
}

impl XInputPad {
    pub fn set_callback(&self, cb: impl FnMut(PadState) + Send + 'static) {
        self.callback.set_callback(cb);
    }

    /// Called by the arbiter thread once per poll with this slot's current
    /// state; sticks come through already centered by XInput itself.
    pub fn on_state(&self, gamepad: XInputGamepadState) {
        self.callback.dispatch(PadState {
            buttons: u32::from(gamepad.buttons),
            left_stick_x: gamepad.thumb_lx,
            left_stick_y: gamepad.thumb_ly,
            right_stick_x: gamepad.thumb_rx,
            right_stick_y: gamepad.thumb_ry,
            left_trigger: gamepad.left_trigger,
            right_trigger: gamepad.right_trigger,
        });
    }

    /// Requests the low/high-frequency motors run at the given intensity.
    /// Takes effect on the arbiter's next poll, once it notices the
    /// requested intensity no longer matches what was last committed.
    pub fn start_rumble(&self, low_frequency: u16, high_frequency: u16) {
        *self.requested.lock().expect("xinput rumble lock poisoned") = (low_frequency, high_frequency);
    }

    pub fn stop_rumble(&self) {
        *self.requested.lock().expect("xinput rumble lock poisoned") = (0, 0);
    }

    pub(crate) fn requested_intensity(&self) -> (u16, u16) {
        *self.requested.lock().expect("xinput rumble lock poisoned")
    }

    pub(crate) fn committed_intensity(&self) -> (u16, u16) {
        *self.committed.lock().expect("xinput rumble lock poisoned")
    }

    pub(crate) fn commit(&self, intensity: (u16, u16)) {
        *self.committed.lock().expect("xinput rumble lock poisoned") = intensity;
    }
}

impl DeviceBase for XInputPad {
    fn type_hash(&self) -> u64 {
        crate::signature::type_hash("XInputPad")
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn on_state_maps_fields_without_recentering() {
        let driver = XInputPad {
            callback: PadCallbackSlot::default(),
            requested: Mutex::new((0, 0)),
            committed: Mutex::new((0, 0)),
        };
        let dispatched = Arc::new(Mutex::new(None));
        let slot = dispatched.clone();
        driver.set_callback(move |state| *slot.lock().unwrap() = Some(state));

        driver.on_state(XInputGamepadState {
            buttons: 0x1001,
            left_trigger: 12,
            right_trigger: 34,
            thumb_lx: -32768,
            thumb_ly: 32767,
            thumb_rx: 0,
            thumb_ry: -1,
        });

        let state = dispatched.lock().unwrap().expect("callback dispatched");
        assert_eq!(state.buttons, 0x1001);
        assert_eq!((state.left_trigger, state.right_trigger), (12, 34));
        assert_eq!((state.left_stick_x, state.left_stick_y), (-32768, 32767));
        assert_eq!((state.right_stick_x, state.right_stick_y), (0, -1));
    }

    #[test]
    fn rumble_request_tracks_until_committed() {
        let driver = XInputPad {
            callback: PadCallbackSlot::default(),
            requested: Mutex::new((0, 0)),
            committed: Mutex::new((0, 0)),
        };
        assert_eq!(driver.requested_intensity(), (0, 0));

        driver.start_rumble(100, 200);
        assert_eq!(driver.requested_intensity(), (100, 200));
        assert_ne!(driver.requested_intensity(), driver.committed_intensity());

        driver.commit(driver.requested_intensity());
        assert_eq!(driver.committed_intensity(), (100, 200));

        driver.stop_rumble();
        assert_eq!(driver.requested_intensity(), (0, 0));
        assert_ne!(driver.requested_intensity(), driver.committed_intensity());
    }
}
