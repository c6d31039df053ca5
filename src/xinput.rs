//! Windows-only XInput arbiter.
//!
//! Windows itself arbitrates the four XInput controller slots, so unlike
//! every other driver in [`crate::drivers`] there is no per-device
//! transport for [`crate::transport::Worker`] to open. A single dedicated
//! thread polls all four slots at ~100Hz via `XInputGetState`, synthesizes
//! insert/remove [`crate::listener::Event`]s the same way a platform
//! listener would, and writes back rumble state through `XInputSetState`
//! when a client has requested it.

use std::ffi::CString;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use windows_sys::Win32::UI::Input::XboxController::{
    XInputGetState, XInputSetState, XINPUT_GAMEPAD, XINPUT_STATE, XINPUT_VIBRATION,
};

use crate::drivers::xinput_pad::{XInputGamepadState, XInputPad};
use crate::listener::Event;
use crate::token::{DeviceKind, DeviceToken};

const SLOT_COUNT: u32 = 4;
const XINPUT_VID: u16 = 0x045E;
const XINPUT_PID: u16 = 0x028E;
const POLL_INTERVAL: Duration = Duration::from_millis(10);
const ERROR_SUCCESS: u32 = 0;

fn slot_path(slot: u32) -> CString {
    CString::new(format!("xinput://{slot}")).expect("slot index never contains a NUL byte")
}

/// Handle to the arbiter thread; like [`crate::listener::ListenerHandle`],
/// dropping it does not stop the thread — call [`XInputArbiter::stop`].
pub struct XInputArbiter {
    stop: Arc<AtomicBool>,
}

impl XInputArbiter {
    /// Starts the polling thread, invoking `on_event` for every slot
    /// connect/disconnect it observes. Usually started once, from
    /// `listener::windows::watch`, alongside the device-interface
    /// enumeration; exposed publicly so a caller can run it standalone
    /// without the rest of the hidraw/SetupAPI listener.
    pub fn start(on_event: impl Fn(Event) + Send + Sync + 'static) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_thread = stop.clone();

        let builder = thread::Builder::new().name("hid-xinput-arbiter".into());
        if let Err(e) = builder.spawn(move || run(on_event, stop_thread)) {
            tracing::error!(target: "hidinputdev::xinput", "failed to spawn XInput arbiter thread: {e}");
        }

        Self { stop }
    }

    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
    }
}

fn run(on_event: impl Fn(Event) + Send + Sync + 'static, stop: Arc<AtomicBool>) {
    let mut tokens: [Option<DeviceToken>; SLOT_COUNT as usize] = Default::default();

    while !stop.load(Ordering::Acquire) {
        for slot in 0..SLOT_COUNT {
            let idx = slot as usize;
            let mut state: XINPUT_STATE = unsafe { std::mem::zeroed() };
            let connected = unsafe { XInputGetState(slot, &mut state) } == ERROR_SUCCESS;

            match (connected, tokens[idx].is_some()) {
                (true, false) => {
                    let token = DeviceToken::new(
                        DeviceKind::XInput,
                        XINPUT_VID,
                        XINPUT_PID,
                        "Microsoft".into(),
                        format!("XInput Controller #{slot}"),
                        slot_path(slot),
                    );
                    tokens[idx] = Some(token.clone());
                    on_event(Event::Inserted(token));
                }
                (false, true) => {
                    if let Some(token) = tokens[idx].take() {
                        // No `final_cycle` to run here: XInput has no
                        // `DeviceIo`/transport of its own, and `XInputPad`
                        // never overrides `final_cycle`, so the only
                        // teardown step that matters is the disconnect
                        // callback itself.
                        if let Some(base) = token.cached_device() {
                            base.device_disconnected();
                        }
                        token.clear_base();
                        crate::finder::notify_disconnected(token.path());
                        on_event(Event::Removed(token.path().to_owned()));
                    }
                }
                _ => {}
            }

            if connected {
                if let Some(token) = &tokens[idx] {
                    dispatch_state(token, &state.Gamepad);
                    sync_rumble(token);
                }
            }
        }

        thread::sleep(POLL_INTERVAL);
    }
}

/// Forwards one slot's snapshot to its driver, if a client has opened the
/// token; an un-opened token has no cached `Base` to call into.
fn dispatch_state(token: &DeviceToken, gamepad: &XINPUT_GAMEPAD) {
    let Some(base) = token.cached_device() else {
        return;
    };
    if let Some(pad) = base.as_any().downcast_ref::<XInputPad>() {
        pad.on_state(XInputGamepadState {
            buttons: gamepad.wButtons,
            left_trigger: gamepad.bLeftTrigger,
            right_trigger: gamepad.bRightTrigger,
            thumb_lx: gamepad.sThumbLX,
            thumb_ly: gamepad.sThumbLY,
            thumb_rx: gamepad.sThumbRX,
            thumb_ry: gamepad.sThumbRY,
        });
    }
}

/// Compares a connected slot's requested rumble intensity against what was
/// last committed and, if they differ, writes the new intensity back
/// through `XInputSetState`.
fn sync_rumble(token: &DeviceToken) {
    let Some(base) = token.cached_device() else {
        return;
    };
    let Some(pad) = base.as_any().downcast_ref::<XInputPad>() else {
        return;
    };
    let requested = pad.requested_intensity();
    if requested != pad.committed_intensity() && set_vibration(token, requested.0, requested.1) {
        pad.commit(requested);
    }
}

/// Writes rumble motor speeds back to the slot the token was created for.
/// Speeds are full-scale `u16`s, matching `XINPUT_VIBRATION`'s own fields.
pub fn set_vibration(token: &DeviceToken, low_frequency: u16, high_frequency: u16) -> bool {
    let Some(path) = token.path().to_str().ok() else {
        return false;
    };
    let Some(slot) = path.strip_prefix("xinput://").and_then(|s| s.parse::<u32>().ok()) else {
        return false;
    };
    let mut vibration = XINPUT_VIBRATION {
        wLeftMotorSpeed: low_frequency,
        wRightMotorSpeed: high_frequency,
    };
    unsafe { XInputSetState(slot, &mut vibration) == ERROR_SUCCESS }
}
