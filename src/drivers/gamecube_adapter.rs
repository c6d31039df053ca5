//! Nintendo/Dolphin GameCube Controller Adapter (4 wired ports on one USB
//! device).
//!
//! The adapter speaks a fixed 37-byte vendor protocol over USB interrupt
//! transfers, not a parsed HID report, so this driver talks to
//! [`crate::device::DeviceIo::send_usb_interrupt_transfer`] /
//! `receive_usb_interrupt_transfer` directly instead of going through
//! [`crate::hid_parser`].
//!
//! Stick axes are centered (`raw_byte as i16 - 128`); trigger axes are left
//! as raw, uncentered `u8` values.

use std::sync::Arc;

use crate::device::{DeviceBase, DeviceIo};
use crate::error::HidResult;
use crate::hid_parser::ReportKind;
use crate::token::DeviceToken;
use crate::transport::{self, Worker};

use super::{PadCallbackSlot, PadState};

const PORT_COUNT: usize = 4;
const REPORT_LEN: usize = 1 + PORT_COUNT * 9;

/// One-byte command that arms the adapter's rumble motors and starts it
/// streaming port state.
const CMD_HANDSHAKE: [u8; 1] = [0x13];

pub fn make(token: DeviceToken) -> HidResult<Arc<dyn DeviceBase>> {
    let io = transport::open(token.path())?;
    let driver = Arc::new(GameCubeAdapter {
        callback: PadCallbackSlot::default(),
        worker: Worker::new(),
    });
    driver.worker.start(driver.clone(), io, token);
    Ok(driver)
}

pub struct GameCubeAdapter {
    callback: PadCallbackSlot,
    worker: Worker,
}

impl GameCubeAdapter {
    pub fn set_callback(&self, cb: impl FnMut(PadState) + Send + 'static) {
        self.callback.set_callback(cb);
    }

    /// Decodes port `idx`'s 9-byte slice. Byte 0 bit 4 is the "controller
    /// connected" flag; callers skip the port when it is clear.
    fn decode_port(port: &[u8; 9]) -> Option<PadState> {
        if port[0] & 0x10 == 0 {
            return None;
        }
        let buttons = u32::from(port[1]) | (u32::from(port[2]) << 8);
        Some(PadState {
            buttons,
            left_stick_x: i16::from(port[3]) - 128,
            left_stick_y: i16::from(port[4]) - 128,
            right_stick_x: i16::from(port[5]) - 128,
            right_stick_y: i16::from(port[6]) - 128,
            left_trigger: port[7],
            right_trigger: port[8],
        })
    }
}

impl DeviceBase for GameCubeAdapter {
    fn type_hash(&self) -> u64 {
        crate::signature::type_hash("GameCubeAdapter")
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn initial_cycle(&self, io: &dyn DeviceIo) {
        if let Err(e) = io.send_usb_interrupt_transfer(&CMD_HANDSHAKE) {
            self.device_error(&format!("adapter handshake failed: {e}"));
        }
    }

    fn transfer_cycle(&self, io: &dyn DeviceIo) {
        let mut buf = [0u8; REPORT_LEN];
        let n = match io.receive_usb_interrupt_transfer(&mut buf) {
            Ok(n) => n,
            Err(e) => return self.device_error(&e.to_string()),
        };
        if n < REPORT_LEN {
            return;
        }

        for port_idx in 0..PORT_COUNT {
            let start = 1 + port_idx * 9;
            let mut port = [0u8; 9];
            port.copy_from_slice(&buf[start..start + 9]);
            if let Some(state) = Self::decode_port(&port) {
                self.callback.dispatch(state);
            }
        }
    }

    fn received_hid_report(&self, _data: &[u8], _kind: ReportKind, _report_id: u8) {}

    fn stop_transport(&self) {
        self.worker.stop();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    /// Port 0's 9-byte slice `{0x10, 0x00, 0x00, 0x80, 0x80, 0x7F, 0x7F,
    /// 0x00, 0x00}` must decode to `leftStick=(0,0)`, `rightStick=(-1,-1)`,
    /// triggers `(0,0)`, buttons `0x0000`.
    #[test]
    fn decodes_port_zero_scenario() {
        let port = [0x10, 0x00, 0x00, 0x80, 0x80, 0x7F, 0x7F, 0x00, 0x00];
        let state = GameCubeAdapter::decode_port(&port).expect("connected flag is set");
        assert_eq!(state.buttons, 0x0000);
        assert_eq!((state.left_stick_x, state.left_stick_y), (0, 0));
        assert_eq!((state.right_stick_x, state.right_stick_y), (-1, -1));
        assert_eq!((state.left_trigger, state.right_trigger), (0, 0));
    }

    #[test]
    fn disconnected_port_is_none() {
        let port = [0x00; 9];
        assert!(GameCubeAdapter::decode_port(&port).is_none());
    }

    /// The 37-byte inbound packet's leading byte (report id in the
    /// original's framing) is `0x21`; this driver doesn't branch on it
    /// since the adapter has exactly one report shape, but a short read
    /// (anything under `REPORT_LEN`) must be ignored rather than indexed
    /// out of bounds.
    #[test]
    fn transfer_cycle_ignores_short_reads() {
        use crate::error::HidResult;

        struct ShortRead;
        impl DeviceIo for ShortRead {
            fn send_usb_interrupt_transfer(&self, _data: &[u8]) -> HidResult<usize> {
                Ok(0)
            }
            fn receive_usb_interrupt_transfer(&self, buf: &mut [u8]) -> HidResult<usize> {
                buf[0] = 0x21;
                Ok(1)
            }
            fn send_hid_report(&self, _kind: ReportKind, _data: &[u8]) -> HidResult<()> {
                Ok(())
            }
            fn receive_hid_report(&self, _kind: ReportKind, _report_id: u8, _buf: &mut [u8]) -> HidResult<usize> {
                Ok(0)
            }
            fn get_report_descriptor(&self) -> HidResult<Vec<u8>> {
                Ok(Vec::new())
            }
        }

        let driver = GameCubeAdapter {
            callback: PadCallbackSlot::default(),
            worker: Worker::new(),
        };
        // Must not panic despite the buffer being far shorter than REPORT_LEN.
        driver.transfer_cycle(&ShortRead);
    }
}
