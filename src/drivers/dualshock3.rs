//! Sony DualShock 3 driver.
//!
//! A single fixed 49-byte HID input report (report ID 0x01); two
//! consecutive button bytes hold the digital face/d-pad/shoulder mask, four
//! bytes hold the analog sticks, and two bytes hold analog trigger
//! pressure.

use std::sync::Arc;

use crate::device::{DeviceBase, DeviceIo};
use crate::error::HidResult;
use crate::hid_parser::ReportKind;
use crate::token::DeviceToken;
use crate::transport::{self, Worker};

use super::{PadCallbackSlot, PadState};

const REPORT_ID: u8 = 0x01;
const REPORT_LEN: usize = 49;

/// Button-byte offsets within the report body (after the leading report-id
/// byte stripped by the transport).
const BUTTONS_LOW: usize = 1;
const BUTTONS_HIGH: usize = 2;
const STICK_LX: usize = 5;
const STICK_LY: usize = 6;
const STICK_RX: usize = 7;
const STICK_RY: usize = 8;
const TRIGGER_L2: usize = 17;
const TRIGGER_R2: usize = 18;

pub fn make(token: DeviceToken) -> HidResult<Arc<dyn DeviceBase>> {
    let io = transport::open(token.path())?;
    let driver = Arc::new(Dualshock3Pad {
        callback: PadCallbackSlot::default(),
        worker: Worker::new(),
    });
    driver.worker.start(driver.clone(), io, token);
    Ok(driver)
}

pub struct Dualshock3Pad {
    callback: PadCallbackSlot,
    worker: Worker,
}

impl Dualshock3Pad {
    pub fn set_callback(&self, cb: impl FnMut(PadState) + Send + 'static) {
        self.callback.set_callback(cb);
    }

    /// Decodes the raw report buffer (report id still at index 0, as
    /// hidraw/`ReadFile` deliver it) into the 16-bit button mask.
    pub fn decode_buttons(body: &[u8]) -> u32 {
        u32::from(body[BUTTONS_LOW]) | (u32::from(body[BUTTONS_HIGH]) << 8)
    }
}

impl DeviceBase for Dualshock3Pad {
    fn type_hash(&self) -> u64 {
        crate::signature::type_hash("DualshockPad")
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn initial_cycle(&self, io: &dyn DeviceIo) {
        // A single zero-length feature report puts the pad into "operational"
        // report mode; some third-party pads ignore it harmlessly.
        if let Err(e) = io.send_hid_report(ReportKind::Feature, &[0xF4, 0x42, 0x03, 0x00, 0x00]) {
            self.device_error(&format!("could not arm report mode: {e}"));
        }
    }

    fn transfer_cycle(&self, io: &dyn DeviceIo) {
        let mut buf = [0u8; REPORT_LEN];
        let n = match io.receive_hid_report(ReportKind::Input, REPORT_ID, &mut buf) {
            Ok(n) => n,
            Err(e) => return self.device_error(&e.to_string()),
        };
        if n < REPORT_LEN {
            return;
        }

        let state = PadState {
            buttons: Self::decode_buttons(&buf),
            left_stick_x: i16::from(buf[STICK_LX]) - 128,
            left_stick_y: i16::from(buf[STICK_LY]) - 128,
            right_stick_x: i16::from(buf[STICK_RX]) - 128,
            right_stick_y: i16::from(buf[STICK_RY]) - 128,
            left_trigger: buf[TRIGGER_L2],
            right_trigger: buf[TRIGGER_R2],
        };
        self.callback.dispatch(state);
    }

    fn stop_transport(&self) {
        self.worker.stop();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn button_mask_scenario() {
        // Cross + Start + R1 held: bit layout per original DS3 report.
        let mut body = [0u8; REPORT_LEN - 1];
        body[BUTTONS_LOW - 1] = 0b0000_1000; // Start
        body[BUTTONS_HIGH - 1] = 0b0000_1000 | 0b0000_0100; // R1 | Cross
        let mask = Dualshock3Pad::decode_buttons(&[0, body[0], body[1]]);
        assert_eq!(mask, 0b0000_1100_0000_1000);
    }

    /// Literal bytes: `0x01` (report id), `0x00`, then the buttons field
    /// big-endian as `0x08 0x00` (Start alone) must decode to `0x0800`.
    #[test]
    fn literal_button_mask_scenario() {
        let report = [0x01u8, 0x00, 0x08, 0x00];
        assert_eq!(Dualshock3Pad::decode_buttons(&report), 0x0800);
    }
}
