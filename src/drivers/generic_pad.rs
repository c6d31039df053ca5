//! Fallback driver for any HID device not matched by a more specific
//! signature (`DeviceSignature::instantiate`'s generic-HID branch).
//!
//! Parses the device's own report descriptor with
//! [`crate::hid_parser::HidParser`] instead of hard-coding an offset table,
//! then maps the first four variable-usage values it finds onto
//! [`super::PadState`]'s stick axes and the rest onto the button bitmask.

use std::sync::Arc;

use crate::device::{DeviceBase, DeviceIo};
use crate::error::HidResult;
use crate::hid_parser::{HidParser, ParserStatus, ReportKind};
use crate::token::DeviceToken;
use crate::transport::{self, Worker};

use super::{PadCallbackSlot, PadState};

pub fn make(token: DeviceToken) -> HidResult<Arc<dyn DeviceBase>> {
    let io = transport::open(token.path())?;
    let driver = Arc::new(GenericPad {
        callback: PadCallbackSlot::default(),
        worker: Worker::new(),
    });
    driver.worker.start(driver.clone(), io, token);
    Ok(driver)
}

pub struct GenericPad {
    callback: PadCallbackSlot,
    worker: Worker,
}

impl GenericPad {
    pub fn set_callback(&self, cb: impl FnMut(PadState) + Send + 'static) {
        self.callback.set_callback(cb);
    }
}

impl DeviceBase for GenericPad {
    fn type_hash(&self) -> u64 {
        crate::signature::type_hash("GenericPad")
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn initial_cycle(&self, io: &dyn DeviceIo) {
        if let Err(e) = io.get_report_descriptor() {
            self.device_error(&format!("could not fetch report descriptor: {e}"));
        }
    }

    fn transfer_cycle(&self, io: &dyn DeviceIo) {
        let descriptor = match io.get_report_descriptor() {
            Ok(d) => d,
            Err(e) => return self.device_error(&e.to_string()),
        };
        let mut parser = HidParser::new();
        if parser.parse(&descriptor) != ParserStatus::Done {
            return self.device_error("report descriptor did not parse");
        }

        let mut buf = vec![0u8; parser.max_input_report_size()];
        let n = match io.receive_hid_report(ReportKind::Input, 0, &mut buf) {
            Ok(n) => n,
            Err(e) => return self.device_error(&e.to_string()),
        };
        buf.truncate(n);

        let mut values = Vec::new();
        parser.scan_values(&buf, |item, value| values.push((item.usage, value)));

        let mut state = PadState::default();
        if let Some(&(_, v)) = values.first() {
            state.left_stick_x = v as i16 - 128;
        }
        if let Some(&(_, v)) = values.get(1) {
            state.left_stick_y = v as i16 - 128;
        }
        if let Some(&(_, v)) = values.get(2) {
            state.right_stick_x = v as i16 - 128;
        }
        if let Some(&(_, v)) = values.get(3) {
            state.right_stick_y = v as i16 - 128;
        }
        for (i, &(_, v)) in values.iter().enumerate().skip(4) {
            if v != 0 {
                state.buttons |= 1 << (i - 4).min(31);
            }
        }

        self.callback.dispatch(state);
    }

    fn received_hid_report(&self, _data: &[u8], _kind: ReportKind, _report_id: u8) {}

    fn stop_transport(&self) {
        self.worker.stop();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    /// Four 8-bit variable fields (sticks) followed by four 1-bit variable
    /// fields (buttons), matching what an unrecognized HID gamepad's own
    /// descriptor would declare.
    fn descriptor() -> Vec<u8> {
        vec![
            0x05, 0x01, // Usage Page (Generic Desktop)
            0x09, 0x05, // Usage (Game Pad)
            0xA1, 0x01, // Collection (Application)
            0x15, 0x00, // Logical Minimum (0)
            0x26, 0xFF, 0x00, // Logical Maximum (255)
            0x75, 0x08, // Report Size (8)
            0x95, 0x04, // Report Count (4)
            0x81, 0x02, // Input (Data,Var,Abs) -- 4 stick bytes
            0x75, 0x01, // Report Size (1)
            0x95, 0x04, // Report Count (4)
            0x81, 0x02, // Input (Data,Var,Abs) -- 4 button bits
            0xC0,
        ]
    }

    struct FakeIo {
        report: Vec<u8>,
    }

    impl DeviceIo for FakeIo {
        fn send_usb_interrupt_transfer(&self, _data: &[u8]) -> HidResult<usize> {
            Ok(0)
        }
        fn receive_usb_interrupt_transfer(&self, _buf: &mut [u8]) -> HidResult<usize> {
            Ok(0)
        }
        fn send_hid_report(&self, _kind: ReportKind, _data: &[u8]) -> HidResult<()> {
            Ok(())
        }
        fn receive_hid_report(&self, _kind: ReportKind, _report_id: u8, buf: &mut [u8]) -> HidResult<usize> {
            let n = self.report.len().min(buf.len());
            buf[..n].copy_from_slice(&self.report[..n]);
            Ok(n)
        }
        fn get_report_descriptor(&self) -> HidResult<Vec<u8>> {
            Ok(descriptor())
        }
    }

    fn make_driver() -> GenericPad {
        GenericPad {
            callback: PadCallbackSlot::default(),
            worker: Worker::new(),
        }
    }

    #[test]
    fn descriptor_driven_decode_maps_sticks_then_buttons() {
        let driver = make_driver();
        let dispatched = Arc::new(std::sync::Mutex::new(None));
        let slot = dispatched.clone();
        driver.set_callback(move |state| {
            *slot.lock().unwrap() = Some(state);
        });

        let io = FakeIo { report: vec![10, 20, 30, 40, 0x0B] };
        driver.transfer_cycle(&io);

        let state = dispatched.lock().unwrap().expect("callback dispatched once");
        assert_eq!(state.left_stick_x, 10 - 128);
        assert_eq!(state.left_stick_y, 20 - 128);
        assert_eq!(state.right_stick_x, 30 - 128);
        assert_eq!(state.right_stick_y, 40 - 128);
        assert_eq!(state.buttons, 0x0B);
    }

    #[test]
    fn unparseable_descriptor_does_not_panic() {
        struct BadDescriptorIo;
        impl DeviceIo for BadDescriptorIo {
            fn send_usb_interrupt_transfer(&self, _data: &[u8]) -> HidResult<usize> {
                Ok(0)
            }
            fn receive_usb_interrupt_transfer(&self, _buf: &mut [u8]) -> HidResult<usize> {
                Ok(0)
            }
            fn send_hid_report(&self, _kind: ReportKind, _data: &[u8]) -> HidResult<()> {
                Ok(())
            }
            fn receive_hid_report(&self, _kind: ReportKind, _report_id: u8, _buf: &mut [u8]) -> HidResult<usize> {
                Ok(0)
            }
            fn get_report_descriptor(&self) -> HidResult<Vec<u8>> {
                // Unbalanced collection: parser must fail, not panic.
                Ok(vec![0xA1, 0x01])
            }
        }

        let driver = make_driver();
        driver.transfer_cycle(&BadDescriptorIo);
    }
}
