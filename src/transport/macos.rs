//! macOS transport: `IOHIDDevice` (IOKit's user-space HID client).
//!
//! Routes both "USB interrupt transfer" and HID report I/O through
//! `IOHIDDeviceSetReport`/`IOHIDDeviceGetReport` with
//! `kIOHIDReportTypeOutput`/`kIOHIDReportTypeInput` — IOKit accepts this for
//! any `IOHIDDevice`, interrupt-pipe vendor traffic (like the GameCube
//! adapter) included, without needing a raw `IOUSBInterfaceInterface` pipe.

use std::ffi::CStr;

use core_foundation::base::TCFType;
use core_foundation::data::CFData;
use core_foundation::string::CFString;
use io_kit_sys::hid::base::IOHIDDeviceRef;
use io_kit_sys::hid::device::{
    IOHIDDeviceClose, IOHIDDeviceCreate, IOHIDDeviceGetProperty, IOHIDDeviceGetReport,
    IOHIDDeviceOpen, IOHIDDeviceSetReport,
};
use io_kit_sys::hid::keys::{kIOHIDOptionsTypeNone, kIOHIDReportDescriptorKey};
use io_kit_sys::ret::kIOReturnSuccess;
use io_kit_sys::types::{io_registry_entry_t, IORegistryEntryFromPath};
use io_kit_sys::{kIOMasterPortDefault, kIOServicePlane};

use crate::device::DeviceIo;
use crate::error::{HidError, HidResult};
use crate::hid_parser::ReportKind;

/// IOKit's own report-type enum (`IOHIDReportType`); mirrors
/// `kIOHIDReportTypeInput`/`Output`/`Feature`.
fn iokit_report_type(kind: ReportKind) -> u32 {
    match kind {
        ReportKind::Input => 0,
        ReportKind::Output => 1,
        ReportKind::Feature => 2,
    }
}

pub struct MacDevice {
    device: IOHIDDeviceRef,
    path: String,
}

unsafe impl Send for MacDevice {}

pub fn open(path: &CStr) -> HidResult<Box<dyn DeviceIo + Send>> {
    let path_str = path.to_string_lossy().into_owned();
    let entry: io_registry_entry_t =
        unsafe { IORegistryEntryFromPath(kIOMasterPortDefault, path.as_ptr() as *const i8) };
    if entry == 0 {
        return Err(HidError::OpenFailed {
            path: path_str,
            message: "no IORegistryEntry at this path".into(),
        });
    }

    let device = unsafe { IOHIDDeviceCreate(std::ptr::null(), entry) };
    if device.is_null() {
        return Err(HidError::OpenFailed {
            path: path_str,
            message: "IOHIDDeviceCreate failed".into(),
        });
    }

    let result = unsafe { IOHIDDeviceOpen(device, kIOHIDOptionsTypeNone) };
    if result != kIOReturnSuccess {
        return Err(HidError::ExclusiveAccess { path: path_str });
    }

    Ok(Box::new(MacDevice {
        device,
        path: path_str,
    }))
}

impl Drop for MacDevice {
    fn drop(&mut self) {
        unsafe {
            IOHIDDeviceClose(self.device, kIOHIDOptionsTypeNone);
        }
    }
}

impl DeviceIo for MacDevice {
    fn send_usb_interrupt_transfer(&self, data: &[u8]) -> HidResult<usize> {
        self.send_hid_report(ReportKind::Output, data).map(|_| data.len())
    }

    fn receive_usb_interrupt_transfer(&self, buf: &mut [u8]) -> HidResult<usize> {
        self.receive_hid_report(ReportKind::Input, 0, buf)
    }

    fn send_hid_report(&self, kind: ReportKind, data: &[u8]) -> HidResult<()> {
        let result = unsafe {
            IOHIDDeviceSetReport(
                self.device,
                iokit_report_type(kind),
                0,
                data.as_ptr(),
                data.len() as isize,
            )
        };
        if result != kIOReturnSuccess {
            return Err(HidError::TransferFailure {
                message: format!("IOHIDDeviceSetReport failed: {result}"),
            });
        }
        Ok(())
    }

    fn receive_hid_report(&self, kind: ReportKind, report_id: u8, buf: &mut [u8]) -> HidResult<usize> {
        let mut len = buf.len() as isize;
        let result = unsafe {
            IOHIDDeviceGetReport(
                self.device,
                iokit_report_type(kind),
                report_id as isize,
                buf.as_mut_ptr(),
                &mut len,
            )
        };
        if result != kIOReturnSuccess {
            return Err(HidError::HotUnplug {
                path: self.path.clone(),
            });
        }
        Ok(len as usize)
    }

    fn get_report_descriptor(&self) -> HidResult<Vec<u8>> {
        let key = CFString::new(kIOHIDReportDescriptorKey);
        let value = unsafe { IOHIDDeviceGetProperty(self.device, key.as_concrete_TypeRef()) };
        if value.is_null() {
            return Err(HidError::DescriptorParseError {
                reason: "device has no kIOHIDReportDescriptorKey property",
            });
        }
        let data = unsafe { CFData::wrap_under_get_rule(value as _) };
        Ok(data.bytes().to_vec())
    }
}
