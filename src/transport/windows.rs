//! Windows transport: `CreateFileW` against a SetupAPI device-interface
//! path, overlapped `ReadFile`/`WriteFile` for input/output reports, and
//! `HidD_Get/SetFeature` for feature reports.
//!
//! Builds on the `Handle`/`Overlapped` RAII wrappers in
//! [`crate::windows_native::types`] and the preparsed-data reconstruction in
//! [`crate::windows_native::descriptor`].

use std::cell::RefCell;
use std::ffi::CStr;

use windows_sys::Win32::Devices::HumanInterfaceDevice::{HidD_GetFeature, HidD_SetFeature};
use windows_sys::Win32::Foundation::{GENERIC_READ, GENERIC_WRITE, INVALID_HANDLE_VALUE};
use windows_sys::Win32::Storage::FileSystem::{
    CreateFileW, ReadFile, WriteFile, FILE_FLAG_OVERLAPPED, FILE_SHARE_READ, FILE_SHARE_WRITE,
    OPEN_EXISTING,
};

use crate::device::DeviceIo;
use crate::error::{HidError, HidResult};
use crate::hid_parser::ReportKind;
use crate::windows_native::descriptor;
use crate::windows_native::error::{WinError, Win32Error};
use crate::windows_native::hid::PreparsedData;
use crate::windows_native::string::U16String;
use crate::windows_native::types::{Handle, Overlapped};

pub struct WindowsDevice {
    handle: Handle,
    read_ol: RefCell<Overlapped>,
    write_ol: RefCell<Overlapped>,
    path: String,
}

pub fn open(path: &CStr) -> HidResult<Box<dyn DeviceIo + Send>> {
    let path_str = path.to_string_lossy().into_owned();
    let wide = U16String::try_from(path).map_err(|_| HidError::OpenFailed {
        path: path_str.clone(),
        message: "device path is not valid UTF-8".into(),
    })?;

    let raw = unsafe {
        CreateFileW(
            wide.as_ptr(),
            GENERIC_READ | GENERIC_WRITE,
            FILE_SHARE_READ | FILE_SHARE_WRITE,
            std::ptr::null(),
            OPEN_EXISTING,
            FILE_FLAG_OVERLAPPED,
            0,
        )
    };
    if raw == INVALID_HANDLE_VALUE {
        return Err(match Win32Error::last() {
            Win32Error::Generic(code) if code == windows_sys::Win32::Foundation::ERROR_ACCESS_DENIED => {
                HidError::ExclusiveAccess { path: path_str }
            }
            err => HidError::from(WinError::from(err)),
        });
    }

    Ok(Box::new(WindowsDevice {
        handle: Handle::from_raw(raw),
        read_ol: RefCell::new(Overlapped::default()),
        write_ol: RefCell::new(Overlapped::default()),
        path: path_str,
    }))
}

impl WindowsDevice {
    fn overlapped_write(&self, data: &[u8]) -> HidResult<usize> {
        let mut ol = self.write_ol.borrow_mut();
        let ok = unsafe {
            WriteFile(
                self.handle.as_raw(),
                data.as_ptr(),
                data.len() as u32,
                std::ptr::null_mut(),
                ol.as_raw(),
            )
        };
        if ok == 0 && Win32Error::last() != Win32Error::IoPending {
            return Err(WinError::last().into());
        }
        Ok(ol.get_result(&self.handle, None)?)
    }

    fn overlapped_read(&self, buf: &mut [u8]) -> HidResult<usize> {
        let mut ol = self.read_ol.borrow_mut();
        let ok = unsafe {
            ReadFile(
                self.handle.as_raw(),
                buf.as_mut_ptr(),
                buf.len() as u32,
                std::ptr::null_mut(),
                ol.as_raw(),
            )
        };
        if ok == 0 && Win32Error::last() != Win32Error::IoPending {
            return Err(WinError::last().into());
        }
        let n = ol.get_result(&self.handle, None)?;
        if n == 0 {
            return Err(HidError::HotUnplug {
                path: self.path.clone(),
            });
        }
        Ok(n)
    }
}

impl DeviceIo for WindowsDevice {
    fn send_usb_interrupt_transfer(&self, data: &[u8]) -> HidResult<usize> {
        self.overlapped_write(data)
    }

    fn receive_usb_interrupt_transfer(&self, buf: &mut [u8]) -> HidResult<usize> {
        self.overlapped_read(buf)
    }

    fn send_hid_report(&self, kind: ReportKind, data: &[u8]) -> HidResult<()> {
        match kind {
            ReportKind::Output => {
                self.overlapped_write(data)?;
                Ok(())
            }
            ReportKind::Feature => {
                let ok = unsafe {
                    HidD_SetFeature(
                        self.handle.as_raw(),
                        data.as_ptr() as *mut _,
                        data.len() as u32,
                    )
                };
                if ok == 0 {
                    return Err(WinError::last().into());
                }
                Ok(())
            }
            ReportKind::Input => Err(HidError::TransferFailure {
                message: "cannot send an Input report".into(),
            }),
        }
    }

    fn receive_hid_report(&self, kind: ReportKind, report_id: u8, buf: &mut [u8]) -> HidResult<usize> {
        match kind {
            ReportKind::Input => self.overlapped_read(buf),
            ReportKind::Feature => {
                // HidD_GetFeature requires the report ID in buf[0] on entry.
                if let Some(first) = buf.first_mut() {
                    *first = report_id;
                }
                let ok = unsafe {
                    HidD_GetFeature(self.handle.as_raw(), buf.as_mut_ptr() as *mut _, buf.len() as u32)
                };
                if ok == 0 {
                    return Err(WinError::last().into());
                }
                Ok(buf.len())
            }
            ReportKind::Output => Err(HidError::TransferFailure {
                message: "cannot receive an Output report".into(),
            }),
        }
    }

    fn get_report_descriptor(&self) -> HidResult<Vec<u8>> {
        let pp_data = PreparsedData::load(&self.handle)?;
        Ok(descriptor::get_descriptor(&pp_data)?)
    }
}
