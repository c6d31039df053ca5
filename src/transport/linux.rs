//! Linux transport: hidraw nodes (`/dev/hidrawN`), driven by the ioctls in
//! [`crate::linux_native::ioctl`].
//!
//! hidraw exposes input/output reports via plain `read`/`write` and feature
//! reports via `HIDIOCSFEATURE`/`HIDIOCGFEATURE`; it has no notion of raw
//! USB interrupt transfers, so the GameCube adapter driver's vendor
//! protocol reuses the same `read`/`write` pair for its interrupt-style
//! traffic.

use std::ffi::CStr;
use std::fs::OpenOptions;
use std::io::{Read, Write};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::io::AsRawFd;

use crate::device::DeviceIo;
use crate::error::{HidError, HidResult};
use crate::hid_parser::ReportKind;
use crate::linux_native::ioctl::{
    self, HidrawReportDescriptor, HID_MAX_DESCRIPTOR_SIZE,
};

pub struct LinuxDevice {
    file: std::fs::File,
    path: String,
}

pub fn open(path: &CStr) -> HidResult<Box<dyn DeviceIo + Send>> {
    let path_str = path.to_string_lossy().into_owned();
    let os_path = std::ffi::OsStr::from_bytes(path.to_bytes());
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(os_path)
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => HidError::ExclusiveAccess {
                path: path_str.clone(),
            },
            _ => HidError::OpenFailed {
                path: path_str.clone(),
                message: e.to_string(),
            },
        })?;
    Ok(Box::new(LinuxDevice {
        file,
        path: path_str,
    }))
}

impl DeviceIo for LinuxDevice {
    fn send_usb_interrupt_transfer(&self, data: &[u8]) -> HidResult<usize> {
        Ok((&self.file).write(data)?)
    }

    fn receive_usb_interrupt_transfer(&self, buf: &mut [u8]) -> HidResult<usize> {
        let n = (&self.file).read(buf)?;
        if n == 0 {
            return Err(HidError::HotUnplug {
                path: self.path.clone(),
            });
        }
        Ok(n)
    }

    fn send_hid_report(&self, kind: ReportKind, data: &[u8]) -> HidResult<()> {
        match kind {
            ReportKind::Output => {
                (&self.file).write(data)?;
            }
            ReportKind::Feature => unsafe {
                ioctl::hidraw_ioc_set_feature(self.file.as_raw_fd(), data)?;
            },
            ReportKind::Input => {
                return Err(HidError::TransferFailure {
                    message: "cannot send an Input report".into(),
                })
            }
        }
        Ok(())
    }

    fn receive_hid_report(&self, kind: ReportKind, report_id: u8, buf: &mut [u8]) -> HidResult<usize> {
        match kind {
            ReportKind::Input => {
                let n = (&self.file).read(buf)?;
                if n == 0 {
                    return Err(HidError::HotUnplug {
                        path: self.path.clone(),
                    });
                }
                Ok(n)
            }
            ReportKind::Feature => {
                // HIDIOCGFEATURE expects the report number in buf[0] on entry.
                if let Some(first) = buf.first_mut() {
                    *first = report_id;
                }
                let n = unsafe { ioctl::hidraw_ioc_get_feature(self.file.as_raw_fd(), buf)? };
                Ok(n as usize)
            }
            ReportKind::Output => Err(HidError::TransferFailure {
                message: "cannot receive an Output report".into(),
            }),
        }
    }

    fn get_report_descriptor(&self) -> HidResult<Vec<u8>> {
        let fd = self.file.as_raw_fd();
        let mut size: libc::c_int = 0;
        unsafe {
            ioctl::hidraw_ioc_grdescsize(fd, &mut size)?;
        }
        let mut desc = HidrawReportDescriptor {
            size: size as u32,
            value: [0u8; HID_MAX_DESCRIPTOR_SIZE],
        };
        unsafe {
            ioctl::hidraw_ioc_grdesc(fd, &mut desc)?;
        }
        Ok(desc.value[..desc.size as usize].to_vec())
    }
}
