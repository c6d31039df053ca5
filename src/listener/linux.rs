//! Linux hot-plug listener: udev enumeration + monitor on the `hidraw`
//! subsystem.
//!
//! Enumerates once up front, then blocks on `nix::poll::poll` with a
//! bounded timeout and drains `monitor.iter()` each time the fd goes
//! readable, walking up to the parent `hid` device and parsing its
//! `HID_ID` property into `(bustype, vid, pid)`. A library has no business
//! claiming a process-wide signal for shutdown, so this polls with a
//! 200ms timeout against an `AtomicBool` stop flag instead of blocking
//! indefinitely.

use std::ffi::{CString, OsStr};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::io::{AsRawFd, BorrowedFd};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::hid_parser::{usage, usage_page, HidParser, ParserStatus};
use crate::linux_native::ioctl::{self, HidrawReportDescriptor, HID_MAX_DESCRIPTOR_SIZE};
use crate::token::{DeviceKind, DeviceToken};

use super::Event;

const BUS_USB: u16 = 0x03;
const BUS_BLUETOOTH: u16 = 0x05;

pub fn enumerate() -> Vec<DeviceToken> {
    let mut out = Vec::new();
    let mut enumerator = match udev::Enumerator::new() {
        Ok(e) => e,
        Err(_) => return out,
    };
    if enumerator.match_subsystem("hidraw").is_err() {
        return out;
    }
    let devices = match enumerator.scan_devices() {
        Ok(d) => d,
        Err(_) => return out,
    };
    for device in devices {
        if let Some(token) = token_from_hidraw(&device) {
            out.push(token);
        }
    }
    out
}

pub fn watch(on_event: impl Fn(Event) + Send + 'static, stop: Arc<AtomicBool>) {
    let monitor = udev::MonitorBuilder::new()
        .and_then(|b| b.match_subsystem("hidraw"))
        .and_then(|b| b.listen());
    let monitor = match monitor {
        Ok(m) => m,
        Err(e) => {
            tracing::error!(target: "hidinputdev::listener", "udev monitor setup failed: {e}");
            return;
        }
    };
    let fd = monitor.as_raw_fd();

    while !stop.load(Ordering::Acquire) {
        let mut pollfd = [nix::poll::PollFd::new(
            unsafe { BorrowedFd::borrow_raw(fd) },
            nix::poll::PollFlags::POLLIN,
        )];
        match nix::poll::poll(&mut pollfd, nix::poll::PollTimeout::from(200u16)) {
            Ok(0) => continue,
            Ok(_) => {}
            Err(nix::errno::Errno::EINTR) => continue,
            Err(e) => {
                tracing::error!(target: "hidinputdev::listener", "poll failed: {e}");
                return;
            }
        }

        for event in monitor.iter() {
            match event.event_type() {
                udev::EventType::Add => {
                    if let Some(token) = token_from_hidraw(&event.device()) {
                        on_event(Event::Inserted(token));
                    }
                }
                udev::EventType::Remove => {
                    if let Some(path) = devnode_path(&event.device()) {
                        on_event(Event::Removed(path));
                    }
                }
                _ => {}
            }
        }
    }
}

fn devnode_path(device: &udev::Device) -> Option<CString> {
    let devnode = device.devnode()?;
    CString::new(devnode.as_os_str().as_bytes()).ok()
}

fn token_from_hidraw(device: &udev::Device) -> Option<DeviceToken> {
    let path = devnode_path(device)?;
    let hid_parent = device.parent_with_subsystem("hid").ok().flatten()?;
    let (bus, vid, pid) = hid_parent
        .property_value("HID_ID")
        .and_then(|s| s.to_str())
        .and_then(parse_hid_id)?;

    if !application_usage_is_pad(&path) {
        return None;
    }

    let product_name = hid_parent
        .property_value("HID_NAME")
        .map(|v| v.to_string_lossy().into_owned())
        .unwrap_or_default();
    // hidraw exposes no separate manufacturer string; HID_PHYS is the
    // closest stand-in udev provides (`usb-0000:00:14.0-1/input0`-style).
    let vendor_name = hid_parent
        .property_value("HID_PHYS")
        .map(|v| v.to_string_lossy().into_owned())
        .unwrap_or_default();

    Some(DeviceToken::new(
        kind_for_bus(bus),
        vid,
        pid,
        vendor_name,
        product_name,
        path,
    ))
}

fn kind_for_bus(bus: u16) -> DeviceKind {
    match bus {
        BUS_USB => DeviceKind::Usb,
        BUS_BLUETOOTH => DeviceKind::Bluetooth,
        _ => DeviceKind::Hid,
    }
}

fn parse_hid_id(s: &str) -> Option<(u16, u16, u16)> {
    let mut parts = s.split(':');
    let bus = u16::from_str_radix(parts.next()?, 16).ok()?;
    let vid = u16::from_str_radix(parts.next()?, 16).ok()?;
    let pid = u16::from_str_radix(parts.next()?, 16).ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((bus, vid, pid))
}

/// Rejects anything whose top-level application collection isn't
/// Generic-Desktop Joystick/GamePad, so the finder's interest set never
/// has to see keyboards and mice. A descriptor that fails to open or parse
/// is treated as a rejection rather than propagated, since enumeration
/// must never abort on one bad device.
fn application_usage_is_pad(path: &CString) -> bool {
    let file = match std::fs::OpenOptions::new()
        .read(true)
        .open(OsStr::from_bytes(path.to_bytes()))
    {
        Ok(f) => f,
        Err(_) => return false,
    };
    let fd = file.as_raw_fd();

    let mut size: libc::c_int = 0;
    if unsafe { ioctl::hidraw_ioc_grdescsize(fd, &mut size) }.is_err() {
        return false;
    }
    let mut desc = HidrawReportDescriptor {
        size: size as u32,
        value: [0u8; HID_MAX_DESCRIPTOR_SIZE],
    };
    if unsafe { ioctl::hidraw_ioc_grdesc(fd, &mut desc) }.is_err() {
        return false;
    }

    let mut parser = HidParser::new();
    if parser.parse(&desc.value[..desc.size as usize]) != ParserStatus::Done {
        return false;
    }
    matches!(
        parser.application_usage(),
        Some((usage_page::GENERIC_DESKTOP, u)) if u == usage::JOYSTICK || u == usage::GAME_PAD
    )
}
