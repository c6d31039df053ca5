//! macOS hot-plug listener: IOKit's `IOHIDManager`.
//!
//! [`crate::transport::macos`] routes every device through `IOHIDDevice`'s
//! report API rather than binding the raw `IOUSBInterfaceInterface` pipe,
//! so this listener follows suit and enumerates everything through a
//! single `IOHIDManager` instead of separate USB and HID matchers; a
//! device's `kIOHIDTransportKey` ("USB", "Bluetooth", anything else) tells
//! apart a vendor-class device like the GameCube adapter (unfiltered) from
//! everything else (filtered to Generic-Desktop Joystick/GamePad usage).
//!
//! IOKit normally wakes a notification port scheduled on the `CFRunLoop`,
//! but a library has no claim on the host's main run loop, so — matching
//! the polling approach in [`super::linux`] (pselect → bounded poll) and
//! [`super::windows`] (`WM_DEVICECHANGE` → bounded poll) — this watches by
//! diffing successive `IOHIDManagerCopyDevices` snapshots on a dedicated
//! thread.

use std::collections::HashSet;
use std::ffi::{CStr, CString};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use core_foundation::base::TCFType;
use core_foundation::set::{CFSet, CFSetGetValues};
use core_foundation::string::CFString;
use io_kit_sys::hid::base::IOHIDDeviceRef;
use io_kit_sys::hid::device::{IOHIDDeviceGetProperty, IOHIDDeviceGetService};
use io_kit_sys::hid::keys::{
    kIOHIDManufacturerKey, kIOHIDPrimaryUsageKey, kIOHIDPrimaryUsagePageKey, kIOHIDProductIDKey,
    kIOHIDProductKey, kIOHIDTransportKey, kIOHIDVendorIDKey,
};
use io_kit_sys::hid::manager::{
    kIOHIDManagerOptionNone, IOHIDManagerClose, IOHIDManagerCopyDevices, IOHIDManagerCreate,
    IOHIDManagerRef, IOHIDManagerSetDeviceMatching,
};
use io_kit_sys::types::{io_registry_entry_t, IORegistryEntryGetPath};
use io_kit_sys::{kIOMasterPortDefault, kIOServicePlane};

use crate::hid_parser::{usage, usage_page};
use crate::token::{DeviceKind, DeviceToken};

use super::Event;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// `io_string_t` in `IOKitLib.h` is a fixed `char[512]` buffer; `path_of`
/// below relies on this bound.
const IO_PATH_BUFFER_LEN: usize = 512;

struct HidManager(IOHIDManagerRef);

unsafe impl Send for HidManager {}

impl HidManager {
    fn open() -> Option<Self> {
        let manager = unsafe { IOHIDManagerCreate(std::ptr::null(), kIOHIDManagerOptionNone) };
        if manager.is_null() {
            return None;
        }
        unsafe { IOHIDManagerSetDeviceMatching(manager, std::ptr::null()) };
        Some(Self(manager))
    }

    fn copy_devices(&self) -> Vec<IOHIDDeviceRef> {
        let set = unsafe { IOHIDManagerCopyDevices(self.0) };
        if set.is_null() {
            return Vec::new();
        }
        let set: CFSet<IOHIDDeviceRef> = unsafe { CFSet::wrap_under_create_rule(set) };
        let count = set.len();
        let mut refs: Vec<IOHIDDeviceRef> = Vec::with_capacity(count);
        unsafe {
            CFSetGetValues(set.as_concrete_TypeRef(), refs.as_mut_ptr() as *mut _);
            refs.set_len(count);
        }
        refs
    }
}

impl Drop for HidManager {
    fn drop(&mut self) {
        unsafe {
            IOHIDManagerClose(self.0, kIOHIDManagerOptionNone);
        }
    }
}

pub fn enumerate() -> Vec<DeviceToken> {
    let Some(manager) = HidManager::open() else {
        return Vec::new();
    };
    manager.copy_devices().into_iter().filter_map(token_from_device).collect()
}

pub fn watch(on_event: impl Fn(Event) + Send + 'static, stop: Arc<AtomicBool>) {
    let Some(manager) = HidManager::open() else {
        tracing::error!(target: "hidinputdev::listener", "IOHIDManagerCreate failed");
        return;
    };

    let mut seen: HashSet<CString> = HashSet::new();
    for token in manager.copy_devices().into_iter().filter_map(token_from_device) {
        seen.insert(token.path().to_owned());
        on_event(Event::Inserted(token));
    }

    while !stop.load(Ordering::Acquire) {
        thread::sleep(POLL_INTERVAL);
        if stop.load(Ordering::Acquire) {
            break;
        }

        let current: Vec<DeviceToken> =
            manager.copy_devices().into_iter().filter_map(token_from_device).collect();
        let current_paths: HashSet<CString> = current.iter().map(|t| t.path().to_owned()).collect();

        for removed in seen.difference(&current_paths) {
            on_event(Event::Removed(removed.clone()));
        }
        for token in &current {
            if !seen.contains(token.path()) {
                on_event(Event::Inserted(token.clone()));
            }
        }
        seen = current_paths;
    }
}

fn path_of(device: IOHIDDeviceRef) -> Option<CString> {
    let service: io_registry_entry_t = unsafe { IOHIDDeviceGetService(device) };
    if service == 0 {
        return None;
    }
    let mut buf = [0u8; IO_PATH_BUFFER_LEN];
    let ok = unsafe {
        IORegistryEntryGetPath(service, kIOServicePlane, buf.as_mut_ptr() as *mut i8) == 0
    };
    if !ok {
        return None;
    }
    let cstr = unsafe { CStr::from_ptr(buf.as_ptr() as *const i8) };
    Some(cstr.to_owned())
}

fn string_property(device: IOHIDDeviceRef, key: &str) -> Option<String> {
    let key = CFString::new(key);
    let value = unsafe { IOHIDDeviceGetProperty(device, key.as_concrete_TypeRef()) };
    if value.is_null() {
        return None;
    }
    let value = unsafe { CFString::wrap_under_get_rule(value as _) };
    Some(value.to_string())
}

fn int_property(device: IOHIDDeviceRef, key: &str) -> Option<i32> {
    let key = CFString::new(key);
    let value = unsafe { IOHIDDeviceGetProperty(device, key.as_concrete_TypeRef()) };
    if value.is_null() {
        return None;
    }
    let value = unsafe { core_foundation::number::CFNumber::wrap_under_get_rule(value as _) };
    value.to_i32()
}

/// Anything that doesn't self-report a USB transport is subject to the
/// Joystick/GamePad usage filter (see the module doc).
fn kind_of(device: IOHIDDeviceRef) -> DeviceKind {
    match string_property(device, kIOHIDTransportKey).as_deref() {
        Some("USB") => DeviceKind::Usb,
        Some("Bluetooth") | Some("BluetoothLowEnergy") => DeviceKind::Bluetooth,
        _ => DeviceKind::Hid,
    }
}

fn token_from_device(device: IOHIDDeviceRef) -> Option<DeviceToken> {
    let path = path_of(device)?;
    let kind = kind_of(device);

    if kind == DeviceKind::Hid {
        let usage_page_v = int_property(device, kIOHIDPrimaryUsagePageKey)? as u16;
        let usage_v = int_property(device, kIOHIDPrimaryUsageKey)? as u16;
        if usage_page_v != usage_page::GENERIC_DESKTOP
            || (usage_v != usage::JOYSTICK && usage_v != usage::GAME_PAD)
        {
            return None;
        }
    }

    let vendor_id = int_property(device, kIOHIDVendorIDKey)? as u16;
    let product_id = int_property(device, kIOHIDProductIDKey)? as u16;
    let vendor_name = string_property(device, kIOHIDManufacturerKey).unwrap_or_default();
    let product_name = string_property(device, kIOHIDProductKey).unwrap_or_default();

    Some(DeviceToken::new(kind, vendor_id, product_id, vendor_name, product_name, path))
}
