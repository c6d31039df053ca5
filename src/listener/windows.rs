//! Windows hot-plug listener: enumerates HID device-interface paths
//! through Config Manager and diffs successive snapshots to synthesize
//! insert/remove events, then hands the result to a client callback
//! exactly like [`super::linux`]/[`super::macos`] do.
//!
//! VID/PID-and-usage filtering goes through `HidD_GetAttributes` +
//! `HidP_GetCaps` on a preparsed-data blob; enumeration itself uses
//! [`crate::windows_native::interfaces::Interface`]
//! (`CM_Get_Device_Interface_List`, the same Config Manager API used to
//! reconstruct a device's report descriptor). Owning a message-only window
//! and a `GetMessageW` pump to receive `WM_DEVICECHANGE` is substantial
//! extra surface for a library with no application main loop of its own to
//! hook into, so this polls the same interface list on a fixed interval
//! and diffs by path instead. The XInput arbiter runs independently, as
//! its own thread, started alongside this one.

use std::collections::HashSet;
use std::ffi::CString;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use windows_sys::Win32::Foundation::{GENERIC_READ, INVALID_HANDLE_VALUE};
use windows_sys::Win32::Storage::FileSystem::{
    CreateFileW, FILE_SHARE_READ, FILE_SHARE_WRITE, OPEN_EXISTING,
};

use crate::hid_parser::{usage, usage_page};
use crate::token::{DeviceKind, DeviceToken};
use crate::windows_native::hid::{get_hid_attributes, PreparsedData};
use crate::windows_native::interfaces::Interface;
use crate::windows_native::string::U16String;
use crate::windows_native::types::Handle;
use crate::xinput::XInputArbiter;

use super::Event;

const POLL_INTERVAL: Duration = Duration::from_millis(500);

pub fn enumerate() -> Vec<DeviceToken> {
    let Ok(list) = Interface::get_interface_list() else {
        return Vec::new();
    };
    list.iter().filter_map(token_from_interface).collect()
}

pub fn watch(on_event: impl Fn(Event) + Send + Sync + 'static, stop: Arc<AtomicBool>) {
    let on_event = Arc::new(on_event);
    let arbiter = XInputArbiter::start({
        let on_event = on_event.clone();
        move |event| (*on_event)(event)
    });

    let mut seen: HashSet<CString> = HashSet::new();
    for token in enumerate() {
        seen.insert(token.path().to_owned());
        (*on_event)(Event::Inserted(token));
    }

    while !stop.load(Ordering::Acquire) {
        thread::sleep(POLL_INTERVAL);
        if stop.load(Ordering::Acquire) {
            break;
        }

        let current = enumerate();
        let current_paths: HashSet<CString> = current.iter().map(|t| t.path().to_owned()).collect();

        for removed_path in seen.difference(&current_paths) {
            (*on_event)(Event::Removed(removed_path.clone()));
        }
        for token in &current {
            if !seen.contains(token.path()) {
                (*on_event)(Event::Inserted(token.clone()));
            }
        }
        seen = current_paths;
    }

    arbiter.stop();
}

fn token_from_interface(path: &crate::windows_native::string::U16Str) -> Option<DeviceToken> {
    let path_str = path.to_string_lossy();
    let wide = U16String::try_from(CString::new(path_str.clone()).ok()?.as_c_str()).ok()?;

    let raw = unsafe {
        CreateFileW(
            wide.as_ptr(),
            GENERIC_READ,
            FILE_SHARE_READ | FILE_SHARE_WRITE,
            std::ptr::null(),
            OPEN_EXISTING,
            0,
            0,
        )
    };
    if raw == INVALID_HANDLE_VALUE {
        return None;
    }
    let handle = Handle::from_raw(raw);

    let attrib = get_hid_attributes(&handle);
    let pp_data = PreparsedData::load(&handle).ok()?;
    let caps = pp_data.get_caps().ok()?;

    if caps.UsagePage != usage_page::GENERIC_DESKTOP
        || (caps.Usage != usage::JOYSTICK && caps.Usage != usage::GAME_PAD)
    {
        return None;
    }

    // GUID_DEVINTERFACE_HID spans every bus HID rides on (USB, Bluetooth,
    // I2C); `kind: Hid` rather than guessing `Usb` also means this token
    // always passes `DeviceSignature::token_matches` regardless of a
    // finder's interest set, matching every other platform's generic-HID
    // tokens.
    Some(DeviceToken::new(
        DeviceKind::Hid,
        attrib.VendorID,
        attrib.ProductID,
        String::new(),
        String::new(),
        CString::new(path_str).ok()?,
    ))
}
