//! Device signature registry: a process-wide, read-only table of
//! `(name, type hash, vid, pid, factory, kind)` records. A `&'static
//! [DeviceSignature]` slice already carries its own length, so there is no
//! need for a null-terminated sentinel entry.

use std::sync::Arc;

use crate::device::DeviceBase;
use crate::token::{DeviceKind, DeviceToken};

/// A deterministic 64-bit hash of a driver class name, stable across symbol
/// renaming because it is computed from the name string, not from any
/// language-level type identity.
pub const fn type_hash(name: &str) -> u64 {
    // FNV-1a, evaluable in a const context so signatures can be declared as
    // `static` table entries.
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;
    let bytes = name.as_bytes();
    let mut hash = FNV_OFFSET;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
        i += 1;
    }
    hash
}

pub type Factory = fn(DeviceToken) -> crate::error::HidResult<Arc<dyn DeviceBase>>;

#[derive(Clone, Copy)]
pub struct DeviceSignature {
    pub name: &'static str,
    pub type_hash: u64,
    pub vid: u16,
    pub pid: u16,
    pub kind: DeviceKind,
    pub factory: Factory,
}

impl DeviceSignature {
    /// `DeviceMatchToken(t, interest)`: true if `t.kind == Hid` or some
    /// signature in `interest` has `(vid, pid) == (t.vid, t.pid)`.
    pub fn token_matches(token: &DeviceToken, interest: &[DeviceSignature]) -> bool {
        if token.kind() == DeviceKind::Hid {
            return true;
        }
        interest
            .iter()
            .any(|sig| sig.vid == token.vendor_id() && sig.pid == token.product_id())
    }
}

/// Returns the generic-pad driver when the token is a generic HID device not
/// matched by any specific signature, else finds the first signature with
/// `(vid, pid) == (token.vid, token.pid)` and calls its factory.
pub fn instantiate(
    token: &DeviceToken,
    table: &[DeviceSignature],
) -> Option<crate::error::HidResult<Arc<dyn DeviceBase>>> {
    let specific = table
        .iter()
        .find(|sig| sig.vid == token.vendor_id() && sig.pid == token.product_id());

    match specific {
        Some(sig) => Some((sig.factory)(token.clone())),
        None if token.kind() == DeviceKind::Hid => {
            Some(crate::drivers::generic_pad::make(token.clone()))
        }
        None => None,
    }
}

/// The process-global, read-only signature table (replaces the linked,
/// sentinel-terminated C array with a `&'static` slice).
pub static DEVICE_SIGS: &[DeviceSignature] = &[
    DeviceSignature {
        name: "GameCubeAdapter",
        type_hash: type_hash("GameCubeAdapter"),
        vid: 0x057E,
        pid: 0x0337,
        kind: DeviceKind::Usb,
        factory: crate::drivers::gamecube_adapter::make,
    },
    DeviceSignature {
        name: "DualshockPad",
        type_hash: type_hash("DualshockPad"),
        vid: 0x054C,
        pid: 0x0268,
        kind: DeviceKind::Usb,
        factory: crate::drivers::dualshock3::make,
    },
    DeviceSignature {
        name: "NintendoPowerA",
        type_hash: type_hash("NintendoPowerA"),
        vid: 0x20D6,
        pid: 0xA711,
        kind: DeviceKind::Usb,
        factory: crate::drivers::powera::make,
    },
    // Matched against the synthetic tokens the Windows-only XInput arbiter
    // (`crate::xinput`) creates for each of the four controller slots; the
    // vid/pid pair is XInput's own (Xbox 360 Controller for Windows), not
    // read from any device descriptor.
    DeviceSignature {
        name: "XInputPad",
        type_hash: type_hash("XInputPad"),
        vid: 0x045E,
        pid: 0x028E,
        kind: DeviceKind::XInput,
        factory: crate::drivers::xinput_pad::make,
    },
];

#[cfg(test)]
mod test {
    use super::*;
    use std::ffi::CString;

    fn usb_token(vid: u16, pid: u16) -> DeviceToken {
        DeviceToken::new(
            DeviceKind::Usb,
            vid,
            pid,
            "Vendor".into(),
            "Product".into(),
            CString::new("/sys/fake/path").unwrap(),
        )
    }

    #[test]
    fn signature_matching_property() {
        let interest = &DEVICE_SIGS[..1]; // only GameCubeAdapter
        assert!(DeviceSignature::token_matches(
            &usb_token(0x057E, 0x0337),
            interest
        ));
        assert!(!DeviceSignature::token_matches(
            &usb_token(0x1234, 0x5678),
            interest
        ));
    }

    #[test]
    fn generic_hid_token_always_matches() {
        let hid_token = DeviceToken::new(
            DeviceKind::Hid,
            0x1234,
            0x5678,
            "Vendor".into(),
            "Product".into(),
            CString::new("/sys/fake/hid").unwrap(),
        );
        assert!(DeviceSignature::token_matches(&hid_token, &[]));
    }

    #[test]
    fn type_hash_is_stable_and_distinct() {
        assert_eq!(type_hash("GameCubeAdapter"), type_hash("GameCubeAdapter"));
        assert_ne!(type_hash("GameCubeAdapter"), type_hash("DualshockPad"));
    }
}
