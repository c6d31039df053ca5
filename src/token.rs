//! Device token: an immutable discovery record whose platform path is the
//! identity used by the finder and by path-keyed disconnect events.
//! `open_and_get_device()` is idempotent: the first call asks the signature
//! registry to instantiate a [`crate::device::DeviceBase`] and caches a
//! shared reference, which subsequent calls return.

use std::ffi::CString;
use std::sync::{Arc, Mutex};

use crate::device::DeviceBase;
use crate::error::HidResult;
use crate::signature;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    Usb,
    Bluetooth,
    Hid,
    XInput,
}

/// Physical transport a device was discovered on; coarser than
/// [`DeviceKind`] and used only for diagnostics (Windows exposes it
/// directly via `CM_DRP_BUSTYPEGUID`, see `windows_native::types::InternalBusType`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BusType {
    Unknown,
    Usb,
    Bluetooth,
    I2c,
    Spi,
}

/// Movable, not copyable: cloning a token does not duplicate device
/// ownership, it shares the same cached `Base` handle (mirrors the source's
/// path-keyed identity plus a shared live-driver slot).
#[derive(Clone)]
pub struct DeviceToken {
    inner: Arc<TokenInner>,
}

struct TokenInner {
    kind: DeviceKind,
    vendor_id: u16,
    product_id: u16,
    vendor_name: String,
    product_name: String,
    path: CString,
    base: Mutex<Option<Arc<dyn DeviceBase>>>,
}

impl DeviceToken {
    pub fn new(
        kind: DeviceKind,
        vendor_id: u16,
        product_id: u16,
        vendor_name: String,
        product_name: String,
        path: CString,
    ) -> Self {
        Self {
            inner: Arc::new(TokenInner {
                kind,
                vendor_id,
                product_id,
                vendor_name,
                product_name,
                path,
                base: Mutex::new(None),
            }),
        }
    }

    pub fn kind(&self) -> DeviceKind {
        self.inner.kind
    }

    pub fn vendor_id(&self) -> u16 {
        self.inner.vendor_id
    }

    pub fn product_id(&self) -> u16 {
        self.inner.product_id
    }

    pub fn vendor_name(&self) -> &str {
        &self.inner.vendor_name
    }

    pub fn product_name(&self) -> &str {
        &self.inner.product_name
    }

    pub fn path(&self) -> &std::ffi::CStr {
        &self.inner.path
    }

    /// Two tokens are the same device iff their platform paths compare
    /// equal; paths are treated as opaque byte-strings.
    pub fn path_eq(&self, other: &std::ffi::CStr) -> bool {
        self.inner.path.as_c_str() == other
    }

    /// Idempotent: instantiates a `Base` via the signature registry on the
    /// first call and caches it; later calls return the cached handle.
    pub fn open_and_get_device(&self) -> HidResult<Arc<dyn DeviceBase>> {
        let mut slot = self.inner.base.lock().expect("token base lock poisoned");
        if let Some(base) = slot.as_ref() {
            return Ok(base.clone());
        }
        let base = match signature::instantiate(self, signature::DEVICE_SIGS) {
            Some(result) => result?,
            None => {
                return Err(crate::error::HidError::HidApiError {
                    message: "no signature or generic-HID fallback matched this token".into(),
                })
            }
        };
        *slot = Some(base.clone());
        Ok(base)
    }

    /// Requests the device's transport worker thread to stop, if one is
    /// running. This does not itself invoke `device_disconnected` — only
    /// the worker thread does that, once `final_cycle` has actually run
    /// (see `transport::Worker`), so that the ordering guarantee
    /// (`finalCycle` happens-before `deviceDisconnected`) holds. The cached
    /// handle is cleared later, by [`DeviceToken::clear_base`], once the
    /// worker confirms it has wound down.
    pub fn close(&self) {
        if let Some(base) = self.cached_device() {
            base.stop_transport();
        }
    }

    pub fn is_open(&self) -> bool {
        self.inner.base.lock().expect("token base lock poisoned").is_some()
    }

    /// Peeks the cached `Base` without instantiating one.
    pub fn cached_device(&self) -> Option<Arc<dyn DeviceBase>> {
        self.inner.base.lock().expect("token base lock poisoned").clone()
    }

    /// Takes the cached `Base` out of the slot without calling anything on
    /// it. Called once the device's transport worker has actually wound
    /// down (after `final_cycle` and `device_disconnected`), so that
    /// `is_open()` only goes false once the disconnect sequence has truly
    /// completed.
    pub fn clear_base(&self) -> Option<Arc<dyn DeviceBase>> {
        self.inner.base.lock().expect("token base lock poisoned").take()
    }
}

impl std::fmt::Debug for DeviceToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceToken")
            .field("kind", &self.inner.kind)
            .field("vendor_id", &self.inner.vendor_id)
            .field("product_id", &self.inner.product_id)
            .field("path", &self.inner.path)
            .finish()
    }
}
