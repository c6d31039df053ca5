//! Cross-platform HID input-device discovery, report parsing, and
//! per-device transfer threads.
//!
//! Five pieces, leaves first:
//! - [`hid_parser`] parses a USB HID 1.11 report descriptor into a flat
//!   pool of [`hid_parser::MainItem`]s and decodes inbound reports against it.
//! - [`signature`] is the static, read-only `(name, type hash, VID, PID,
//!   factory)` table dispatched to a concrete [`drivers`] module.
//! - [`token`] and [`device`] are the immutable discovery record and its
//!   optional live driver.
//! - [`transport`] is the per-OS class that opens a device and runs its
//!   worker thread (USB interrupt, HID report, or Bluetooth).
//! - [`finder`] and [`listener`] are the singleton registry of live tokens
//!   and the platform hot-plug watcher that feeds it.

/// Early-return helper used throughout `windows_native`: `ensure!(cond,
/// result)` returns `result` from the enclosing function if `cond` is
/// false. Declared here (ahead of every `mod` item) so it is in scope,
/// unqualified, in every submodule that needs it.
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $result:expr) => {
        if !($cond) {
            return $result;
        }
    };
}

mod device;
mod drivers;
mod error;
mod finder;
mod hid_parser;
mod listener;
mod signature;
mod token;
mod transport;

#[cfg(target_os = "linux")]
mod linux_native;
#[cfg(windows)]
mod windows_native;
#[cfg(windows)]
mod xinput;

pub use device::{CallbackSlot, DeviceBase, DeviceIo};
pub use drivers::dualshock3::Dualshock3Pad;
pub use drivers::gamecube_adapter::GameCubeAdapter;
pub use drivers::generic_pad::GenericPad;
pub use drivers::powera::PowerAPad;
pub use drivers::xinput_pad::XInputPad;
pub use drivers::{PadCallback, PadState};
pub use error::{HidError, HidResult};
pub use finder::{DeviceFinder, FinderDelegate, Tokens};
pub use hid_parser::{usage, usage_page, HidParser, MainItem, ParserStatus, ReportKind};
pub use listener::Event as ListenerEvent;
pub use signature::{type_hash, DeviceSignature, DEVICE_SIGS};
pub use token::{BusType, DeviceKind, DeviceToken};

#[cfg(windows)]
pub use xinput::XInputArbiter;
