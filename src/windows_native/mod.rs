//! Windows backend internals: SetupAPI/CfgMgr32 device enumeration, the
//! Win32 HID API, and a from-scratch report-descriptor reconstruction from
//! `PHIDP_PREPARSED_DATA` (see [`descriptor`]).

pub mod descriptor;
pub mod dev_node;
pub mod error;
pub mod hid;
pub mod interfaces;
pub mod string;
pub mod types;
pub mod utils;
