// **************************************************************************
// Copyright (c) 2018 Roland Ruckerbauer All Rights Reserved.
//
// This file is part of hidapi-rs, based on hidapi-rs by Osspial
// **************************************************************************

use std::error::Error;
use std::fmt::{Display, Formatter, Result};

use crate::token::DeviceKind;

/// Errors surfaced by fallible operations in this crate.
///
/// Values of this type never cross an OS thread boundary: a worker thread
/// logs an error and either continues (a non-fatal per-cycle condition) or
/// exits, and the listener/finder surface connection loss to the client as
/// a `deviceDisconnected` callback, not as a `Result`. Fatal conditions
/// (duplicate finder construction) abort the process instead of producing
/// a value of this type.
#[derive(Debug)]
pub enum HidError {
    HidApiError {
        message: String,
    },
    HidApiErrorEmpty,
    InitializationError,
    InvalidZeroSizeData,
    IncompleteSendError {
        sent: usize,
        all: usize,
    },
    SetBlockingModeError {
        mode: &'static str,
    },
    /// The transport could not acquire the device at all.
    OpenFailed {
        path: String,
        message: String,
    },
    /// Another process already holds the device exclusively.
    ExclusiveAccess {
        path: String,
    },
    /// The HID report descriptor never reached `ParserStatus::Done`.
    DescriptorParseError {
        reason: &'static str,
    },
    /// A non-timeout transfer failure on a single cycle; the worker loop
    /// continues, it does not exit.
    TransferFailure {
        message: String,
    },
    /// Hot-unplug was detected mid-transfer.
    HotUnplug {
        path: String,
    },
    /// A signature's device kind did not match the token it was asked to
    /// instantiate against.
    KindMismatch {
        expected: DeviceKind,
        found: DeviceKind,
    },
    /// An IO error or a system error that can be represented as such.
    IoError {
        error: std::io::Error,
    },
}

impl Display for HidError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            HidError::HidApiError { message } => write!(f, "hidapi error: {}", message),
            HidError::HidApiErrorEmpty => write!(f, "hidapi error: (could not get error message)"),
            HidError::InitializationError => write!(f, "Failed to initialize hidapi"),
            HidError::InvalidZeroSizeData => write!(f, "Invalid data: size can not be 0"),
            HidError::IncompleteSendError { sent, all } => write!(
                f,
                "Failed to send all data: only sent {} out of {} bytes",
                sent, all
            ),
            HidError::SetBlockingModeError { mode } => {
                write!(f, "Can not set blocking mode to '{}'", mode)
            }
            HidError::OpenFailed { path, message } => {
                write!(f, "failed to open device {path}: {message}")
            }
            HidError::ExclusiveAccess { path } => {
                write!(f, "device {path} is exclusively held by another process")
            }
            HidError::DescriptorParseError { reason } => {
                write!(f, "HID report descriptor did not parse: {reason}")
            }
            HidError::TransferFailure { message } => write!(f, "transfer failed: {message}"),
            HidError::HotUnplug { path } => write!(f, "device {path} was unplugged"),
            HidError::KindMismatch { expected, found } => write!(
                f,
                "signature expects a {expected:?} token but got a {found:?} token"
            ),
            HidError::IoError { error } => write!(f, "{error}"),
        }
    }
}

impl Error for HidError {}

impl From<std::io::Error> for HidError {
    fn from(e: std::io::Error) -> Self {
        Self::IoError { error: e }
    }
}

#[cfg(target_os = "linux")]
impl From<nix::errno::Errno> for HidError {
    fn from(e: nix::errno::Errno) -> Self {
        Self::IoError { error: e.into() }
    }
}

pub type HidResult<T> = std::result::Result<T, HidError>;
