//! Error types for ratbag-core.

use thiserror::Error;

/// Core library error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed factory input or setter argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Index past a fixed count (profiles, resolutions, buttons).
    #[error("{what} index {index} out of range (count {count})")]
    OutOfRange {
        what: &'static str,
        index: u32,
        count: u32,
    },

    /// Value outside a driver's safe bounds; rejected before any I/O.
    #[error("value out of range: {field} = {value} (allowed {min}..={max})")]
    ValueOutOfRange {
        field: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },

    /// No backend recognizes the hardware, or a capability is missing.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// The operation would violate a model invariant.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// OS-level I/O failure (open, read, write on the device node).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HID device communication failure.
    #[error("HID error: {0}")]
    Hid(String),

    /// HID++ protocol error (device returned error code).
    #[error("HID++ error: feature 0x{feature:04X}, code {code}")]
    HidppProtocol { feature: u16, code: u8 },

    /// Device not found on the bus or receiver.
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    /// Permission denied opening or talking to the device.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Operation timed out.
    #[error("timeout: {0}")]
    Timeout(String),
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// The coarse error taxonomy callers dispatch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    OutOfRange,
    Unsupported,
    InvalidState,
    /// I/O or protocol failure from the bound driver; possibly transient.
    Backend,
}

/// Classification of backend failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Transient errors that may succeed on retry (timeout, busy).
    Transient,
    /// Device is gone; retrying will not help.
    Disconnected,
    /// Permission denied on the device node.
    PermissionDenied,
    /// Device returned an error code.
    Protocol,
    /// Corrupted or unexpected data.
    InvalidResponse,
    /// Not a backend failure: a usage error on the caller's side.
    Usage,
}

/// HID++ 1.0 error code the receiver returns while it is busy.
const HIDPP_ERR_BUSY: u8 = 0x07;

impl Error {
    pub(crate) fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    pub(crate) fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub(crate) fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Map this error onto the five-way taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) | Self::ValueOutOfRange { .. } => ErrorKind::InvalidArgument,
            Self::OutOfRange { .. } => ErrorKind::OutOfRange,
            Self::Unsupported(_) => ErrorKind::Unsupported,
            Self::InvalidState(_) => ErrorKind::InvalidState,
            Self::Io(_)
            | Self::Hid(_)
            | Self::HidppProtocol { .. }
            | Self::DeviceNotFound(_)
            | Self::PermissionDenied(_)
            | Self::Timeout(_) => ErrorKind::Backend,
        }
    }

    /// The underlying OS error code, when the failure came from the OS.
    pub fn os_error(&self) -> Option<i32> {
        match self {
            Self::Io(e) => e.raw_os_error(),
            _ => None,
        }
    }

    /// Classify an error for retry decisions.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Timeout(_) => ErrorClass::Transient,
            Self::PermissionDenied(_) => ErrorClass::PermissionDenied,
            Self::DeviceNotFound(_) => ErrorClass::Disconnected,
            Self::HidppProtocol { code, .. } if *code == HIDPP_ERR_BUSY => ErrorClass::Transient,
            Self::HidppProtocol { .. } => ErrorClass::Protocol,
            Self::Io(e) => match e.kind() {
                std::io::ErrorKind::NotFound => ErrorClass::Disconnected,
                std::io::ErrorKind::PermissionDenied => ErrorClass::PermissionDenied,
                std::io::ErrorKind::TimedOut
                | std::io::ErrorKind::WouldBlock
                | std::io::ErrorKind::Interrupted => ErrorClass::Transient,
                _ => ErrorClass::InvalidResponse,
            },
            Self::Hid(msg) => {
                let lower = msg.to_lowercase();
                if lower.contains("disconnect")
                    || lower.contains("not found")
                    || lower.contains("no such device")
                {
                    ErrorClass::Disconnected
                } else if lower.contains("permission")
                    || lower.contains("access denied")
                    || lower.contains("access is denied")
                {
                    ErrorClass::PermissionDenied
                } else if lower.contains("timeout") || lower.contains("timed out") {
                    ErrorClass::Transient
                } else {
                    ErrorClass::InvalidResponse
                }
            }
            Self::InvalidArgument(_)
            | Self::OutOfRange { .. }
            | Self::ValueOutOfRange { .. }
            | Self::Unsupported(_)
            | Self::InvalidState(_) => ErrorClass::Usage,
        }
    }

    /// Whether the caller may reasonably retry the failed operation.
    pub fn is_transient(&self) -> bool {
        self.class() == ErrorClass::Transient
    }
}
