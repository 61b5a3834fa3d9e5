//! ratbag-core: a device model for configurable gaming mice.
//!
//! A [`Context`] binds hardware to a backend driver and hands out a
//! [`Device`]; from there the device's profiles, their resolution modes and
//! their buttons are reachable as reference-counted handles. Edits to the
//! active profile are written through to the hardware. Edits to any other
//! profile are buffered and committed by [`Profile::set_active`].
//!
//! Logitech mice are driven over HID++ 2.0 ([`hidpp20`]) or HID++ 1.0
//! ([`hidpp10`]).

pub mod action;
pub mod button;
pub mod context;
pub mod device;
pub mod driver;
pub mod drivers;
pub mod error;
pub mod handle;
pub mod hidpp;
pub mod hidpp10;
pub mod hidpp20;
pub mod io;
pub mod log;
pub mod profile;
pub mod resolution;
#[cfg(test)]
mod testing;
pub mod transport;

pub use action::{Action, ActionType, MacroData, SpecialAction, MAX_MODIFIERS};
pub use button::{Button, ButtonType};
pub use context::{Context, Interface, OpenMode};
pub use device::{ButtonSummary, Device, DeviceSummary, ProfileSummary, ResolutionSummary};
pub use driver::{Capabilities, Capability, DeviceToken, InputId, MAX_RESOLUTIONS};
pub use error::{Error, ErrorClass, ErrorKind, Result};
pub use handle::{Refcounted, UserData};
pub use log::{LogHandler, LogPriority};
pub use profile::Profile;
pub use resolution::Resolution;
pub use transport::HidTransport;

/// Logitech USB Vendor ID.
pub const LOGITECH_VID: u16 = 0x046D;

/// Known Logitech product IDs.
pub mod pids {
    /// G502 Lightspeed (wireless receiver mode).
    pub const G502_LIGHTSPEED: u16 = 0xC08D;
    /// G502 HERO (wired).
    pub const G502_HERO: u16 = 0xC08B;
    /// G502 Proteus Spectrum (wired).
    pub const G502_PROTEUS_SPECTRUM: u16 = 0xC332;
    /// M570 trackball, paired to a Unifying receiver.
    pub const M570: u16 = 0x1028;
    /// G500s (wired).
    pub const G500S: u16 = 0xC24E;
}
