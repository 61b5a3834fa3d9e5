//! Backend contract: how vendor drivers recognize, bind and program devices.
//!
//! A [`Backend`] is a registry entry. It matches input identifiers against its
//! id table and, when asked to probe, either declines or returns a
//! [`BoundDevice`] carrying the [`Driver`] that serves the device from then on.

use crate::action::{Action, ActionType};
use crate::button::ButtonType;
use crate::error::Result;
use crate::io::DeviceIo;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Upper bound on resolution modes per profile.
pub const MAX_RESOLUTIONS: u32 = 10;

/// Bus types as reported by the kernel input layer.
pub mod bus {
    pub const USB: u16 = 0x03;
    pub const BLUETOOTH: u16 = 0x05;
}

/// Input identifiers of a physical device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputId {
    pub bustype: u16,
    pub vendor: u16,
    pub product: u16,
    pub version: u16,
}

impl fmt::Display for InputId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04x}:{:04x}:{:04x}:{:04x}",
            self.bustype, self.vendor, self.product, self.version
        )
    }
}

/// One id table entry. `None` fields match anything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceMatch {
    pub bustype: Option<u16>,
    pub vendor: Option<u16>,
    pub product: Option<u16>,
    pub version: Option<u16>,
}

impl DeviceMatch {
    /// Match a USB device by vendor and product, any version.
    pub const fn usb(vendor: u16, product: u16) -> Self {
        Self {
            bustype: Some(bus::USB),
            vendor: Some(vendor),
            product: Some(product),
            version: None,
        }
    }

    pub fn matches(&self, id: &InputId) -> bool {
        fn field(want: Option<u16>, have: u16) -> bool {
            want.is_none() || want == Some(have)
        }
        field(self.bustype, id.bustype)
            && field(self.vendor, id.vendor)
            && field(self.product, id.product)
            && field(self.version, id.version)
    }
}

/// What the caller hands to [`Context::create_device`](crate::Context::create_device).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceToken {
    /// Human-readable product name.
    pub name: String,
    /// Device node path passed to the context's open operation.
    pub devnode: String,
    pub id: InputId,
}

/// Optional device features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    SwitchableResolution,
    SwitchableProfile,
    ButtonKey,
    ButtonMacros,
}

impl Capability {
    pub const ALL: &'static [Capability] = &[
        Capability::SwitchableResolution,
        Capability::SwitchableProfile,
        Capability::ButtonKey,
        Capability::ButtonMacros,
    ];

    /// Short label as printed by `ratbag-command info`.
    pub fn label(&self) -> &'static str {
        match self {
            Self::SwitchableResolution => "res",
            Self::SwitchableProfile => "profile",
            Self::ButtonKey => "btn-key",
            Self::ButtonMacros => "btn-macros",
        }
    }

    fn bit(self) -> u32 {
        1 << self as u32
    }
}

/// A set of [`Capability`] values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Capabilities(u32);

impl Capabilities {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn with(self, cap: Capability) -> Self {
        Self(self.0 | cap.bit())
    }

    pub fn without(self, cap: Capability) -> Self {
        Self(self.0 & !cap.bit())
    }

    pub fn contains(&self, cap: Capability) -> bool {
        self.0 & cap.bit() != 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        Capability::ALL.iter().copied().filter(|c| self.contains(*c))
    }
}

impl FromIterator<Capability> for Capabilities {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), Self::with)
    }
}

/// One (dpi, report rate) mode. Zero in either field means disabled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionMode {
    pub dpi: u32,
    pub report_rate: u32,
}

/// A button as the driver reports it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ButtonData {
    pub button_type: ButtonType,
    pub action: Action,
}

/// Profile contents exchanged with a driver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileData {
    /// Resolution slots; missing trailing slots read as disabled.
    pub resolutions: Vec<ResolutionMode>,
    /// Slot count; 0 means one slot.
    pub num_resolutions: u32,
    pub active_resolution: Option<u32>,
    pub default_resolution: Option<u32>,
    pub buttons: Vec<ButtonData>,
}

impl ProfileData {
    /// Bring driver-reported contents into a consistent shape.
    ///
    /// Clamps the slot count to `1..=MAX_RESOLUTIONS`, pads resolutions and
    /// buttons with disabled entries and drops out-of-range active/default
    /// markers. Returns true if anything had to change besides padding.
    pub(crate) fn normalize(&mut self, num_buttons: u32) -> bool {
        let requested = self.num_resolutions.max(1);
        let mut fixed = requested > MAX_RESOLUTIONS;
        self.num_resolutions = requested.min(MAX_RESOLUTIONS);
        if self.resolutions.len() > self.num_resolutions as usize {
            fixed = true;
        }
        self.resolutions
            .resize(self.num_resolutions as usize, ResolutionMode::default());
        self.buttons.resize(num_buttons as usize, ButtonData::default());

        let count = self.num_resolutions;
        for marker in [&mut self.active_resolution, &mut self.default_resolution] {
            if marker.is_some_and(|i| i >= count) {
                *marker = None;
                fixed = true;
            }
        }
        fixed
    }
}

/// Edits buffered on a profile until the next commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingChanges {
    pub resolutions: BTreeSet<u32>,
    pub buttons: BTreeSet<u32>,
    /// The default resolution marker moved.
    pub default_resolution: bool,
}

impl PendingChanges {
    pub fn is_empty(&self) -> bool {
        self.resolutions.is_empty() && self.buttons.is_empty() && !self.default_resolution
    }

    /// Fold `other` into this set.
    pub fn merge(&mut self, other: &PendingChanges) {
        self.resolutions.extend(other.resolutions.iter().copied());
        self.buttons.extend(other.buttons.iter().copied());
        self.default_resolution |= other.default_resolution;
    }

    pub(crate) fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Result of asking a backend to take a device.
pub enum Probe {
    Bound(BoundDevice),
    /// Not this backend's device after all; try the next one.
    Declined,
}

/// Everything a backend learns about a device at bind time.
pub struct BoundDevice {
    pub capabilities: Capabilities,
    pub num_profiles: u32,
    pub num_buttons: u32,
    pub active_profile: u32,
    /// Overrides the token's name when the hardware reports a better one.
    pub name: Option<String>,
    pub driver: Box<dyn Driver>,
}

/// A registry entry for one family of devices.
pub trait Backend {
    /// Non-empty identifier, e.g. `"hidpp20"`.
    fn name(&self) -> &str;

    /// Devices this backend claims.
    fn id_table(&self) -> &[DeviceMatch];

    fn recognizes(&self, id: &InputId) -> bool {
        self.id_table().iter().any(|m| m.matches(id))
    }

    /// Talk to the hardware and decide whether to bind.
    ///
    /// `io` is already open. Returning an error aborts device creation.
    fn probe(&self, io: &DeviceIo, id: &InputId) -> Result<Probe>;
}

/// Per-device programming interface of a bound backend.
///
/// Profile and resolution indices are always in range when called.
pub trait Driver {
    /// Read the stored contents of profile `index`.
    fn read_profile(&mut self, io: &DeviceIo, index: u32) -> Result<ProfileData>;

    /// Commit buffered edits to profile `index`.
    ///
    /// The default dispatches each pending item to the per-field writers.
    fn write_profile(
        &mut self,
        io: &DeviceIo,
        index: u32,
        data: &ProfileData,
        changes: &PendingChanges,
    ) -> Result<()> {
        for &res in &changes.resolutions {
            if let Some(mode) = data.resolutions.get(res as usize) {
                self.write_resolution(io, index, res, mode)?;
            }
        }
        for &button in &changes.buttons {
            if let Some(b) = data.buttons.get(button as usize) {
                self.write_button(io, index, button, &b.action)?;
            }
        }
        if changes.default_resolution {
            if let Some(res) = data.default_resolution {
                self.set_default_resolution(io, index, res)?;
            }
        }
        Ok(())
    }

    /// Make profile `index` the live hardware profile.
    fn set_active_profile(&mut self, io: &DeviceIo, index: u32) -> Result<()>;

    /// Query which profile the hardware is using right now.
    fn read_active_profile(&mut self, io: &DeviceIo) -> Result<u32>;

    fn write_resolution(
        &mut self,
        io: &DeviceIo,
        profile: u32,
        index: u32,
        mode: &ResolutionMode,
    ) -> Result<()>;

    fn set_active_resolution(&mut self, io: &DeviceIo, profile: u32, index: u32) -> Result<()>;

    fn set_default_resolution(&mut self, io: &DeviceIo, profile: u32, index: u32) -> Result<()>;

    fn write_button(
        &mut self,
        io: &DeviceIo,
        profile: u32,
        index: u32,
        action: &Action,
    ) -> Result<()>;

    /// Whether `button` can take actions of type `action_type`.
    fn supports_action(&self, caps: Capabilities, _button: u32, action_type: ActionType) -> bool {
        default_supports_action(caps, action_type)
    }

    /// Release driver state; called once when the device goes away.
    fn remove(&mut self, _io: &DeviceIo) {}
}

/// Action support implied by a capability set alone.
pub fn default_supports_action(caps: Capabilities, action_type: ActionType) -> bool {
    match action_type {
        ActionType::None | ActionType::Button | ActionType::Key | ActionType::Special => {
            caps.contains(Capability::ButtonKey)
        }
        ActionType::Macro => caps.contains(Capability::ButtonMacros),
        ActionType::Unknown => false,
    }
}
