//! Button actions: what a physical button does when pressed.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of modifiers a key action carries.
pub const MAX_MODIFIERS: usize = 10;

/// Discriminant of an [`Action`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Unknown,
    None,
    Button,
    Key,
    Special,
    Macro,
}

impl ActionType {
    pub const ALL: &'static [ActionType] = &[
        ActionType::None,
        ActionType::Button,
        ActionType::Key,
        ActionType::Special,
        ActionType::Macro,
        ActionType::Unknown,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::None => "none",
            Self::Button => "button",
            Self::Key => "key",
            Self::Special => "special",
            Self::Macro => "macro",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Built-in device functions a button can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecialAction {
    /// Sentinel returned when the button is not mapped to a special action.
    Invalid,
    /// A special function the driver could not identify.
    Unknown,
    DoubleClick,
    WheelLeft,
    WheelRight,
    WheelUp,
    WheelDown,
    RatchetModeSwitch,
    ResolutionCycleUp,
    ResolutionUp,
    ResolutionDown,
    ProfileCycleUp,
    ProfileUp,
    ProfileDown,
}

impl SpecialAction {
    /// Every settable special action.
    pub const ALL: &'static [SpecialAction] = &[
        SpecialAction::DoubleClick,
        SpecialAction::WheelLeft,
        SpecialAction::WheelRight,
        SpecialAction::WheelUp,
        SpecialAction::WheelDown,
        SpecialAction::RatchetModeSwitch,
        SpecialAction::ResolutionCycleUp,
        SpecialAction::ResolutionUp,
        SpecialAction::ResolutionDown,
        SpecialAction::ProfileCycleUp,
        SpecialAction::ProfileUp,
        SpecialAction::ProfileDown,
    ];

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Invalid => "invalid",
            Self::Unknown => "unknown",
            Self::DoubleClick => "doubleclick",
            Self::WheelLeft => "wheel left",
            Self::WheelRight => "wheel right",
            Self::WheelUp => "wheel up",
            Self::WheelDown => "wheel down",
            Self::RatchetModeSwitch => "ratchet mode switch",
            Self::ResolutionCycleUp => "resolution cycle up",
            Self::ResolutionUp => "resolution up",
            Self::ResolutionDown => "resolution down",
            Self::ProfileCycleUp => "profile cycle up",
            Self::ProfileUp => "profile up",
            Self::ProfileDown => "profile down",
        }
    }

    /// Parse a special action from its label.
    ///
    /// Accepts the label with spaces, dashes or underscores between words
    /// (case-insensitive), e.g. "resolution up", "resolution-up".
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized: String = name
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c == '-' || c == '_' { ' ' } else { c })
            .collect();
        Self::ALL
            .iter()
            .copied()
            .find(|s| s.label() == normalized)
            .or(match normalized.as_str() {
                "double click" => Some(Self::DoubleClick),
                _ => None,
            })
    }
}

impl fmt::Display for SpecialAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Vendor-defined macro payload. The core never interprets it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MacroData(pub Vec<u8>);

/// What a button does.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Action {
    /// Button is disabled.
    #[default]
    None,
    /// Emits this logical button number.
    Button(u32),
    /// Emits `key` with `modifiers` pressed first, in order.
    Key { key: u32, modifiers: Vec<u32> },
    Special(SpecialAction),
    Macro(MacroData),
    /// Mapping the driver could not decode.
    Unknown,
}

impl Action {
    pub fn action_type(&self) -> ActionType {
        match self {
            Self::None => ActionType::None,
            Self::Button(_) => ActionType::Button,
            Self::Key { .. } => ActionType::Key,
            Self::Special(_) => ActionType::Special,
            Self::Macro(_) => ActionType::Macro,
            Self::Unknown => ActionType::Unknown,
        }
    }

    /// Logical button number, or 0 if this is not a button action.
    pub fn button(&self) -> u32 {
        match self {
            Self::Button(b) => *b,
            _ => 0,
        }
    }

    /// Key code, or 0 if this is not a key action.
    pub fn key(&self) -> u32 {
        match self {
            Self::Key { key, .. } => *key,
            _ => 0,
        }
    }

    /// Modifiers of a key action; empty otherwise.
    pub fn modifiers(&self) -> &[u32] {
        match self {
            Self::Key { modifiers, .. } => modifiers,
            _ => &[],
        }
    }

    /// Special function, or [`SpecialAction::Invalid`] if this is not a special action.
    pub fn special(&self) -> SpecialAction {
        match self {
            Self::Special(s) => *s,
            _ => SpecialAction::Invalid,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            Self::Button(b) => write!(f, "button {b}"),
            Self::Key { key, modifiers } if modifiers.is_empty() => write!(f, "key {key}"),
            Self::Key { key, modifiers } => write!(f, "key {key} (modifiers {modifiers:?})"),
            Self::Special(s) => f.write_str(s.label()),
            Self::Macro(_) => f.write_str("macro"),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}
