//! Buttons and their physical types.

use crate::action::{Action, ActionType, MacroData, SpecialAction, MAX_MODIFIERS};
use crate::driver::Capability;
use crate::error::{Error, Result};
use crate::handle::{Refcounted, UserData, UserDataCell};
use crate::profile::Profile;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;

/// Where a button sits on the device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonType {
    #[default]
    Unknown,
    Left,
    Middle,
    Right,
    Thumb,
    Thumb2,
    Thumb3,
    Thumb4,
    WheelLeft,
    WheelRight,
    WheelClick,
    WheelUp,
    WheelDown,
    WheelRatchetModeShift,
    Extra,
    Side,
    Pinkie,
    Pinkie2,
    ResolutionCycleUp,
    ResolutionUp,
    ResolutionDown,
    ProfileCycleUp,
    ProfileUp,
    ProfileDown,
}

impl ButtonType {
    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Left => "left",
            Self::Middle => "middle",
            Self::Right => "right",
            Self::Thumb => "thumb",
            Self::Thumb2 => "thumb2",
            Self::Thumb3 => "thumb3",
            Self::Thumb4 => "thumb4",
            Self::WheelLeft => "wheel left",
            Self::WheelRight => "wheel right",
            Self::WheelClick => "wheel click",
            Self::WheelUp => "wheel up",
            Self::WheelDown => "wheel down",
            Self::WheelRatchetModeShift => "wheel ratchet mode switch",
            Self::Extra => "extra (forward)",
            Self::Side => "side (backward)",
            Self::Pinkie => "pinkie",
            Self::Pinkie2 => "pinkie2",
            Self::ResolutionCycleUp => "resolution cycle up",
            Self::ResolutionUp => "resolution up",
            Self::ResolutionDown => "resolution down",
            Self::ProfileCycleUp => "profile cycle up",
            Self::ProfileUp => "profile up",
            Self::ProfileDown => "profile down",
        }
    }
}

impl fmt::Display for ButtonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub(crate) struct ButtonInner {
    index: u32,
    user_data: UserDataCell,
}

impl ButtonInner {
    pub(crate) fn new(index: u32) -> Self {
        Self {
            index,
            user_data: UserDataCell::default(),
        }
    }
}

/// One button of a profile. Holds its profile alive.
///
/// Getters for a variant other than the current action's return a sentinel
/// (0, or [`SpecialAction::Invalid`]) instead of failing.
#[derive(Clone)]
pub struct Button {
    profile: Profile,
    inner: Rc<ButtonInner>,
}

impl Button {
    pub(crate) fn from_parts(profile: Profile, inner: Rc<ButtonInner>) -> Self {
        Self { profile, inner }
    }

    pub fn index(&self) -> u32 {
        self.inner.index
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn user_data(&self) -> Option<UserData> {
        self.inner.user_data.get()
    }

    pub fn user_data_as<T: 'static>(&self) -> Option<Rc<T>> {
        self.inner.user_data.get_as()
    }

    pub fn set_user_data(&self, data: Option<UserData>) {
        self.inner.user_data.set(data);
    }

    pub fn button_type(&self) -> ButtonType {
        self.profile.state().data.buttons[self.inner.index as usize].button_type
    }

    /// A copy of the current action.
    pub fn action(&self) -> Action {
        self.profile.state().data.buttons[self.inner.index as usize]
            .action
            .clone()
    }

    pub fn action_type(&self) -> ActionType {
        self.profile.state().data.buttons[self.inner.index as usize]
            .action
            .action_type()
    }

    /// Whether this button can be given actions of type `ty`.
    ///
    /// Does not promise that every value of that type is accepted.
    pub fn has_action_type(&self, ty: ActionType) -> bool {
        self.profile
            .device()
            .supports_action(self.inner.index, ty)
    }

    /// Logical button number, or 0.
    pub fn button(&self) -> u32 {
        self.action().button()
    }

    pub fn set_button(&self, button: u32) -> Result<()> {
        self.set(Action::Button(button))
    }

    /// Key code, or 0.
    ///
    /// Copies at most `modifiers.len()` modifiers into `modifiers` and returns
    /// how many were written. `modifiers` is left untouched unless the action
    /// is a key.
    pub fn key(&self, modifiers: &mut [u32]) -> (u32, usize) {
        match self.action() {
            Action::Key { key, modifiers: mods } => {
                let n = mods.len().min(modifiers.len());
                modifiers[..n].copy_from_slice(&mods[..n]);
                (key, n)
            }
            _ => (0, 0),
        }
    }

    pub fn set_key(&self, key: u32, modifiers: &[u32]) -> Result<()> {
        if modifiers.len() > MAX_MODIFIERS {
            return Err(Error::invalid_argument(format!(
                "{} modifiers given, at most {} supported",
                modifiers.len(),
                MAX_MODIFIERS
            )));
        }
        self.set(Action::Key {
            key,
            modifiers: modifiers.to_vec(),
        })
    }

    /// Special function, or [`SpecialAction::Invalid`].
    pub fn special(&self) -> SpecialAction {
        self.action().special()
    }

    pub fn set_special(&self, special: SpecialAction) -> Result<()> {
        if special == SpecialAction::Invalid {
            return Err(Error::invalid_argument("invalid special action"));
        }
        self.set(Action::Special(special))
    }

    /// The vendor payload of a macro action. There is no setter; drivers own
    /// the encoding.
    pub fn macro_data(&self) -> Option<MacroData> {
        match self.action() {
            Action::Macro(data) => Some(data),
            _ => None,
        }
    }

    /// Unmap the button.
    pub fn disable(&self) -> Result<()> {
        self.set(Action::None)
    }

    fn set(&self, action: Action) -> Result<()> {
        if !self.profile.device().has_capability(Capability::ButtonKey) {
            return Err(Error::unsupported("device buttons are not programmable"));
        }
        self.profile.update_button(self.inner.index, action)
    }
}

impl Refcounted for Button {
    fn ref_count(&self) -> usize {
        Rc::strong_count(&self.inner) - 1
    }
}

impl fmt::Debug for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Button")
            .field("profile", &self.profile.index())
            .field("index", &self.inner.index)
            .field("type", &self.button_type())
            .field("action", &self.action())
            .finish()
    }
}
