//! Resolution modes: (dpi, report rate) pairs within a profile.

use crate::driver::{Capability, ResolutionMode};
use crate::error::{Error, Result};
use crate::handle::{Refcounted, UserData, UserDataCell};
use crate::profile::Profile;
use std::fmt;
use std::rc::Rc;

pub(crate) struct ResolutionInner {
    index: u32,
    user_data: UserDataCell,
}

impl ResolutionInner {
    pub(crate) fn new(index: u32) -> Self {
        Self {
            index,
            user_data: UserDataCell::default(),
        }
    }
}

/// One resolution mode of a profile. Holds its profile alive.
#[derive(Clone)]
pub struct Resolution {
    profile: Profile,
    inner: Rc<ResolutionInner>,
}

impl Resolution {
    pub(crate) fn from_parts(profile: Profile, inner: Rc<ResolutionInner>) -> Self {
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

    fn mode(&self) -> ResolutionMode {
        self.profile.state().data.resolutions[self.inner.index as usize]
    }

    /// Resolution in dots per inch; 0 if the mode is disabled.
    pub fn dpi(&self) -> u32 {
        self.mode().dpi
    }

    /// Report rate in Hz; 0 if disabled.
    pub fn report_rate(&self) -> u32 {
        self.mode().report_rate
    }

    /// Set the resolution. 0 disables the mode.
    pub fn set_dpi(&self, dpi: u32) -> Result<()> {
        self.require_switchable()?;
        let mode = ResolutionMode {
            dpi,
            ..self.mode()
        };
        self.profile.update_resolution(self.inner.index, mode)
    }

    /// Set the report rate. 0 disables it.
    pub fn set_report_rate(&self, hz: u32) -> Result<()> {
        self.require_switchable()?;
        let mode = ResolutionMode {
            report_rate: hz,
            ..self.mode()
        };
        self.profile.update_resolution(self.inner.index, mode)
    }

    /// Whether the hardware is using this mode right now.
    ///
    /// Always false outside the active profile.
    pub fn is_active(&self) -> bool {
        self.profile.is_active()
            && self.profile.state().data.active_resolution == Some(self.inner.index)
    }

    /// Switch the hardware to this mode. The profile must be active.
    pub fn set_active(&self) -> Result<()> {
        self.require_switchable()?;
        if !self.profile.is_active() {
            return Err(Error::invalid_state(format!(
                "profile {} is not active",
                self.profile.index()
            )));
        }
        if self.dpi() == 0 {
            return Err(Error::invalid_state(format!(
                "resolution {} is disabled",
                self.inner.index
            )));
        }
        self.profile.update_active_resolution(self.inner.index)
    }

    /// Whether this mode is selected when its profile becomes active.
    pub fn is_default(&self) -> bool {
        self.profile.state().data.default_resolution == Some(self.inner.index)
    }

    pub fn set_default(&self) -> Result<()> {
        self.require_switchable()?;
        if self.dpi() == 0 {
            return Err(Error::invalid_state(format!(
                "resolution {} is disabled",
                self.inner.index
            )));
        }
        self.profile.update_default_resolution(self.inner.index)
    }

    fn require_switchable(&self) -> Result<()> {
        if self
            .profile
            .device()
            .has_capability(Capability::SwitchableResolution)
        {
            Ok(())
        } else {
            Err(Error::unsupported("device cannot switch resolutions"))
        }
    }
}

impl Refcounted for Resolution {
    fn ref_count(&self) -> usize {
        Rc::strong_count(&self.inner) - 1
    }
}

impl fmt::Debug for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = self.mode();
        f.debug_struct("Resolution")
            .field("profile", &self.profile.index())
            .field("index", &self.inner.index)
            .field("dpi", &mode.dpi)
            .field("report_rate", &mode.report_rate)
            .field("active", &self.is_active())
            .field("default", &self.is_default())
            .finish()
    }
}
