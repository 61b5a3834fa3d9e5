//! Profiles: hardware configuration slots and the commit point for edits.
//!
//! Edits on the active profile are written through to the driver at once.
//! Edits on any other profile are buffered in [`PendingChanges`] and sent in
//! one batch by [`Profile::set_active`].

use crate::action::Action;
use crate::button::{Button, ButtonInner};
use crate::device::Device;
use crate::driver::{Capability, PendingChanges, ProfileData, ResolutionMode};
use crate::error::{Error, Result};
use crate::handle::{Refcounted, UserData, UserDataCell};
use crate::log::{log_debug, log_error};
use crate::resolution::{Resolution, ResolutionInner};
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

pub(crate) struct ProfileState {
    pub(crate) data: ProfileData,
    pub(crate) pending: PendingChanges,
}

pub(crate) struct ProfileInner {
    index: u32,
    state: RefCell<ProfileState>,
    resolutions: RefCell<Vec<Option<Rc<ResolutionInner>>>>,
    buttons: RefCell<Vec<Option<Rc<ButtonInner>>>>,
    user_data: UserDataCell,
}

impl ProfileInner {
    pub(crate) fn new(index: u32, data: ProfileData) -> Self {
        let num_resolutions = data.num_resolutions as usize;
        let num_buttons = data.buttons.len();
        Self {
            index,
            state: RefCell::new(ProfileState {
                data,
                pending: PendingChanges::default(),
            }),
            resolutions: RefCell::new(vec![None; num_resolutions]),
            buttons: RefCell::new(vec![None; num_buttons]),
            user_data: UserDataCell::default(),
        }
    }
}

/// One profile of a device. Holds its device alive.
#[derive(Clone)]
pub struct Profile {
    device: Device,
    inner: Rc<ProfileInner>,
}

impl Profile {
    pub(crate) fn from_parts(device: Device, inner: Rc<ProfileInner>) -> Self {
        Self { device, inner }
    }

    pub fn index(&self) -> u32 {
        self.inner.index
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn num_resolutions(&self) -> u32 {
        self.state().data.num_resolutions
    }

    pub fn num_buttons(&self) -> u32 {
        self.device.num_buttons()
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

    /// Whether this is the device's active profile, as last known.
    pub fn is_active(&self) -> bool {
        self.device.inner.active_profile.get() == self.inner.index
    }

    /// Whether edits are buffered waiting for [`set_active`](Self::set_active).
    pub fn has_pending_changes(&self) -> bool {
        !self.state().pending.is_empty()
    }

    /// Commit buffered edits and make this the active profile.
    ///
    /// On an already active profile this only flushes. Otherwise the edits are
    /// flushed first, then the driver switches the hardware; the active marker
    /// moves only after both succeed. The profile's default resolution becomes
    /// its active one.
    ///
    /// If the switch fails, the flushed edits are marked pending again and the
    /// active marker is re-read from the hardware, which may have switched
    /// before the failure.
    pub fn set_active(&self) -> Result<()> {
        let flushed = self.flush()?;
        if self.is_active() {
            return Ok(());
        }

        let index = self.inner.index;
        if !self.device.has_capability(Capability::SwitchableProfile) {
            return Err(Error::unsupported("device cannot switch profiles"));
        }

        let switched = self
            .device
            .with_driver(|driver, io| driver.set_active_profile(io, index));
        if let Err(e) = switched {
            log_error!(
                self.device.context(),
                "{}: failed to switch to profile {}: {}",
                self.device.devnode(),
                index,
                e
            );
            self.state_mut().pending.merge(&flushed);
            if let Err(refresh) = self.device.refresh_active_profile() {
                log_error!(
                    self.device.context(),
                    "{}: cannot read back the active profile: {}",
                    self.device.devnode(),
                    refresh
                );
            }
            return Err(e);
        }

        self.device.inner.active_profile.set(index);
        {
            let mut state = self.state_mut();
            state.data.active_resolution = state.data.default_resolution;
        }
        log_debug!(
            self.device.context(),
            "{}: profile {} is now active",
            self.device.devnode(),
            index
        );
        Ok(())
    }

    /// Resolution mode `index`.
    pub fn resolution(&self, index: u32) -> Result<Resolution> {
        let count = self.num_resolutions();
        if index >= count {
            return Err(Error::OutOfRange {
                what: "resolution",
                index,
                count,
            });
        }
        let mut cache = self.inner.resolutions.borrow_mut();
        let inner = cache[index as usize]
            .get_or_insert_with(|| Rc::new(ResolutionInner::new(index)))
            .clone();
        Ok(Resolution::from_parts(self.clone(), inner))
    }

    /// Button `index`.
    pub fn button(&self, index: u32) -> Result<Button> {
        let count = self.num_buttons();
        if index >= count {
            return Err(Error::OutOfRange {
                what: "button",
                index,
                count,
            });
        }
        let mut cache = self.inner.buttons.borrow_mut();
        let inner = cache[index as usize]
            .get_or_insert_with(|| Rc::new(ButtonInner::new(index)))
            .clone();
        Ok(Button::from_parts(self.clone(), inner))
    }

    pub(crate) fn state(&self) -> Ref<'_, ProfileState> {
        self.inner.state.borrow()
    }

    fn state_mut(&self) -> RefMut<'_, ProfileState> {
        self.inner.state.borrow_mut()
    }

    /// Send buffered edits to the driver and return what was sent. Edits stay
    /// pending on failure.
    fn flush(&self) -> Result<PendingChanges> {
        let (data, changes) = {
            let state = self.state();
            if state.pending.is_empty() {
                return Ok(PendingChanges::default());
            }
            (state.data.clone(), state.pending.clone())
        };

        let index = self.inner.index;
        log_debug!(
            self.device.context(),
            "{}: committing profile {} ({} resolutions, {} buttons)",
            self.device.devnode(),
            index,
            changes.resolutions.len(),
            changes.buttons.len()
        );
        self.device
            .with_driver(|driver, io| driver.write_profile(io, index, &data, &changes))?;
        self.state_mut().pending.clear();
        Ok(changes)
    }

    pub(crate) fn update_resolution(&self, index: u32, mode: ResolutionMode) -> Result<()> {
        let profile = self.inner.index;
        if self.is_active() {
            self.device
                .with_driver(|driver, io| driver.write_resolution(io, profile, index, &mode))?;
            self.state_mut().data.resolutions[index as usize] = mode;
        } else {
            let mut state = self.state_mut();
            state.data.resolutions[index as usize] = mode;
            state.pending.resolutions.insert(index);
        }
        Ok(())
    }

    pub(crate) fn update_default_resolution(&self, index: u32) -> Result<()> {
        let profile = self.inner.index;
        if self.is_active() {
            self.device
                .with_driver(|driver, io| driver.set_default_resolution(io, profile, index))?;
            self.state_mut().data.default_resolution = Some(index);
        } else {
            let mut state = self.state_mut();
            state.data.default_resolution = Some(index);
            state.pending.default_resolution = true;
        }
        Ok(())
    }

    pub(crate) fn update_active_resolution(&self, index: u32) -> Result<()> {
        let profile = self.inner.index;
        self.device
            .with_driver(|driver, io| driver.set_active_resolution(io, profile, index))?;
        self.state_mut().data.active_resolution = Some(index);
        Ok(())
    }

    pub(crate) fn update_button(&self, index: u32, action: Action) -> Result<()> {
        let profile = self.inner.index;
        if self.is_active() {
            self.device
                .with_driver(|driver, io| driver.write_button(io, profile, index, &action))?;
            self.state_mut().data.buttons[index as usize].action = action;
        } else {
            let mut state = self.state_mut();
            state.data.buttons[index as usize].action = action;
            state.pending.buttons.insert(index);
        }
        Ok(())
    }

    pub fn ptr_eq(&self, other: &Profile) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Refcounted for Profile {
    fn ref_count(&self) -> usize {
        // The device's cache holds one reference.
        Rc::strong_count(&self.inner) - 1
    }
}

impl fmt::Debug for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Profile")
            .field("index", &self.inner.index)
            .field("active", &self.is_active())
            .field("pending", &self.has_pending_changes())
            .finish()
    }
}
