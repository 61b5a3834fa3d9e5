//! Device handles: one bound piece of hardware and its profile cache.

use crate::action::{Action, ActionType};
use crate::button::ButtonType;
use crate::context::Context;
use crate::driver::{BoundDevice, Capabilities, Capability, DeviceToken, Driver, InputId};
use crate::error::{Error, Result};
use crate::handle::{Refcounted, UserData, UserDataCell};
use crate::io::DeviceIo;
use crate::log::{log_bug, log_debug};
use crate::profile::{Profile, ProfileInner};
use serde::Serialize;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

pub(crate) struct DeviceInner {
    pub(crate) ctx: Context,
    name: String,
    id: InputId,
    capabilities: Capabilities,
    num_profiles: u32,
    num_buttons: u32,
    pub(crate) active_profile: Cell<u32>,
    profiles: RefCell<Vec<Option<Rc<ProfileInner>>>>,
    user_data: UserDataCell,
    driver_name: String,
    driver: RefCell<Box<dyn Driver>>,
    // Declared last: the node is closed after the driver's remove hook ran.
    io: DeviceIo,
}

impl Drop for DeviceInner {
    fn drop(&mut self) {
        log_debug!(self.ctx, "{}: removing device '{}'", self.io.devnode(), self.name);
        self.driver.get_mut().remove(&self.io);
    }
}

/// A device bound to a backend driver.
///
/// Cloning acquires another reference; the driver is removed and the node
/// closed when the last reference (including those held by child handles)
/// goes away.
#[derive(Clone)]
pub struct Device {
    pub(crate) inner: Rc<DeviceInner>,
}

impl Device {
    pub(crate) fn bind(
        ctx: Context,
        token: &DeviceToken,
        driver_name: &str,
        io: DeviceIo,
        bound: BoundDevice,
    ) -> Self {
        let BoundDevice {
            capabilities,
            mut num_profiles,
            num_buttons,
            mut active_profile,
            name,
            driver,
        } = bound;

        if num_profiles == 0 {
            log_bug!(ctx, "driver '{}' reports zero profiles", driver_name);
            num_profiles = 1;
        }
        if num_profiles > 1 && !capabilities.contains(Capability::SwitchableProfile) {
            log_bug!(
                ctx,
                "driver '{}' reports {} profiles without profile switching",
                driver_name,
                num_profiles
            );
            num_profiles = 1;
        }
        if active_profile >= num_profiles {
            log_bug!(
                ctx,
                "driver '{}' reports active profile {} of {}",
                driver_name,
                active_profile,
                num_profiles
            );
            active_profile = 0;
        }

        Self {
            inner: Rc::new(DeviceInner {
                ctx,
                name: name.unwrap_or_else(|| token.name.clone()),
                id: token.id,
                capabilities,
                num_profiles,
                num_buttons,
                active_profile: Cell::new(active_profile),
                profiles: RefCell::new(vec![None; num_profiles as usize]),
                user_data: UserDataCell::default(),
                driver_name: driver_name.to_string(),
                driver: RefCell::new(driver),
                io,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn id(&self) -> InputId {
        self.inner.id
    }

    pub fn devnode(&self) -> &str {
        self.inner.io.devnode()
    }

    /// Name of the backend the device is bound to.
    pub fn driver_name(&self) -> &str {
        &self.inner.driver_name
    }

    pub fn context(&self) -> &Context {
        &self.inner.ctx
    }

    pub fn capabilities(&self) -> Capabilities {
        self.inner.capabilities
    }

    pub fn has_capability(&self, cap: Capability) -> bool {
        self.inner.capabilities.contains(cap)
    }

    pub fn num_profiles(&self) -> u32 {
        self.inner.num_profiles
    }

    pub fn num_buttons(&self) -> u32 {
        self.inner.num_buttons
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

    /// Profile `index`, read from the driver on first access.
    pub fn profile(&self, index: u32) -> Result<Profile> {
        if index >= self.inner.num_profiles {
            return Err(Error::OutOfRange {
                what: "profile",
                index,
                count: self.inner.num_profiles,
            });
        }

        if let Some(inner) = self.inner.profiles.borrow()[index as usize].clone() {
            return Ok(Profile::from_parts(self.clone(), inner));
        }

        let mut data = self.with_driver(|driver, io| driver.read_profile(io, index))?;
        if data.normalize(self.inner.num_buttons) {
            log_bug!(
                self.inner.ctx,
                "driver '{}' returned an inconsistent profile {}",
                self.inner.driver_name,
                index
            );
        }
        let inner = Rc::new(ProfileInner::new(index, data));
        self.inner.profiles.borrow_mut()[index as usize] = Some(Rc::clone(&inner));
        Ok(Profile::from_parts(self.clone(), inner))
    }

    /// The profile currently marked active.
    pub fn active_profile(&self) -> Result<Profile> {
        self.profile(self.inner.active_profile.get())
    }

    /// Ask the hardware which profile is live and update the cached marker.
    ///
    /// Hardware buttons can switch profiles behind the library's back.
    pub fn refresh_active_profile(&self) -> Result<Profile> {
        let index = self.with_driver(|driver, io| driver.read_active_profile(io))?;
        if index >= self.inner.num_profiles {
            log_bug!(
                self.inner.ctx,
                "driver '{}' reports active profile {} of {}",
                self.inner.driver_name,
                index,
                self.inner.num_profiles
            );
        } else if index != self.inner.active_profile.get() {
            log_debug!(
                self.inner.ctx,
                "{}: active profile changed to {} on the device",
                self.devnode(),
                index
            );
            self.inner.active_profile.set(index);
        }
        self.active_profile()
    }

    /// Snapshot of every profile, resolution and button.
    pub fn summary(&self) -> Result<DeviceSummary> {
        let mut profiles = Vec::with_capacity(self.inner.num_profiles as usize);
        for index in 0..self.inner.num_profiles {
            let profile = self.profile(index)?;
            let mut resolutions = Vec::new();
            for r in 0..profile.num_resolutions() {
                let res = profile.resolution(r)?;
                resolutions.push(ResolutionSummary {
                    index: r,
                    dpi: res.dpi(),
                    report_rate: res.report_rate(),
                    active: res.is_active(),
                    default: res.is_default(),
                });
            }
            let mut buttons = Vec::new();
            for b in 0..profile.num_buttons() {
                let button = profile.button(b)?;
                buttons.push(ButtonSummary {
                    index: b,
                    button_type: button.button_type(),
                    action: button.action(),
                });
            }
            profiles.push(ProfileSummary {
                index,
                active: profile.is_active(),
                resolutions,
                buttons,
            });
        }

        Ok(DeviceSummary {
            name: self.name().to_string(),
            devnode: self.devnode().to_string(),
            driver: self.driver_name().to_string(),
            id: self.id(),
            capabilities: self.capabilities().iter().collect(),
            num_buttons: self.num_buttons(),
            profiles,
        })
    }

    /// Run `f` against the bound driver and the open node.
    pub(crate) fn with_driver<T>(
        &self,
        f: impl FnOnce(&mut dyn Driver, &DeviceIo) -> Result<T>,
    ) -> Result<T> {
        // driver messages reach the handler once the driver is released
        self.inner.ctx.hold_log();
        let result = {
            let mut driver = self.inner.driver.borrow_mut();
            f(driver.as_mut(), &self.inner.io)
        };
        self.inner.ctx.release_log();
        result
    }

    pub(crate) fn supports_action(&self, button: u32, ty: ActionType) -> bool {
        self.inner
            .driver
            .borrow()
            .supports_action(self.inner.capabilities, button, ty)
    }
}

impl Refcounted for Device {
    fn ref_count(&self) -> usize {
        Rc::strong_count(&self.inner)
    }
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("name", &self.inner.name)
            .field("devnode", &self.devnode())
            .field("driver", &self.inner.driver_name)
            .field("num_profiles", &self.inner.num_profiles)
            .field("num_buttons", &self.inner.num_buttons)
            .finish()
    }
}

/// Serializable view of a device, as printed by `ratbag-command info --json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceSummary {
    pub name: String,
    pub devnode: String,
    pub driver: String,
    pub id: InputId,
    pub capabilities: Vec<Capability>,
    pub num_buttons: u32,
    pub profiles: Vec<ProfileSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileSummary {
    pub index: u32,
    pub active: bool,
    pub resolutions: Vec<ResolutionSummary>,
    pub buttons: Vec<ButtonSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionSummary {
    pub index: u32,
    pub dpi: u32,
    pub report_rate: u32,
    pub active: bool,
    pub default: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ButtonSummary {
    pub index: u32,
    pub button_type: ButtonType,
    pub action: Action,
}
