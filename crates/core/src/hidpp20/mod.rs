//! Logitech HID++ 2.0 backend for the G502 family.
//!
//! Features are located once at probe time through ROOT and cached by index.
//! The features used here expose the live sensor and control settings, so
//! every profile reads the current hardware state. Edits committed to an
//! inactive profile are held back and applied right after the device switches
//! to it.

pub mod controls;
pub mod dpi;
pub mod onboard;
pub mod report_rate;
pub mod safety;

use crate::action::{Action, ActionType};
use crate::driver::{
    Backend, BoundDevice, ButtonData, Capabilities, Capability, DeviceMatch, Driver, InputId,
    PendingChanges, Probe, ProfileData, ResolutionMode,
};
use crate::error::{Error, Result};
use crate::hidpp::{features, HidppRequest};
use crate::io::DeviceIo;
use crate::log::{log_debug, log_error, log_info};
use crate::transport::{hidpp_request, lookup_feature_index, HidTransport};
use crate::{pids, LOGITECH_VID};
use controls::ControlInfo;
use onboard::OnboardMode;
use report_rate::ReportRate;
use std::collections::BTreeMap;

/// Wired devices answer on 0xFF, receiver-paired ones on their slot.
const DEVICE_INDEX_CANDIDATES: [u8; 2] = [0xFF, 0x01];

const ID_TABLE: &[DeviceMatch] = &[
    DeviceMatch::usb(LOGITECH_VID, pids::G502_HERO),
    DeviceMatch::usb(LOGITECH_VID, pids::G502_LIGHTSPEED),
    DeviceMatch::usb(LOGITECH_VID, pids::G502_PROTEUS_SPECTRUM),
];

/// Sensor the resolution is programmed on.
const SENSOR: u8 = 0;

/// Feature indices of the features this backend drives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct FeatureMap {
    dpi: Option<u8>,
    report_rate: Option<u8>,
    controls: Option<u8>,
    onboard: Option<u8>,
}

impl FeatureMap {
    fn discover(transport: &dyn HidTransport, device_index: u8) -> Result<Self> {
        let lookup = |feature_id| match lookup_feature_index(transport, device_index, feature_id) {
            Ok(index) => Ok(Some(index)),
            // absent features come back as a protocol error
            Err(Error::HidppProtocol { .. }) => Ok(None),
            Err(e) => Err(e),
        };
        Ok(Self {
            dpi: lookup(features::ADJUSTABLE_DPI)?,
            report_rate: lookup(features::REPORT_RATE)?,
            controls: lookup(features::REPROG_CONTROLS_V4)?,
            onboard: lookup(features::ONBOARD_PROFILES)?,
        })
    }
}

/// ROOT ping: succeeds only if something answers on `device_index`.
fn ping(transport: &dyn HidTransport, device_index: u8) -> Result<()> {
    let req = HidppRequest::new(device_index, 0x00, 0x00, vec![0x00, 0x00]);
    hidpp_request(transport, &req).map(|_| ())
}

/// Registry entry for HID++ 2.0 mice.
pub struct Hidpp20Backend;

impl Backend for Hidpp20Backend {
    fn name(&self) -> &str {
        "hidpp20"
    }

    fn id_table(&self) -> &[DeviceMatch] {
        ID_TABLE
    }

    fn probe(&self, io: &DeviceIo, id: &InputId) -> Result<Probe> {
        let ctx = io.context();
        let Some(device_index) = DEVICE_INDEX_CANDIDATES
            .into_iter()
            .find(|&index| ping(io, index).is_ok())
        else {
            log_info!(ctx, "{}: no HID++ 2.0 device answers ({})", io.devnode(), id);
            return Ok(Probe::Declined);
        };

        let features = FeatureMap::discover(io, device_index)?;
        let mut capabilities = Capabilities::empty();
        if features.dpi.is_some() {
            capabilities = capabilities.with(Capability::SwitchableResolution);
        }

        let controls = match features.controls {
            Some(feature_index) => {
                capabilities = capabilities.with(Capability::ButtonKey);
                controls::read_controls(io, device_index, feature_index)?
            }
            None => Vec::new(),
        };

        let rates = match features.report_rate {
            Some(feature_index) => {
                report_rate::read_supported_rates(io, device_index, feature_index)?
            }
            None => Vec::new(),
        };

        let mut num_profiles = 1;
        let mut active_profile = 0;
        if let Some(feature_index) = features.onboard {
            let desc = onboard::read_description(io, device_index, feature_index)?;
            if desc.profile_count > 1 {
                capabilities = capabilities.with(Capability::SwitchableProfile);
                num_profiles = u32::from(desc.profile_count);
                active_profile = onboard::read_current_profile(io, device_index, feature_index)?;
            }
        }

        log_debug!(
            ctx,
            "{}: HID++ 2.0 device on index 0x{:02x}: {} controls, {} profiles",
            io.devnode(),
            device_index,
            controls.len(),
            num_profiles
        );

        Ok(Probe::Bound(BoundDevice {
            capabilities,
            num_profiles,
            num_buttons: controls.len() as u32,
            active_profile,
            name: None,
            driver: Box::new(Hidpp20Driver {
                device_index,
                features,
                controls,
                rates,
                active_profile,
                staged: BTreeMap::new(),
            }),
        }))
    }
}

struct Hidpp20Driver {
    device_index: u8,
    features: FeatureMap,
    controls: Vec<ControlInfo>,
    /// Report rates the device advertises.
    rates: Vec<ReportRate>,
    active_profile: u32,
    /// Commits to inactive profiles, applied once they go live.
    staged: BTreeMap<u32, (ProfileData, PendingChanges)>,
}

impl Hidpp20Driver {
    /// Feature index for `feature_id`, after the request passed the safety checks.
    fn feature(&self, index: Option<u8>, feature_id: u16, function: u8) -> Result<u8> {
        safety::validate_hidpp_request(feature_id, function)?;
        index.ok_or_else(|| {
            Error::unsupported(format!("device lacks HID++ feature 0x{feature_id:04X}"))
        })
    }

    fn read_mode(&self, io: &DeviceIo) -> Result<ResolutionMode> {
        let dpi = match self.features.dpi {
            Some(f) => u32::from(dpi::read_dpi(io, self.device_index, f, SENSOR)?),
            None => 0,
        };
        let report_rate = match self.features.report_rate {
            Some(f) => report_rate::read_report_rate(io, self.device_index, f)?.as_hz(),
            None => 0,
        };
        Ok(ResolutionMode { dpi, report_rate })
    }

    fn read_buttons(&self, io: &DeviceIo) -> Result<Vec<ButtonData>> {
        let Some(f) = self.features.controls else {
            return Ok(Vec::new());
        };
        self.controls
            .iter()
            .map(|control| {
                let remap = controls::read_remap(io, self.device_index, f, control.cid)?;
                Ok(ButtonData {
                    button_type: control.button_type(),
                    action: controls::cid_to_action(remap),
                })
            })
            .collect()
    }

    /// Reject anything in `changes` the hardware cannot take, before any I/O.
    fn validate(&self, data: &ProfileData, changes: &PendingChanges) -> Result<()> {
        for &index in &changes.resolutions {
            if let Some(mode) = data.resolutions.get(index as usize) {
                self.validate_mode(mode)?;
            }
        }
        for &index in &changes.buttons {
            let i = safety::validate_button_index(index, self.controls.len() as u32)?;
            if let Some(button) = data.buttons.get(usize::from(i)) {
                controls::action_to_cid(&button.action)?;
            }
        }
        Ok(())
    }

    fn validate_mode(&self, mode: &ResolutionMode) -> Result<()> {
        safety::validate_dpi(mode.dpi)?;
        match self.features.report_rate {
            Some(_) => {
                let rate = safety::validate_report_rate(mode.report_rate)?;
                if !self.rates.contains(&rate) {
                    return Err(Error::unsupported(format!("device cannot report at {rate}")));
                }
                Ok(())
            }
            None if mode.report_rate != 0 => Err(Error::unsupported("report rate is fixed")),
            None => Ok(()),
        }
    }

    fn apply(&self, io: &DeviceIo, data: &ProfileData, changes: &PendingChanges) -> Result<()> {
        for &index in &changes.resolutions {
            if let Some(mode) = data.resolutions.get(index as usize) {
                self.write_mode(io, mode)?;
            }
        }
        for &index in &changes.buttons {
            if let Some(button) = data.buttons.get(index as usize) {
                self.write_control(io, index, &button.action)?;
            }
        }
        Ok(())
    }

    fn write_mode(&self, io: &DeviceIo, mode: &ResolutionMode) -> Result<()> {
        let f_dpi = self.feature(self.features.dpi, features::ADJUSTABLE_DPI, 0x02)?;
        self.validate_mode(mode)?;
        dpi::write_dpi(io, self.device_index, f_dpi, SENSOR, mode.dpi)?;
        if let Some(f_rate) = self.features.report_rate {
            let rate = safety::validate_report_rate(mode.report_rate)?;
            report_rate::write_report_rate(io, self.device_index, f_rate, rate)?;
        }
        Ok(())
    }

    fn write_control(&self, io: &DeviceIo, index: u32, action: &Action) -> Result<()> {
        let f = self.feature(self.features.controls, features::REPROG_CONTROLS_V4, 0x03)?;
        let i = safety::validate_button_index(index, self.controls.len() as u32)?;
        let remap = controls::action_to_cid(action)?;
        let cid = self.controls[usize::from(i)].cid;
        controls::write_remap(io, self.device_index, f, cid, remap)
    }
}

impl Driver for Hidpp20Driver {
    fn read_profile(&mut self, io: &DeviceIo, _index: u32) -> Result<ProfileData> {
        Ok(ProfileData {
            resolutions: vec![self.read_mode(io)?],
            num_resolutions: 1,
            active_resolution: Some(0),
            default_resolution: Some(0),
            buttons: self.read_buttons(io)?,
        })
    }

    fn write_profile(
        &mut self,
        io: &DeviceIo,
        index: u32,
        data: &ProfileData,
        changes: &PendingChanges,
    ) -> Result<()> {
        self.validate(data, changes)?;
        if index == self.active_profile {
            // the model's data supersedes anything still held back
            self.apply(io, data, changes)?;
            self.staged.remove(&index);
            return Ok(());
        }

        log_debug!(
            io.context(),
            "{}: holding changes to profile {} until it is active",
            io.devnode(),
            index
        );
        let (staged_data, staged_changes) = self
            .staged
            .entry(index)
            .or_insert_with(|| (data.clone(), PendingChanges::default()));
        *staged_data = data.clone();
        staged_changes.merge(changes);
        Ok(())
    }

    fn set_active_profile(&mut self, io: &DeviceIo, index: u32) -> Result<()> {
        let f = self.feature(self.features.onboard, features::ONBOARD_PROFILES, 0x03)?;
        let offset = u8::try_from(index)
            .map_err(|_| Error::invalid_argument(format!("profile {index} out of range")))?;

        onboard::set_onboard_mode(io, self.device_index, f, OnboardMode::Onboard)?;
        onboard::write_current_profile(io, self.device_index, f, offset)?;
        self.active_profile = index;

        // held back until they land, so a retry can still write them
        if let Some((data, changes)) = self.staged.get(&index) {
            if let Err(e) = self.apply(io, data, changes) {
                log_error!(
                    io.context(),
                    "{}: profile {} is active but its changes failed: {}",
                    io.devnode(),
                    index,
                    e
                );
                return Err(e);
            }
            self.staged.remove(&index);
        }
        Ok(())
    }

    fn read_active_profile(&mut self, io: &DeviceIo) -> Result<u32> {
        if let Some(f) = self.features.onboard {
            self.active_profile = onboard::read_current_profile(io, self.device_index, f)?;
        }
        Ok(self.active_profile)
    }

    fn write_resolution(
        &mut self,
        io: &DeviceIo,
        _profile: u32,
        _index: u32,
        mode: &ResolutionMode,
    ) -> Result<()> {
        self.write_mode(io, mode)
    }

    // One slot per profile: it is always the active and default one.
    fn set_active_resolution(&mut self, _io: &DeviceIo, _profile: u32, _index: u32) -> Result<()> {
        Ok(())
    }

    fn set_default_resolution(&mut self, _io: &DeviceIo, _profile: u32, _index: u32) -> Result<()> {
        Ok(())
    }

    fn write_button(
        &mut self,
        io: &DeviceIo,
        _profile: u32,
        index: u32,
        action: &Action,
    ) -> Result<()> {
        self.write_control(io, index, action)
    }

    /// Controls can only be pointed at other controls.
    fn supports_action(&self, caps: Capabilities, _button: u32, action_type: ActionType) -> bool {
        caps.contains(Capability::ButtonKey)
            && matches!(action_type, ActionType::Button | ActionType::Special)
    }
}
