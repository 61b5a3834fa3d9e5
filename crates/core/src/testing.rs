//! Test doubles for the handle model: a recording interface and backend.

use crate::action::Action;
use crate::button::ButtonType;
use crate::context::{Interface, OpenMode};
use crate::driver::{
    bus, Backend, BoundDevice, ButtonData, Capabilities, Capability, DeviceMatch, DeviceToken,
    Driver, InputId, PendingChanges, Probe, ProfileData, ResolutionMode,
};
use crate::error::{Error, Result};
use crate::io::DeviceIo;
use crate::transport::mock::MockTransport;
use crate::transport::HidTransport;
use std::cell::RefCell;
use std::rc::Rc;

const TEST_VID: u16 = 0xFEED;
const TEST_PID: u16 = 0x0001;

/// Token matching [`TestBackend`]'s default id table.
pub fn token() -> DeviceToken {
    DeviceToken {
        name: "Test Mouse".to_string(),
        devnode: "/dev/hidraw7".to_string(),
        id: InputId {
            bustype: bus::USB,
            vendor: TEST_VID,
            product: TEST_PID,
            version: 1,
        },
    }
}

/// Shared record of open/close calls.
#[derive(Clone, Default)]
pub struct IoLog {
    opened: Rc<RefCell<Vec<String>>>,
    closed: Rc<RefCell<usize>>,
}

impl IoLog {
    pub fn opened(&self) -> Vec<String> {
        self.opened.borrow().clone()
    }

    pub fn closed(&self) -> usize {
        *self.closed.borrow()
    }
}

/// An interface whose open hands out clones of `mock` and logs to `log`.
pub fn recording_interface(log: &IoLog, mock: MockTransport) -> Interface {
    let open_log = log.clone();
    let close_log = log.clone();
    Interface::new(
        move |path, _mode: OpenMode| {
            open_log.opened.borrow_mut().push(path.to_string());
            Ok(Box::new(mock.clone()) as Box<dyn HidTransport>)
        },
        move |_transport| *close_log.closed.borrow_mut() += 1,
    )
}

/// Every driver entry point the model can reach.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverCall {
    ReadProfile(u32),
    WriteProfile {
        profile: u32,
        changes: PendingChanges,
    },
    SetActiveProfile(u32),
    ReadActiveProfile,
    WriteResolution {
        profile: u32,
        index: u32,
        mode: ResolutionMode,
    },
    SetActiveResolution {
        profile: u32,
        index: u32,
    },
    SetDefaultResolution {
        profile: u32,
        index: u32,
    },
    WriteButton {
        profile: u32,
        index: u32,
        action: Action,
    },
    Remove,
}

/// Simulated device state behind the test driver.
pub struct Hardware {
    pub active_profile: u32,
    pub profiles: Vec<ProfileData>,
    /// Make every write and switch fail with an I/O error.
    pub fail_writes: bool,
    /// Switch profiles, then report an I/O error anyway.
    pub fail_after_switch: bool,
}

const BUTTON_TYPES: [ButtonType; 8] = [
    ButtonType::Left,
    ButtonType::Right,
    ButtonType::Middle,
    ButtonType::Side,
    ButtonType::Extra,
    ButtonType::WheelUp,
    ButtonType::WheelDown,
    ButtonType::ResolutionUp,
];

/// Three slots: 800 dpi (active, default), 1600 dpi, and one unconfigured.
fn stock_profile(num_buttons: u32) -> ProfileData {
    ProfileData {
        num_resolutions: 3,
        resolutions: vec![
            ResolutionMode {
                dpi: 800,
                report_rate: 1000,
            },
            ResolutionMode {
                dpi: 1600,
                report_rate: 1000,
            },
        ],
        active_resolution: Some(0),
        default_resolution: Some(0),
        buttons: (0..num_buttons)
            .map(|i| ButtonData {
                button_type: BUTTON_TYPES
                    .get(i as usize)
                    .copied()
                    .unwrap_or(ButtonType::Unknown),
                action: Action::Button(i + 1),
            })
            .collect(),
    }
}

enum ProbeOutcome {
    Bind,
    Decline,
    Fail,
}

/// A backend that binds anything in its id table to a recording driver.
pub struct TestBackend {
    name: String,
    id_table: Vec<DeviceMatch>,
    capabilities: Capabilities,
    num_profiles: u32,
    num_buttons: u32,
    active: u32,
    outcome: ProbeOutcome,
    calls: Rc<RefCell<Vec<DriverCall>>>,
    hardware: Rc<RefCell<Hardware>>,
}

impl TestBackend {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            id_table: vec![DeviceMatch::usb(TEST_VID, TEST_PID)],
            capabilities: Capabilities::empty()
                .with(Capability::SwitchableResolution)
                .with(Capability::SwitchableProfile)
                .with(Capability::ButtonKey),
            num_profiles: 1,
            num_buttons: 8,
            active: 0,
            outcome: ProbeOutcome::Bind,
            calls: Rc::default(),
            hardware: Rc::new(RefCell::new(Hardware {
                active_profile: 0,
                profiles: Vec::new(),
                fail_writes: false,
                fail_after_switch: false,
            })),
        }
    }

    pub fn with_profiles(mut self, n: u32) -> Self {
        self.num_profiles = n;
        self
    }

    pub fn with_buttons(mut self, n: u32) -> Self {
        self.num_buttons = n;
        self
    }

    pub fn with_active(mut self, index: u32) -> Self {
        self.active = index;
        self
    }

    pub fn with_capabilities(mut self, caps: Capabilities) -> Self {
        self.capabilities = caps;
        self
    }

    pub fn with_id_table(mut self, table: Vec<DeviceMatch>) -> Self {
        self.id_table = table;
        self
    }

    pub fn declining(mut self) -> Self {
        self.outcome = ProbeOutcome::Decline;
        self
    }

    pub fn failing_probe(mut self) -> Self {
        self.outcome = ProbeOutcome::Fail;
        self
    }

    /// Log of driver calls, shared with the bound driver.
    pub fn calls(&self) -> Rc<RefCell<Vec<DriverCall>>> {
        Rc::clone(&self.calls)
    }

    /// Simulated hardware, shared with the bound driver.
    pub fn hardware(&self) -> Rc<RefCell<Hardware>> {
        Rc::clone(&self.hardware)
    }
}

impl Backend for TestBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn id_table(&self) -> &[DeviceMatch] {
        &self.id_table
    }

    fn probe(&self, _io: &DeviceIo, _id: &InputId) -> Result<Probe> {
        match self.outcome {
            ProbeOutcome::Decline => return Ok(Probe::Declined),
            ProbeOutcome::Fail => {
                return Err(Error::Io(std::io::Error::from_raw_os_error(5)));
            }
            ProbeOutcome::Bind => {}
        }

        {
            let mut hw = self.hardware.borrow_mut();
            hw.active_profile = self.active;
            hw.profiles = (0..self.num_profiles)
                .map(|_| stock_profile(self.num_buttons))
                .collect();
        }

        Ok(Probe::Bound(BoundDevice {
            capabilities: self.capabilities,
            num_profiles: self.num_profiles,
            num_buttons: self.num_buttons,
            active_profile: self.active,
            name: None,
            driver: Box::new(TestDriver {
                calls: Rc::clone(&self.calls),
                hardware: Rc::clone(&self.hardware),
            }),
        }))
    }
}

struct TestDriver {
    calls: Rc<RefCell<Vec<DriverCall>>>,
    hardware: Rc<RefCell<Hardware>>,
}

impl TestDriver {
    fn record(&self, call: DriverCall) {
        self.calls.borrow_mut().push(call);
    }

    fn check_writable(&self) -> Result<()> {
        if self.hardware.borrow().fail_writes {
            Err(Error::Io(std::io::Error::from_raw_os_error(16)))
        } else {
            Ok(())
        }
    }
}

impl Driver for TestDriver {
    fn read_profile(&mut self, _io: &DeviceIo, index: u32) -> Result<ProfileData> {
        self.record(DriverCall::ReadProfile(index));
        Ok(self
            .hardware
            .borrow()
            .profiles
            .get(index as usize)
            .cloned()
            .unwrap_or_default())
    }

    fn write_profile(
        &mut self,
        _io: &DeviceIo,
        index: u32,
        data: &ProfileData,
        changes: &PendingChanges,
    ) -> Result<()> {
        self.record(DriverCall::WriteProfile {
            profile: index,
            changes: changes.clone(),
        });
        self.check_writable()?;
        if let Some(stored) = self.hardware.borrow_mut().profiles.get_mut(index as usize) {
            *stored = data.clone();
        }
        Ok(())
    }

    fn set_active_profile(&mut self, _io: &DeviceIo, index: u32) -> Result<()> {
        self.record(DriverCall::SetActiveProfile(index));
        self.check_writable()?;
        let mut hw = self.hardware.borrow_mut();
        hw.active_profile = index;
        if hw.fail_after_switch {
            return Err(Error::Io(std::io::Error::from_raw_os_error(5)));
        }
        Ok(())
    }

    fn read_active_profile(&mut self, _io: &DeviceIo) -> Result<u32> {
        self.record(DriverCall::ReadActiveProfile);
        Ok(self.hardware.borrow().active_profile)
    }

    fn write_resolution(
        &mut self,
        _io: &DeviceIo,
        profile: u32,
        index: u32,
        mode: &ResolutionMode,
    ) -> Result<()> {
        self.record(DriverCall::WriteResolution {
            profile,
            index,
            mode: *mode,
        });
        self.check_writable()
    }

    fn set_active_resolution(&mut self, _io: &DeviceIo, profile: u32, index: u32) -> Result<()> {
        self.record(DriverCall::SetActiveResolution { profile, index });
        self.check_writable()
    }

    fn set_default_resolution(&mut self, _io: &DeviceIo, profile: u32, index: u32) -> Result<()> {
        self.record(DriverCall::SetDefaultResolution { profile, index });
        self.check_writable()
    }

    fn write_button(
        &mut self,
        _io: &DeviceIo,
        profile: u32,
        index: u32,
        action: &Action,
    ) -> Result<()> {
        self.record(DriverCall::WriteButton {
            profile,
            index,
            action: action.clone(),
        });
        self.check_writable()
    }

    fn remove(&mut self, _io: &DeviceIo) {
        self.record(DriverCall::Remove);
    }
}

/// A simulated G502 HERO on receiver slot 1, scripted into a [`MockTransport`].
pub mod g502 {
    use super::*;
    use crate::hidpp20::controls::cids;
    use crate::{pids, LOGITECH_VID};

    pub const DEV_IDX: u8 = 0x01;
    pub const DPI_IDX: u8 = 0x07;
    pub const RATE_IDX: u8 = 0x08;
    pub const CONTROLS_IDX: u8 = 0x09;
    pub const PROFILES: u8 = 0x0A;

    /// Reprogrammable controls in device order.
    pub const CONTROLS: [u16; 6] = [
        cids::LEFT_CLICK,
        cids::RIGHT_CLICK,
        cids::MIDDLE_CLICK,
        cids::BACK,
        cids::FORWARD,
        cids::DPI_UP,
    ];

    /// Sensor resolution at power-up.
    pub const DPI: u16 = 800;

    pub fn token() -> DeviceToken {
        DeviceToken {
            name: "Logitech G502 HERO Gaming Mouse".to_string(),
            devnode: "/dev/hidraw3".to_string(),
            id: InputId {
                bustype: bus::USB,
                vendor: LOGITECH_VID,
                product: pids::G502_HERO,
                version: 0x0111,
            },
        }
    }

    /// Script probe and read traffic for a device with `profiles` onboard
    /// profiles, `active` being live. Writes need their own `expect_*` call.
    pub fn simulated_g502(mock: &MockTransport, profiles: u8, active: u8) {
        // ROOT ping, which is also the lookup of ROOT itself
        mock.on_short_request(DEV_IDX, 0x00, 0x01, &[0x00, 0x00], &[0x00, 0x00, 0x00]);
        for (feature, index) in [
            ([0x22, 0x01], DPI_IDX),
            ([0x80, 0x60], RATE_IDX),
            ([0x1B, 0x04], CONTROLS_IDX),
            ([0x81, 0x00], PROFILES),
        ] {
            mock.on_short_request(DEV_IDX, 0x00, 0x01, &feature, &[index, 0x00, 0x00]);
        }

        let [dpi_hi, dpi_lo] = DPI.to_be_bytes();
        mock.on_short_request(DEV_IDX, DPI_IDX, 0x11, &[0x00], &[0x00, dpi_hi, dpi_lo]);
        // 1 ms interval
        mock.on_short_request(DEV_IDX, RATE_IDX, 0x11, &[], &[0x01, 0x00, 0x00]);
        // 1, 2, 4 and 8 ms intervals advertised
        mock.on_short_request(DEV_IDX, RATE_IDX, 0x01, &[], &[0x8B, 0x00, 0x00]);

        mock.on_short_request(
            DEV_IDX,
            CONTROLS_IDX,
            0x01,
            &[],
            &[CONTROLS.len() as u8, 0x00, 0x00],
        );
        for (i, cid) in CONTROLS.iter().enumerate() {
            let [hi, lo] = cid.to_be_bytes();
            mock.on_long_request(
                DEV_IDX,
                CONTROLS_IDX,
                0x11,
                &[i as u8],
                &[hi, lo, 0x00, 0x38 + i as u8, 0x01],
            );
            // not remapped
            mock.on_long_request(DEV_IDX, CONTROLS_IDX, 0x21, &[hi, lo], &[hi, lo, 0x00, 0x00, 0x00]);
        }

        mock.on_long_request(DEV_IDX, PROFILES, 0x01, &[], &[0x01, profiles, 0x0B, 0x10]);
        set_current_profile(mock, active);
        mock.on_short_request(DEV_IDX, PROFILES, 0x11, &[0x02], &[0x02, 0x00, 0x00]);
    }

    /// Make the hardware report `index` as the live profile.
    pub fn set_current_profile(mock: &MockTransport, index: u8) {
        mock.on_short_request(DEV_IDX, PROFILES, 0x21, &[], &[0x00, index + 1, 0x00]);
    }

    pub fn expect_profile_switch(mock: &MockTransport, index: u8) {
        mock.on_short_request(
            DEV_IDX,
            PROFILES,
            0x31,
            &[0x00, index + 1],
            &[0x00, 0x00, 0x00],
        );
    }

    pub fn expect_mode_write(mock: &MockTransport, dpi: u16, hz: u16) {
        let [hi, lo] = dpi.to_be_bytes();
        mock.on_short_request(DEV_IDX, DPI_IDX, 0x21, &[0x00, hi, lo], &[0x00, hi, lo]);
        let interval = (1000 / hz) as u8;
        mock.on_short_request(DEV_IDX, RATE_IDX, 0x21, &[interval], &[interval, 0x00, 0x00]);
    }

    pub fn expect_remap(mock: &MockTransport, cid: u16, remap: u16) {
        let [cid_hi, cid_lo] = cid.to_be_bytes();
        let [remap_hi, remap_lo] = remap.to_be_bytes();
        let params = [cid_hi, cid_lo, 0x10, remap_hi, remap_lo];
        mock.on_long_request(DEV_IDX, CONTROLS_IDX, 0x31, &params, &params);
    }
}
