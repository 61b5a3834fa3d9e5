//! Logitech HID++ 1.0 backend (M570, G500s).
//!
//! Read-only: the receiver's pairing register locates the device by wireless
//! PID, and the resolution and refresh rate registers describe its single
//! mode. Nothing on these devices is programmable through this backend.

use crate::action::Action;
use crate::driver::{
    Backend, BoundDevice, ButtonData, Capabilities, DeviceMatch, Driver, InputId, Probe,
    ProfileData, ResolutionMode,
};
use crate::error::{Error, Result};
use crate::hidpp::{registers, HidppRequest, HidppResponse};
use crate::io::DeviceIo;
use crate::log::{log_debug, log_error, log_raw};
use crate::transport::{register_request, HidTransport};
use crate::{pids, LOGITECH_VID};

const ID_TABLE: &[DeviceMatch] = &[
    DeviceMatch::usb(LOGITECH_VID, pids::M570),
    DeviceMatch::usb(LOGITECH_VID, pids::G500S),
];

/// Receiver slots a device can be paired in.
const PAIRING_SLOTS: std::ops::RangeInclusive<u8> = 1..=6;

const NUM_BUTTONS: u32 = 8;

/// Current resolution register counts in 50 dpi steps.
const RESOLUTION_UNIT: u32 = 50;

fn read_register(
    transport: &dyn HidTransport,
    device_index: u8,
    sub_id: u8,
    address: u8,
    params: &[u8],
) -> Result<HidppResponse> {
    let req = HidppRequest::register(device_index, sub_id, address, params.to_vec());
    register_request(transport, &req)
}

/// Pairing record of one receiver slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Pairing {
    report_interval: u8,
    wpid: u16,
    device_type: u8,
}

fn read_pairing(transport: &dyn HidTransport, slot: u8) -> Result<Pairing> {
    let resp = read_register(
        transport,
        registers::RECEIVER_IDX,
        registers::GET_LONG_REGISTER,
        registers::PAIRING_INFORMATION,
        &[registers::DEVICE_PAIRING_INFORMATION + slot - 1],
    )?;
    let p = &resp.params;
    if p.len() < 8 {
        return Err(Error::Hid(format!(
            "short pairing record: {} bytes",
            p.len()
        )));
    }
    Ok(Pairing {
        report_interval: p[2],
        wpid: u16::from_be_bytes([p[3], p[4]]),
        device_type: p[7],
    })
}

fn read_device_name(transport: &dyn HidTransport, slot: u8) -> Result<String> {
    let resp = read_register(
        transport,
        registers::RECEIVER_IDX,
        registers::GET_LONG_REGISTER,
        registers::PAIRING_INFORMATION,
        &[registers::DEVICE_NAME + slot - 1],
    )?;
    let len = usize::from(resp.params.get(1).copied().unwrap_or(0));
    let end = (2 + len).min(resp.params.len());
    Ok(String::from_utf8_lossy(&resp.params[2.min(end)..end]).into_owned())
}

fn read_resolution(transport: &dyn HidTransport, device_index: u8) -> Result<u32> {
    let resp = read_register(
        transport,
        device_index,
        registers::GET_LONG_REGISTER,
        registers::CURRENT_RESOLUTION,
        &[],
    )?;
    let steps = u16::from_le_bytes([resp.params[0], resp.params[1]]);
    Ok(u32::from(steps) * RESOLUTION_UNIT)
}

fn read_refresh_rate(transport: &dyn HidTransport, device_index: u8) -> Result<u32> {
    let resp = read_register(
        transport,
        device_index,
        registers::GET_REGISTER,
        registers::USB_REFRESH_RATE,
        &[],
    )?;
    // the register holds the report interval in ms
    Ok(match resp.params[0] {
        0 => 0,
        interval => 1000 / u32::from(interval),
    })
}

/// Registry entry for HID++ 1.0 devices behind a receiver.
pub struct Hidpp10Backend;

impl Backend for Hidpp10Backend {
    fn name(&self) -> &str {
        "hidpp10"
    }

    fn id_table(&self) -> &[DeviceMatch] {
        ID_TABLE
    }

    fn probe(&self, io: &DeviceIo, id: &InputId) -> Result<Probe> {
        let ctx = io.context();

        let mut found = None;
        for slot in PAIRING_SLOTS {
            match read_pairing(io, slot) {
                Ok(pairing) if pairing.wpid == id.product => {
                    found = Some((slot, pairing));
                    break;
                }
                Ok(pairing) => {
                    log_raw!(
                        ctx,
                        "{}: slot {} holds wpid {:04x}",
                        io.devnode(),
                        slot,
                        pairing.wpid
                    );
                }
                // empty slots answer with a register error
                Err(Error::HidppProtocol { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        let Some((slot, pairing)) = found else {
            log_error!(
                ctx,
                "{}: no HID++ 1.0 device with wireless PID {:04x}",
                io.devnode(),
                id.product
            );
            return Ok(Probe::Declined);
        };

        let name = match read_device_name(io, slot) {
            Ok(name) if !name.is_empty() => Some(name),
            Ok(_) => None,
            Err(e) => {
                log_debug!(ctx, "{}: no device name: {}", io.devnode(), e);
                None
            }
        };
        let mode = ResolutionMode {
            dpi: read_resolution(io, slot)?,
            report_rate: read_refresh_rate(io, slot)?,
        };
        log_debug!(
            ctx,
            "{}: HID++ 1.0 device in slot {} (type {}, interval {} ms): {} dpi @ {} Hz",
            io.devnode(),
            slot,
            pairing.device_type,
            pairing.report_interval,
            mode.dpi,
            mode.report_rate
        );

        Ok(Probe::Bound(BoundDevice {
            capabilities: Capabilities::empty(),
            num_profiles: 1,
            num_buttons: NUM_BUTTONS,
            active_profile: 0,
            name,
            driver: Box::new(Hidpp10Driver { mode }),
        }))
    }
}

struct Hidpp10Driver {
    mode: ResolutionMode,
}

fn read_only() -> Error {
    Error::unsupported("HID++ 1.0 devices are read-only")
}

impl Driver for Hidpp10Driver {
    fn read_profile(&mut self, _io: &DeviceIo, _index: u32) -> Result<ProfileData> {
        Ok(ProfileData {
            resolutions: vec![self.mode],
            num_resolutions: 1,
            active_resolution: Some(0),
            default_resolution: Some(0),
            buttons: vec![ButtonData::default(); NUM_BUTTONS as usize],
        })
    }

    fn set_active_profile(&mut self, _io: &DeviceIo, _index: u32) -> Result<()> {
        Err(read_only())
    }

    fn read_active_profile(&mut self, _io: &DeviceIo) -> Result<u32> {
        Ok(0)
    }

    fn write_resolution(
        &mut self,
        _io: &DeviceIo,
        _profile: u32,
        _index: u32,
        _mode: &ResolutionMode,
    ) -> Result<()> {
        Err(read_only())
    }

    fn set_active_resolution(&mut self, _io: &DeviceIo, _profile: u32, _index: u32) -> Result<()> {
        Err(read_only())
    }

    fn set_default_resolution(&mut self, _io: &DeviceIo, _profile: u32, _index: u32) -> Result<()> {
        Err(read_only())
    }

    fn write_button(
        &mut self,
        _io: &DeviceIo,
        _profile: u32,
        _index: u32,
        _action: &Action,
    ) -> Result<()> {
        Err(read_only())
    }
}
