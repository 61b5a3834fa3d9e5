//! Sensor resolution via the ADJUSTABLE_DPI feature (0x2201).
//!
//! Functions:
//!   - 1: getSensorDpi(sensor) → params[1..3] = current DPI, big-endian
//!   - 2: setSensorDpi(sensor, dpi)

use super::safety;
use crate::error::Result;
use crate::hidpp::HidppRequest;
use crate::transport::{hidpp_request, HidTransport};

pub fn read_dpi(
    transport: &dyn HidTransport,
    device_index: u8,
    feature_index: u8,
    sensor: u8,
) -> Result<u16> {
    let req = HidppRequest::new(device_index, feature_index, 0x01, vec![sensor]);
    let resp = hidpp_request(transport, &req)?;
    // params[0] echoes the sensor index
    Ok(u16::from_be_bytes([resp.params[1], resp.params[2]]))
}

/// Validate `dpi` and program it into `sensor`.
pub fn write_dpi(
    transport: &dyn HidTransport,
    device_index: u8,
    feature_index: u8,
    sensor: u8,
    dpi: u32,
) -> Result<u16> {
    let dpi = safety::validate_dpi(dpi)?;
    let [hi, lo] = dpi.to_be_bytes();
    let req = HidppRequest::new(device_index, feature_index, 0x02, vec![sensor, hi, lo]);
    hidpp_request(transport, &req)?;
    Ok(dpi)
}
