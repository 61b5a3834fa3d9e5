//! Bounds checks run before any HID++ 2.0 write reaches the device.
//!
//! # Bounds
//!
//! - **DPI**: 100 to 25,600 in steps of 50 (HERO 25K sensor). A value of 0
//!   would disable the mode, which the sensor cannot do.
//! - **Report rate**: 125, 250, 500 or 1000 Hz; nothing else is encodable.
//! - **Features**: only the features below are ever addressed. Firmware
//!   update, DFU and raw memory access are never reachable.
//!
//! Every check happens before the first report is sent, so a rejected value
//! leaves the device untouched.

use super::report_rate::ReportRate;
use crate::error::{Error, Result};
use crate::hidpp::features;

const ALLOWED_FEATURE_IDS: &[u16] = &[
    features::ROOT,
    features::FEATURE_SET,
    features::DEVICE_NAME,
    features::BATTERY_STATUS,
    features::REPROG_CONTROLS_V4,
    features::ADJUSTABLE_DPI,
    features::REPORT_RATE,
    features::ONBOARD_PROFILES,
];

/// HID++ 2.0 function ids are four bits wide.
const MAX_FUNCTION_ID: u8 = 0x0F;

pub const DPI_MIN: u32 = 100;
pub const DPI_MAX: u32 = 25600;
pub const DPI_STEP: u32 = 50;

pub fn validate_feature_id(feature_id: u16) -> Result<()> {
    if ALLOWED_FEATURE_IDS.contains(&feature_id) {
        Ok(())
    } else {
        Err(Error::unsupported(format!(
            "HID++ feature 0x{feature_id:04X} is not allowed"
        )))
    }
}

/// Check a (feature, function) pair before it is sent.
pub fn validate_hidpp_request(feature_id: u16, function_id: u8) -> Result<()> {
    validate_feature_id(feature_id)?;
    if function_id > MAX_FUNCTION_ID {
        return Err(Error::ValueOutOfRange {
            field: "function_id",
            value: function_id as u32,
            min: 0,
            max: MAX_FUNCTION_ID as u32,
        });
    }
    Ok(())
}

pub fn validate_dpi(dpi: u32) -> Result<u16> {
    if dpi == 0 {
        return Err(Error::unsupported("resolution modes cannot be disabled"));
    }
    if !(DPI_MIN..=DPI_MAX).contains(&dpi) {
        return Err(Error::ValueOutOfRange {
            field: "dpi",
            value: dpi,
            min: DPI_MIN,
            max: DPI_MAX,
        });
    }
    if dpi % DPI_STEP != 0 {
        return Err(Error::invalid_argument(format!(
            "dpi {dpi} is not a multiple of {DPI_STEP}"
        )));
    }
    Ok(dpi as u16)
}

pub fn validate_report_rate(hz: u32) -> Result<ReportRate> {
    ReportRate::from_hz(hz).ok_or(Error::ValueOutOfRange {
        field: "report_rate",
        value: hz,
        min: 125,
        max: 1000,
    })
}

pub fn validate_button_index(index: u32, count: u32) -> Result<u8> {
    if index >= count {
        return Err(Error::OutOfRange {
            what: "control",
            index,
            count,
        });
    }
    Ok(index as u8)
}
