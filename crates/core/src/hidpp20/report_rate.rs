//! Report rate via the REPORT_RATE feature (0x8060).
//!
//! Functions:
//!   - 0: getReportRateList → params[0] = bitmask of supported intervals
//!   - 1: getReportRate → params[0] = current interval in ms
//!   - 2: setReportRate(interval)
//!
//! Intervals: 1 ms = 1000 Hz, 2 ms = 500 Hz, 4 ms = 250 Hz, 8 ms = 125 Hz.

use crate::error::{Error, Result};
use crate::hidpp::{features, HidppRequest};
use crate::transport::{hidpp_request, HidTransport};
use std::fmt;

/// Report rates the feature can encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportRate {
    Hz125 = 125,
    Hz250 = 250,
    Hz500 = 500,
    Hz1000 = 1000,
}

impl ReportRate {
    pub const ALL: &'static [ReportRate] = &[
        ReportRate::Hz125,
        ReportRate::Hz250,
        ReportRate::Hz500,
        ReportRate::Hz1000,
    ];

    pub fn from_hz(hz: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|r| r.as_hz() == hz)
    }

    pub fn as_hz(&self) -> u32 {
        *self as u32
    }

    fn interval_ms(self) -> u8 {
        (1000 / self.as_hz()) as u8
    }

    fn from_interval_ms(interval: u8) -> Result<Self> {
        match interval {
            1 => Ok(Self::Hz1000),
            2 => Ok(Self::Hz500),
            4 => Ok(Self::Hz250),
            8 => Ok(Self::Hz125),
            other => Err(Error::HidppProtocol {
                feature: features::REPORT_RATE,
                code: other,
            }),
        }
    }
}

impl fmt::Display for ReportRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Hz", self.as_hz())
    }
}

pub fn read_report_rate(
    transport: &dyn HidTransport,
    device_index: u8,
    feature_index: u8,
) -> Result<ReportRate> {
    let req = HidppRequest::new(device_index, feature_index, 0x01, vec![]);
    let resp = hidpp_request(transport, &req)?;
    ReportRate::from_interval_ms(resp.params[0])
}

pub fn write_report_rate(
    transport: &dyn HidTransport,
    device_index: u8,
    feature_index: u8,
    rate: ReportRate,
) -> Result<()> {
    let req = HidppRequest::new(device_index, feature_index, 0x02, vec![rate.interval_ms()]);
    hidpp_request(transport, &req)?;
    Ok(())
}

/// Rates the device advertises, slowest first.
pub fn read_supported_rates(
    transport: &dyn HidTransport,
    device_index: u8,
    feature_index: u8,
) -> Result<Vec<ReportRate>> {
    let req = HidppRequest::new(device_index, feature_index, 0x00, vec![]);
    let resp = hidpp_request(transport, &req)?;

    // bit N set: an interval of N + 1 ms is supported
    let bitmask = resp.params[0];
    Ok(ReportRate::ALL
        .iter()
        .copied()
        .filter(|r| bitmask & (1 << (r.interval_ms() - 1)) != 0)
        .collect())
}
