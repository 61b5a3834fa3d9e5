//! HID++ report encoding and decoding, shared by the 1.0 and 2.0 backends.
//!
//! Every message is a short (0x10, 7 bytes) or long (0x11, 20 bytes) report:
//! report id, device index, two addressing bytes, then zero-padded parameters.
//!
//! HID++ 2.0 addresses a feature index and function; HID++ 1.0 addresses a
//! register through a sub-ID and register address in the same two bytes.

use crate::error::{Error, Result};

pub const SHORT_REPORT_ID: u8 = 0x10;
pub const LONG_REPORT_ID: u8 = 0x11;
/// Report lengths, report id included.
pub const SHORT_REPORT_LEN: usize = 7;
pub const LONG_REPORT_LEN: usize = 20;

/// HID++ 2.0 feature ids this crate knows about.
pub mod features {
    /// Ping and feature lookup; always at index 0.
    pub const ROOT: u16 = 0x0000;
    pub const FEATURE_SET: u16 = 0x0001;
    pub const DEVICE_NAME: u16 = 0x0005;
    pub const ADJUSTABLE_DPI: u16 = 0x2201;
    /// Polling interval, 1 to 8 ms.
    pub const REPORT_RATE: u16 = 0x8060;
    /// Button diversion and remapping.
    pub const REPROG_CONTROLS_V4: u16 = 0x1B04;
    pub const ONBOARD_PROFILES: u16 = 0x8100;
    pub const BATTERY_STATUS: u16 = 0x1000;
}

/// HID++ 2.0 error code for a feature the device does not implement.
pub const ERR_NOT_FOUND: u8 = 0x05;
/// Software id stamped into the low nibble of every 2.0 request.
const SOFTWARE_ID: u8 = 0x01;
/// Parameter bytes a long report can carry.
const MAX_PARAMS: usize = LONG_REPORT_LEN - 4;

/// HID++ 1.0 sub-IDs, register addresses and error codes.
pub mod registers {
    /// Device index addressing the receiver itself.
    pub const RECEIVER_IDX: u8 = 0xFF;

    pub const SET_REGISTER: u8 = 0x80;
    pub const GET_REGISTER: u8 = 0x81;
    pub const SET_LONG_REGISTER: u8 = 0x82;
    pub const GET_LONG_REGISTER: u8 = 0x83;
    /// Sub-ID of a HID++ 1.0 error reply.
    pub const ERROR_MSG: u8 = 0x8F;

    /// Current sensor resolution (long register).
    pub const CURRENT_RESOLUTION: u8 = 0x63;
    /// USB refresh rate.
    pub const USB_REFRESH_RATE: u8 = 0x64;
    /// Receiver pairing information (long register).
    pub const PAIRING_INFORMATION: u8 = 0xB5;

    /// Pairing information sub-page for paired device `n` (1-based).
    pub const DEVICE_PAIRING_INFORMATION: u8 = 0x20;
    /// Device name sub-page for paired device `n` (1-based).
    pub const DEVICE_NAME: u8 = 0x40;

    pub const ERR_SUCCESS: u8 = 0x00;
    pub const ERR_INVALID_SUBID: u8 = 0x01;
    pub const ERR_INVALID_ADDRESS: u8 = 0x02;
    pub const ERR_INVALID_VALUE: u8 = 0x03;
    pub const ERR_CONNECT_FAIL: u8 = 0x04;
    pub const ERR_TOO_MANY_DEVICES: u8 = 0x05;
    pub const ERR_ALREADY_EXISTS: u8 = 0x06;
    pub const ERR_BUSY: u8 = 0x07;
    pub const ERR_UNKNOWN_DEVICE: u8 = 0x08;
    pub const ERR_RESOURCE_ERROR: u8 = 0x09;
    pub const ERR_REQUEST_UNAVAILABLE: u8 = 0x0A;
    pub const ERR_INVALID_PARAM_VALUE: u8 = 0x0B;
    pub const ERR_WRONG_PIN_CODE: u8 = 0x0C;

    /// Short description of a HID++ 1.0 error code.
    pub fn error_str(code: u8) -> &'static str {
        match code {
            ERR_SUCCESS => "success",
            ERR_INVALID_SUBID => "invalid sub-id",
            ERR_INVALID_ADDRESS => "invalid address",
            ERR_INVALID_VALUE => "invalid value",
            ERR_CONNECT_FAIL => "connection failed",
            ERR_TOO_MANY_DEVICES => "too many devices",
            ERR_ALREADY_EXISTS => "already exists",
            ERR_BUSY => "busy",
            ERR_UNKNOWN_DEVICE => "unknown device",
            ERR_RESOURCE_ERROR => "resource error",
            ERR_REQUEST_UNAVAILABLE => "request unavailable",
            ERR_INVALID_PARAM_VALUE => "invalid parameter value",
            ERR_WRONG_PIN_CODE => "wrong PIN code",
            _ => "unknown error",
        }
    }
}

/// A HID++ request message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HidppRequest {
    /// 0xFF for the receiver or a wired device, 1..=6 for a paired slot.
    pub device_index: u8,
    /// Feature index, or the 1.0 sub-id.
    pub feature_index: u8,
    /// Function and software id, or the 1.0 register address.
    pub function_sw: u8,
    pub params: Vec<u8>,
}

impl HidppRequest {
    /// A HID++ 2.0 request: `function` goes in the high nibble of the
    /// function byte, the software id in the low one.
    pub fn new(device_index: u8, feature_index: u8, function: u8, params: Vec<u8>) -> Self {
        Self {
            device_index,
            feature_index,
            function_sw: (function << 4) | SOFTWARE_ID,
            params,
        }
    }

    /// Create a HID++ 1.0 register request.
    ///
    /// The sub-ID occupies the feature index byte and the register address the
    /// function byte; no software ID is mixed in.
    pub fn register(device_index: u8, sub_id: u8, address: u8, params: Vec<u8>) -> Self {
        Self {
            device_index,
            feature_index: sub_id,
            function_sw: address,
            params,
        }
    }

    /// Frame the request, zero padded: short when the parameters fit in three
    /// bytes, long otherwise.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let (report_id, len) = match self.params.len() {
            0..=3 => (SHORT_REPORT_ID, SHORT_REPORT_LEN),
            n if n <= MAX_PARAMS => (LONG_REPORT_ID, LONG_REPORT_LEN),
            n => {
                return Err(Error::Hid(format!(
                    "{n} parameter bytes do not fit a HID++ report (max {MAX_PARAMS})"
                )))
            }
        };
        let mut report = Vec::with_capacity(len);
        report.extend_from_slice(&[report_id, self.device_index, self.feature_index, self.function_sw]);
        report.extend_from_slice(&self.params);
        report.resize(len, 0);
        Ok(report)
    }
}

/// A decoded HID++ response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HidppResponse {
    pub is_long: bool,
    pub device_index: u8,
    pub feature_index: u8,
    pub function_sw: u8,
    /// Everything after the addressing bytes, padding included.
    pub params: Vec<u8>,
}

impl HidppResponse {
    /// Parse an input report. Bytes past the report's nominal length are
    /// ignored.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let len = match data.first() {
            Some(&SHORT_REPORT_ID) => SHORT_REPORT_LEN,
            Some(&LONG_REPORT_ID) => LONG_REPORT_LEN,
            Some(other) => return Err(Error::Hid(format!("unknown report ID: 0x{other:02X}"))),
            None => return Err(Error::Hid("empty report".to_string())),
        };
        if data.len() < len {
            return Err(Error::Hid(format!(
                "truncated report: {} of {len} bytes",
                data.len()
            )));
        }
        Ok(Self {
            is_long: len == LONG_REPORT_LEN,
            device_index: data[1],
            feature_index: data[2],
            function_sw: data[3],
            params: data[4..len].to_vec(),
        })
    }

    pub fn function(&self) -> u8 {
        self.function_sw >> 4
    }

    /// HID++ 2.0 error replies come back on feature index 0xFF.
    pub fn is_error(&self) -> bool {
        self.feature_index == 0xFF
    }

    /// Check if this response is a HID++ 1.0 register error.
    pub fn is_register_error(&self) -> bool {
        self.feature_index == registers::ERROR_MSG
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setcurrentprofile_frames_as_short_report() {
        // onboard profiles at index 0x0A, function 3, profile 2
        let req = HidppRequest::new(0x01, 0x0A, 0x03, vec![0x00, 0x02]);
        assert_eq!(req.encode().unwrap(), vec![0x10, 0x01, 0x0A, 0x31, 0x00, 0x02, 0x00]);
    }

    #[test]
    fn remap_needs_a_long_report() {
        let req = HidppRequest::new(0x01, 0x09, 0x03, vec![0x00, 0x53, 0x10, 0x00, 0x56]);
        let report = req.encode().unwrap();
        assert_eq!(report.len(), LONG_REPORT_LEN);
        assert_eq!(report[..9], [0x11, 0x01, 0x09, 0x31, 0x00, 0x53, 0x10, 0x00, 0x56]);
        assert!(report[9..].iter().all(|&b| b == 0));
    }

    #[test]
    fn seventeen_parameter_bytes_are_refused() {
        let req = HidppRequest::new(0x01, 0x00, 0x00, vec![0u8; MAX_PARAMS + 1]);
        assert!(matches!(req.encode(), Err(Error::Hid(_))));
    }

    #[test]
    fn dpi_reply_decodes() {
        // getSensorDpi: sensor 0 at 0x0320 (800 dpi)
        let mut data = vec![LONG_REPORT_ID, 0x01, 0x07, 0x21, 0x00, 0x03, 0x20];
        data.resize(LONG_REPORT_LEN, 0);
        let resp = HidppResponse::decode(&data).unwrap();
        assert!(resp.is_long);
        assert_eq!(resp.function(), 0x02);
        assert_eq!(resp.params.len(), LONG_REPORT_LEN - 4);
        assert_eq!(u16::from_be_bytes([resp.params[1], resp.params[2]]), 800);
    }

    #[test]
    fn trailing_bytes_are_dropped() {
        let data = [SHORT_REPORT_ID, 0x01, 0x08, 0x01, 0x8B, 0x00, 0x00, 0xEE, 0xEE];
        let resp = HidppResponse::decode(&data).unwrap();
        assert!(!resp.is_long);
        assert_eq!(resp.params, vec![0x8B, 0x00, 0x00]);
    }

    #[test]
    fn malformed_reports_are_rejected() {
        assert!(HidppResponse::decode(&[]).is_err());
        assert!(HidppResponse::decode(&[SHORT_REPORT_ID, 0x01, 0x02]).is_err());
        // a long report id with only short-report bytes behind it
        assert!(HidppResponse::decode(&[LONG_REPORT_ID, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06]).is_err());
        assert!(HidppResponse::decode(&[0x20, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06]).is_err());
    }

    #[test]
    fn error_kinds_do_not_overlap() {
        let v20 = HidppResponse::decode(&[SHORT_REPORT_ID, 0x01, 0xFF, 0x07, 0x21, 0x02, 0x00]).unwrap();
        assert!(v20.is_error());
        assert!(!v20.is_register_error());

        let v10 = HidppResponse::decode(&[SHORT_REPORT_ID, 0xFF, 0x8F, 0x83, 0xB5, 0x02, 0x00]).unwrap();
        assert!(v10.is_register_error());
        assert!(!v10.is_error());
        assert_eq!(registers::error_str(v10.params[1]), "invalid address");
    }

    #[test]
    fn register_request_keeps_raw_address() {
        let req = HidppRequest::register(
            registers::RECEIVER_IDX,
            registers::GET_LONG_REGISTER,
            registers::PAIRING_INFORMATION,
            vec![registers::DEVICE_PAIRING_INFORMATION],
        );
        let encoded = req.encode().unwrap();
        assert_eq!(encoded, vec![0x10, 0xFF, 0x83, 0xB5, 0x20, 0x00, 0x00]);
    }
}
