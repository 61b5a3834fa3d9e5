//! The byte pipe between drivers and hardware, and HID++ request helpers on
//! top of it.
//!
//! The caller-supplied open operation hands back a [`HidTransport`]; drivers
//! talk to hardware only through it, so real hidraw nodes and the test mock
//! are interchangeable.

use crate::error::{Error, Result};
use crate::hidpp::{self, registers, HidppRequest, HidppResponse};
use tracing::{debug, trace, warn};

/// One output report in, the matching input report out.
pub trait HidTransport {
    /// Write a raw HID report and return the response.
    fn send_report(&self, data: &[u8]) -> Result<Vec<u8>>;
}

/// Send a HID++ 2.0 request and decode the response.
///
/// An error reply (sub-id 0xFF, then the rejected feature index, the function
/// and the error code) becomes [`Error::HidppProtocol`].
pub fn hidpp_request(transport: &dyn HidTransport, req: &HidppRequest) -> Result<HidppResponse> {
    let report = req.encode()?;
    trace!(
        device_index = req.device_index,
        feature_index = req.feature_index,
        function_sw = format_args!("0x{:02X}", req.function_sw),
        report_hex = format_args!("{:02X?}", report),
        "HID++ TX"
    );
    let resp = HidppResponse::decode(&transport.send_report(&report)?)?;

    if resp.is_error() {
        let feature = resp.function_sw;
        let code = resp.params.get(1).copied().unwrap_or(0);
        warn!(feature, code, "HID++ error response");
        return Err(Error::HidppProtocol {
            feature: u16::from(feature),
            code,
        });
    }

    trace!(
        is_long = resp.is_long,
        feature_index = resp.feature_index,
        params_hex = format_args!("{:02X?}", resp.params),
        "HID++ RX"
    );
    Ok(resp)
}

/// Resolve a HID++ 2.0 feature id to the index the device assigned it.
///
/// Asks ROOT (always index 0, getFeature is function 0); an index of 0 in the
/// reply means the device lacks the feature.
pub fn lookup_feature_index(
    transport: &dyn HidTransport,
    device_index: u8,
    feature_id: u16,
) -> Result<u8> {
    let req = HidppRequest::new(device_index, 0x00, 0x00, feature_id.to_be_bytes().to_vec());
    let resp = hidpp_request(transport, &req)?;

    match resp.params.first().copied() {
        Some(index) if index != 0 => {
            debug!(
                feature_id = format_args!("0x{:04X}", feature_id),
                index, "feature found"
            );
            Ok(index)
        }
        _ => {
            debug!(feature_id = format_args!("0x{:04X}", feature_id), "feature absent");
            Err(Error::HidppProtocol {
                feature: feature_id,
                code: hidpp::ERR_NOT_FOUND,
            })
        }
    }
}

/// Retry budget for [`send_with_retry`].
pub const MAX_RETRIES: u32 = 3;

/// Send a HID++ request, retrying transient failures.
///
/// Returns the response on success, or the last error after exhausting retries.
pub fn send_with_retry(
    transport: &dyn HidTransport,
    req: &HidppRequest,
    max_retries: u32,
) -> Result<HidppResponse> {
    let mut attempt = 0;
    loop {
        match hidpp_request(transport, req) {
            Ok(resp) => {
                if attempt > 0 {
                    debug!(attempt = attempt + 1, "HID++ request succeeded after retry");
                }
                return Ok(resp);
            }
            Err(e) if e.is_transient() && attempt < max_retries => {
                debug!(
                    attempt = attempt + 1,
                    max = max_retries + 1,
                    error = %e,
                    "HID++ transient error, retrying"
                );
                attempt += 1;
            }
            Err(e) => {
                warn!(class = ?e.class(), attempt = attempt + 1, error = %e, "HID++ request failed");
                return Err(e);
            }
        }
    }
}

/// Send a HID++ 1.0 register request and decode the response.
///
/// Register errors come back as sub-id 0x8F with the error code in the second
/// parameter byte; they surface as [`Error::HidppProtocol`] keyed by the
/// register address.
pub fn register_request(transport: &dyn HidTransport, req: &HidppRequest) -> Result<HidppResponse> {
    let encoded = req.encode()?;
    trace!(
        device_index = req.device_index,
        sub_id = format_args!("0x{:02X}", req.feature_index),
        address = format_args!("0x{:02X}", req.function_sw),
        "HID++ 1.0 TX"
    );

    let raw = transport.send_report(&encoded)?;
    let resp = HidppResponse::decode(&raw)?;

    if resp.is_register_error() {
        let code = resp.params.get(1).copied().unwrap_or(0);
        warn!(
            address = format_args!("0x{:02X}", req.function_sw),
            code,
            reason = registers::error_str(code),
            "HID++ 1.0 error response"
        );
        return Err(Error::HidppProtocol {
            feature: req.function_sw as u16,
            code,
        });
    }

    trace!(params_hex = format_args!("{:02X?}", resp.params), "HID++ 1.0 RX");
    Ok(resp)
}

/// Scripted transport: exact request bytes map to canned replies, and every
/// report sent is kept for inspection.
#[cfg(test)]
pub mod mock {
    use super::*;
    use crate::hidpp::{LONG_REPORT_ID, LONG_REPORT_LEN, SHORT_REPORT_ID, SHORT_REPORT_LEN};
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    /// Clones share state, so a test can keep one clone for assertions while
    /// the device owns another.
    #[derive(Clone, Default)]
    pub struct MockTransport {
        responses: Rc<RefCell<HashMap<Vec<u8>, Vec<u8>>>>,
        sent: Rc<RefCell<Vec<Vec<u8>>>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Answer `request`, byte for byte, with `response`.
        pub fn on_request(&self, request: Vec<u8>, response: Vec<u8>) {
            self.responses.borrow_mut().insert(request, response);
        }

        /// Register a HID++ 1.0 register response (short request, short or long reply).
        pub fn on_register_request(
            &self,
            device_idx: u8,
            sub_id: u8,
            address: u8,
            req_params: &[u8],
            resp_params: &[u8],
        ) {
            let header = [device_idx, sub_id, address];
            self.on_request(frame(header, req_params), frame(header, resp_params));
        }

        /// Every report sent so far, in order.
        pub fn sent(&self) -> Vec<Vec<u8>> {
            self.sent.borrow().clone()
        }

        /// Number of reports sent so far.
        pub fn sent_count(&self) -> usize {
            self.sent.borrow().len()
        }

        /// Register a short HID++ 2.0 reply to a short request.
        pub fn on_short_request(
            &self,
            device_idx: u8,
            feature_idx: u8,
            function_sw: u8,
            req_params: &[u8],
            resp_params: &[u8],
        ) {
            let header = [device_idx, feature_idx, function_sw];
            self.on_request(frame(header, req_params), framed(SHORT_REPORT_ID, header, resp_params));
        }

        /// Register a long HID++ 2.0 reply. The request is long only when its
        /// parameters need it.
        pub fn on_long_request(
            &self,
            device_idx: u8,
            feature_idx: u8,
            function_sw: u8,
            req_params: &[u8],
            resp_params: &[u8],
        ) {
            let header = [device_idx, feature_idx, function_sw];
            self.on_request(frame(header, req_params), framed(LONG_REPORT_ID, header, resp_params));
        }
    }

    /// A report sized for `params`, the way [`HidppRequest::encode`] sizes it.
    fn frame(header: [u8; 3], params: &[u8]) -> Vec<u8> {
        let id = if params.len() <= 3 { SHORT_REPORT_ID } else { LONG_REPORT_ID };
        framed(id, header, params)
    }

    fn framed(report_id: u8, header: [u8; 3], params: &[u8]) -> Vec<u8> {
        let len = if report_id == SHORT_REPORT_ID { SHORT_REPORT_LEN } else { LONG_REPORT_LEN };
        let mut report = vec![report_id];
        report.extend_from_slice(&header);
        report.extend_from_slice(params);
        report.resize(len, 0);
        report
    }

    impl HidTransport for MockTransport {
        fn send_report(&self, data: &[u8]) -> Result<Vec<u8>> {
            self.sent.borrow_mut().push(data.to_vec());
            let responses = self.responses.borrow();
            responses.get(data).cloned().ok_or_else(|| {
                Error::Hid(format!(
                    "mock: no response registered for request {:02X?}",
                    data
                ))
            })
        }
    }
}
