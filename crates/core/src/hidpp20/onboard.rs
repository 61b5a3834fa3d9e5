//! Onboard profile switching via the ONBOARD_PROFILES feature (0x8100).
//!
//! Functions:
//!   - 0: getDescription → memory model, profile count, button count, sectors
//!   - 1: setOnboardMode(mode) → 1 = host, 2 = onboard
//!   - 2: getCurrentProfile → (page, offset) of the live profile
//!   - 3: setCurrentProfile(page, offset)
//!
//! Profiles live on page 0 at offsets 1..=N, so profile `i` is offset `i + 1`.

use crate::error::Result;
use crate::hidpp::HidppRequest;
use crate::transport::{hidpp_request, send_with_retry, HidTransport, MAX_RETRIES};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnboardMode {
    /// The host drives the settings.
    Host = 1,
    /// The mouse runs from its stored profiles.
    Onboard = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileDescription {
    pub memory_model: u8,
    pub profile_count: u8,
    pub button_count: u8,
    pub sector_count: u8,
}

pub fn read_description(
    transport: &dyn HidTransport,
    device_index: u8,
    feature_index: u8,
) -> Result<ProfileDescription> {
    let req = HidppRequest::new(device_index, feature_index, 0x00, vec![]);
    let resp = hidpp_request(transport, &req)?;
    Ok(ProfileDescription {
        memory_model: resp.params[0],
        profile_count: resp.params[1],
        button_count: resp.params[2],
        sector_count: resp.params.get(3).copied().unwrap_or(0),
    })
}

pub fn set_onboard_mode(
    transport: &dyn HidTransport,
    device_index: u8,
    feature_index: u8,
    mode: OnboardMode,
) -> Result<()> {
    let req = HidppRequest::new(device_index, feature_index, 0x01, vec![mode as u8]);
    hidpp_request(transport, &req)?;
    Ok(())
}

/// Zero-based index of the live profile.
pub fn read_current_profile(
    transport: &dyn HidTransport,
    device_index: u8,
    feature_index: u8,
) -> Result<u32> {
    let req = HidppRequest::new(device_index, feature_index, 0x02, vec![]);
    let resp = hidpp_request(transport, &req)?;
    let offset = resp.params[1];
    Ok(u32::from(offset.saturating_sub(1)))
}

/// Switch to zero-based profile `index`.
///
/// Retried while the device reports busy, which it does mid-switch.
pub fn write_current_profile(
    transport: &dyn HidTransport,
    device_index: u8,
    feature_index: u8,
    index: u8,
) -> Result<()> {
    let req = HidppRequest::new(device_index, feature_index, 0x03, vec![0x00, index + 1]);
    send_with_retry(transport, &req, MAX_RETRIES)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockTransport;

    const DEV_IDX: u8 = 0x01;
    const PROFILE_IDX: u8 = 0x0A;

    #[test]
    fn reads_description() {
        let mock = MockTransport::new();
        mock.on_long_request(
            DEV_IDX,
            PROFILE_IDX,
            0x01,
            &[],
            &[0x01, 0x05, 0x0B, 0x10],
        );
        let desc = read_description(&mock, DEV_IDX, PROFILE_IDX).unwrap();
        assert_eq!(desc.profile_count, 5);
        assert_eq!(desc.button_count, 11);
        assert_eq!(desc.sector_count, 16);
    }

    #[test]
    fn sets_host_mode() {
        let mock = MockTransport::new();
        mock.on_short_request(DEV_IDX, PROFILE_IDX, 0x11, &[0x01], &[0x01, 0x00, 0x00]);
        set_onboard_mode(&mock, DEV_IDX, PROFILE_IDX, OnboardMode::Host).unwrap();
    }

    #[test]
    fn current_profile_is_offset_minus_one() {
        let mock = MockTransport::new();
        mock.on_short_request(DEV_IDX, PROFILE_IDX, 0x21, &[], &[0x00, 0x03, 0x00]);
        assert_eq!(read_current_profile(&mock, DEV_IDX, PROFILE_IDX).unwrap(), 2);
    }

    #[test]
    fn switch_sends_page_and_offset() {
        let mock = MockTransport::new();
        mock.on_short_request(DEV_IDX, PROFILE_IDX, 0x31, &[0x00, 0x02], &[0x00, 0x00, 0x00]);
        write_current_profile(&mock, DEV_IDX, PROFILE_IDX, 1).unwrap();
        assert_eq!(mock.sent_count(), 1);
    }
}
