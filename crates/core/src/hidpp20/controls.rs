//! Button remapping via the REPROG_CONTROLS_V4 feature (0x1B04).
//!
//! Functions:
//!   - 0: getCount → params[0] = number of reprogrammable controls
//!   - 1: getControlInfo(index) → CID, task id, flags
//!   - 2: getControlReporting(CID) → current remap target
//!   - 3: setControlReporting(CID, flags, remap)
//!
//! Control IDs (CIDs) are 16-bit identifiers for each physical button. A
//! control is remapped by pointing it at another control's CID.

use crate::action::{Action, SpecialAction};
use crate::button::ButtonType;
use crate::error::{Error, Result};
use crate::hidpp::{features, HidppRequest};
use crate::transport::{hidpp_request, HidTransport};

/// Well-known control ids.
pub mod cids {
    pub const NO_ACTION: u16 = 0x0000;
    pub const DPI_UP: u16 = 0x004D;
    pub const DPI_DOWN: u16 = 0x004E;
    pub const LEFT_CLICK: u16 = 0x0050;
    pub const RIGHT_CLICK: u16 = 0x0051;
    pub const MIDDLE_CLICK: u16 = 0x0052;
    pub const BACK: u16 = 0x0053;
    pub const FORWARD: u16 = 0x0056;
}

/// setControlReporting flag: apply the remap field.
const FLAG_REMAP: u8 = 0x10;

/// One reprogrammable control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlInfo {
    pub cid: u16,
    /// Default task of the control.
    pub task_id: u16,
    pub flags: u8,
}

impl ControlInfo {
    pub fn button_type(&self) -> ButtonType {
        match self.cid {
            cids::LEFT_CLICK => ButtonType::Left,
            cids::RIGHT_CLICK => ButtonType::Right,
            cids::MIDDLE_CLICK => ButtonType::Middle,
            cids::BACK => ButtonType::Side,
            cids::FORWARD => ButtonType::Extra,
            cids::DPI_UP => ButtonType::ResolutionUp,
            cids::DPI_DOWN => ButtonType::ResolutionDown,
            _ => ButtonType::Unknown,
        }
    }
}

/// The action a control performs when it reports as `cid`.
pub fn cid_to_action(cid: u16) -> Action {
    match cid {
        cids::LEFT_CLICK => Action::Button(1),
        cids::RIGHT_CLICK => Action::Button(2),
        cids::MIDDLE_CLICK => Action::Button(3),
        cids::BACK => Action::Button(4),
        cids::FORWARD => Action::Button(5),
        cids::DPI_UP => Action::Special(SpecialAction::ResolutionUp),
        cids::DPI_DOWN => Action::Special(SpecialAction::ResolutionDown),
        _ => Action::Unknown,
    }
}

/// The CID a control must be remapped to for `action`.
pub fn action_to_cid(action: &Action) -> Result<u16> {
    let cid = match action {
        Action::Button(1) => cids::LEFT_CLICK,
        Action::Button(2) => cids::RIGHT_CLICK,
        Action::Button(3) => cids::MIDDLE_CLICK,
        Action::Button(4) => cids::BACK,
        Action::Button(5) => cids::FORWARD,
        Action::Special(SpecialAction::ResolutionUp) => cids::DPI_UP,
        Action::Special(SpecialAction::ResolutionDown) => cids::DPI_DOWN,
        other => {
            return Err(Error::unsupported(format!(
                "'{other}' cannot be assigned to a reprogrammable control"
            )))
        }
    };
    Ok(cid)
}

pub fn read_control_count(
    transport: &dyn HidTransport,
    device_index: u8,
    feature_index: u8,
) -> Result<u8> {
    let req = HidppRequest::new(device_index, feature_index, 0x00, vec![]);
    let resp = hidpp_request(transport, &req)?;
    Ok(resp.params[0])
}

pub fn read_control_info(
    transport: &dyn HidTransport,
    device_index: u8,
    feature_index: u8,
    index: u8,
) -> Result<ControlInfo> {
    let req = HidppRequest::new(device_index, feature_index, 0x01, vec![index]);
    let resp = hidpp_request(transport, &req)?;

    if resp.params.len() < 5 {
        return Err(Error::HidppProtocol {
            feature: features::REPROG_CONTROLS_V4,
            code: 0xFE,
        });
    }

    Ok(ControlInfo {
        cid: u16::from_be_bytes([resp.params[0], resp.params[1]]),
        task_id: u16::from_be_bytes([resp.params[2], resp.params[3]]),
        flags: resp.params[4],
    })
}

/// Every reprogrammable control, in device order.
pub fn read_controls(
    transport: &dyn HidTransport,
    device_index: u8,
    feature_index: u8,
) -> Result<Vec<ControlInfo>> {
    let count = read_control_count(transport, device_index, feature_index)?;
    (0..count)
        .map(|i| read_control_info(transport, device_index, feature_index, i))
        .collect()
}

/// The CID `cid` currently reports as; itself when not remapped.
pub fn read_remap(
    transport: &dyn HidTransport,
    device_index: u8,
    feature_index: u8,
    cid: u16,
) -> Result<u16> {
    let [hi, lo] = cid.to_be_bytes();
    let req = HidppRequest::new(device_index, feature_index, 0x02, vec![hi, lo]);
    let resp = hidpp_request(transport, &req)?;

    // params: CID[0..2], flags[2], remap[3..5]
    let remap = if resp.params.len() >= 5 {
        u16::from_be_bytes([resp.params[3], resp.params[4]])
    } else {
        cids::NO_ACTION
    };
    Ok(if remap == cids::NO_ACTION { cid } else { remap })
}

pub fn write_remap(
    transport: &dyn HidTransport,
    device_index: u8,
    feature_index: u8,
    cid: u16,
    remap: u16,
) -> Result<()> {
    let [cid_hi, cid_lo] = cid.to_be_bytes();
    let [remap_hi, remap_lo] = remap.to_be_bytes();
    let req = HidppRequest::new(
        device_index,
        feature_index,
        0x03,
        vec![cid_hi, cid_lo, FLAG_REMAP, remap_hi, remap_lo],
    );
    hidpp_request(transport, &req)?;
    Ok(())
}
