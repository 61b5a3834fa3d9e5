//! hidraw access through hidapi: the open/close interface and device tokens.

use ratbag_core::driver::bus;
use ratbag_core::{DeviceToken, Error, HidTransport, InputId, Interface, OpenMode};
use std::ffi::CString;
use std::rc::Rc;

const READ_TIMEOUT_MS: i32 = 1000;
/// Unrelated input reports tolerated before giving up on a response.
const MAX_STRAY_REPORTS: usize = 8;

pub struct HidapiTransport {
    device: hidapi::HidDevice,
}

impl HidTransport for HidapiTransport {
    fn send_report(&self, data: &[u8]) -> ratbag_core::Result<Vec<u8>> {
        self.device
            .write(data)
            .map_err(|e| Error::Hid(format!("write: {e}")))?;

        let mut response = [0u8; 64];
        for _ in 0..MAX_STRAY_REPORTS {
            let n = self
                .device
                .read_timeout(&mut response, READ_TIMEOUT_MS)
                .map_err(|e| Error::Hid(format!("read_timeout: {e}")))?;
            if n == 0 {
                return Err(Error::Timeout(format!(
                    "hid_read timed out after {READ_TIMEOUT_MS}ms"
                )));
            }
            // mouse motion and key reports share the node
            if n >= 2 && matches!(response[0], 0x10 | 0x11) && response[1] == data[1] {
                return Ok(response[..n].to_vec());
            }
            tracing::trace!("skipping stray report {:02X?}", &response[..n]);
        }
        Err(Error::Timeout("no HID++ response among input reports".to_string()))
    }
}

/// Interface opening hidraw nodes by path.
pub fn interface(api: Rc<hidapi::HidApi>) -> Interface {
    Interface::new(
        move |path, _mode: OpenMode| {
            let cpath = CString::new(path).map_err(std::io::Error::other)?;
            let device = api.open_path(&cpath).map_err(|e| {
                std::io::Error::other(format!("open {path}: {e}"))
            })?;
            Ok(Box::new(HidapiTransport { device }) as Box<dyn HidTransport>)
        },
        // hidapi closes the node when the handle drops
        drop,
    )
}

/// Tokens for every hidraw node hidapi can see.
pub fn tokens(api: &hidapi::HidApi) -> Vec<DeviceToken> {
    api.device_list()
        .map(|info| {
            let bustype = match info.bus_type() {
                hidapi::BusType::Bluetooth => bus::BLUETOOTH,
                _ => bus::USB,
            };
            DeviceToken {
                name: info
                    .product_string()
                    .unwrap_or("Unknown device")
                    .to_string(),
                devnode: info.path().to_string_lossy().into_owned(),
                id: InputId {
                    bustype,
                    vendor: info.vendor_id(),
                    product: info.product_id(),
                    version: info.release_number(),
                },
            }
        })
        .collect()
}

/// The token for `path`, which must name a node hidapi enumerates.
pub fn token_for(api: &hidapi::HidApi, path: &str) -> anyhow::Result<DeviceToken> {
    tokens(api)
        .into_iter()
        .find(|token| token.devnode == path)
        .ok_or_else(|| anyhow::anyhow!("{path}: no such HID device"))
}
