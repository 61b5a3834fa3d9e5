//! The built-in backend registry.

use crate::driver::Backend;
use crate::hidpp10::Hidpp10Backend;
use crate::hidpp20::Hidpp20Backend;

/// Backends in the order [`Context::new`](crate::Context::new) consults them.
pub fn default_backends() -> Vec<Box<dyn Backend>> {
    vec![Box::new(Hidpp20Backend), Box::new(Hidpp10Backend)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{bus, InputId};
    use crate::{pids, LOGITECH_VID};

    fn usb(product: u16) -> InputId {
        InputId {
            bustype: bus::USB,
            vendor: LOGITECH_VID,
            product,
            version: 0,
        }
    }

    #[test]
    fn id_tables_do_not_overlap() {
        let backends = default_backends();
        for product in [
            pids::G502_HERO,
            pids::G502_LIGHTSPEED,
            pids::G502_PROTEUS_SPECTRUM,
            pids::M570,
            pids::G500S,
        ] {
            let claimed: Vec<_> = backends
                .iter()
                .filter(|b| b.recognizes(&usb(product)))
                .map(|b| b.name())
                .collect();
            assert_eq!(claimed.len(), 1, "{product:04x} claimed by {claimed:?}");
        }
        assert!(backends.iter().all(|b| !b.recognizes(&usb(0xC077))));
    }
}
