//! Device node access through the context's caller-supplied open/close.

use crate::context::{Context, OpenMode};
use crate::error::{Error, Result};
use crate::log::{hex_dump, log_debug, log_raw};
use crate::transport::HidTransport;
use std::cell::RefCell;

/// The open device node a driver talks through.
///
/// Every report sent or received is dumped at raw log priority. The node is
/// handed back to the context's close operation when this value drops.
pub struct DeviceIo {
    ctx: Context,
    devnode: String,
    transport: RefCell<Option<Box<dyn HidTransport>>>,
}

impl DeviceIo {
    pub(crate) fn new(ctx: Context, devnode: &str) -> Self {
        Self {
            ctx,
            devnode: devnode.to_string(),
            transport: RefCell::new(None),
        }
    }

    /// Open the node if it is not open yet.
    pub fn open(&self, mode: OpenMode) -> Result<()> {
        if self.is_open() {
            return Ok(());
        }
        let transport = self.ctx.open_restricted(&self.devnode, mode).map_err(|e| {
            log_debug!(self.ctx, "{}: failed to open: {}", self.devnode, e);
            Error::Io(e)
        })?;
        *self.transport.borrow_mut() = Some(transport);
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.transport.borrow().is_some()
    }

    pub fn devnode(&self) -> &str {
        &self.devnode
    }

    /// The owning context, for driver-side logging.
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub(crate) fn close(&self) {
        if let Some(transport) = self.transport.borrow_mut().take() {
            self.ctx.close_restricted(transport);
        }
    }
}

impl HidTransport for DeviceIo {
    fn send_report(&self, data: &[u8]) -> Result<Vec<u8>> {
        let transport = self.transport.borrow();
        let transport = transport
            .as_ref()
            .ok_or_else(|| Error::DeviceNotFound(format!("{} is not open", self.devnode)))?;

        log_raw!(self.ctx, "{}: tx {}", self.devnode, hex_dump(data));
        let response = transport.send_report(data)?;
        log_raw!(self.ctx, "{}: rx {}", self.devnode, hex_dump(&response));
        Ok(response)
    }
}

impl Drop for DeviceIo {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for DeviceIo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceIo")
            .field("devnode", &self.devnode)
            .field("open", &self.is_open())
            .finish()
    }
}
