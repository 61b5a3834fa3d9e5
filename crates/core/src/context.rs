//! The root object: caller I/O callbacks, logging and the backend registry.

use crate::device::Device;
use crate::driver::{Backend, DeviceToken, Probe};
use crate::drivers;
use crate::error::{Error, Result};
use crate::handle::{Refcounted, UserData, UserDataCell};
use crate::io::DeviceIo;
use crate::log::{self, log_bug, log_debug, log_info, LogHandler, LogPriority};
use crate::transport::HidTransport;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Access mode requested from the open operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    ReadOnly,
    ReadWrite,
}

/// Opens a device node on the library's behalf.
pub type OpenFn = dyn Fn(&str, OpenMode) -> std::io::Result<Box<dyn HidTransport>>;
/// Takes back a node previously returned by an [`OpenFn`].
pub type CloseFn = dyn Fn(Box<dyn HidTransport>);

/// Caller-supplied device node access. Both operations are required.
#[derive(Default)]
pub struct Interface {
    pub open_restricted: Option<Box<OpenFn>>,
    pub close_restricted: Option<Box<CloseFn>>,
}

impl Interface {
    pub fn new(
        open: impl Fn(&str, OpenMode) -> std::io::Result<Box<dyn HidTransport>> + 'static,
        close: impl Fn(Box<dyn HidTransport>) + 'static,
    ) -> Self {
        Self {
            open_restricted: Some(Box::new(open)),
            close_restricted: Some(Box::new(close)),
        }
    }
}

struct ContextInner {
    open: Box<OpenFn>,
    close: Box<CloseFn>,
    log_priority: Cell<LogPriority>,
    log_handler: RefCell<Option<LogHandler>>,
    /// Nesting depth of [`Context::hold_log`].
    log_held: Cell<u32>,
    log_queue: RefCell<Vec<(LogPriority, String)>>,
    user_data: UserDataCell,
    backends: Vec<Box<dyn Backend>>,
}

/// Library context. Cheap to clone; every device keeps one alive.
#[derive(Clone)]
pub struct Context {
    inner: Rc<ContextInner>,
}

impl Context {
    /// Create a context with the built-in backends.
    pub fn new(interface: Interface, user_data: Option<UserData>) -> Result<Self> {
        Self::with_backends(interface, user_data, drivers::default_backends())
    }

    /// Create a context that consults `backends`, in order.
    pub fn with_backends(
        interface: Interface,
        user_data: Option<UserData>,
        backends: Vec<Box<dyn Backend>>,
    ) -> Result<Self> {
        let (Some(open), Some(close)) = (interface.open_restricted, interface.close_restricted)
        else {
            return Err(Error::invalid_argument(
                "interface needs both open and close operations",
            ));
        };

        let mut ctx = Self {
            inner: Rc::new(ContextInner {
                open,
                close,
                log_priority: Cell::new(LogPriority::default()),
                log_handler: RefCell::new(Some(log::stderr_handler())),
                log_held: Cell::new(0),
                log_queue: RefCell::new(Vec::new()),
                user_data: UserDataCell::new(user_data),
                backends: Vec::new(),
            }),
        };

        let registered: Vec<Box<dyn Backend>> = backends
            .into_iter()
            .filter(|backend| {
                if backend.name().is_empty() {
                    log_bug!(ctx, "backend without a name, skipping");
                    return false;
                }
                if backend.id_table().is_empty() {
                    log_bug!(ctx, "backend '{}' has an empty id table", backend.name());
                    return false;
                }
                true
            })
            .collect();

        // Nothing else holds the Rc yet.
        if let Some(inner) = Rc::get_mut(&mut ctx.inner) {
            inner.backends = registered;
        }
        Ok(ctx)
    }

    pub fn user_data(&self) -> Option<UserData> {
        self.inner.user_data.get()
    }

    pub fn user_data_as<T: 'static>(&self) -> Option<Rc<T>> {
        self.inner.user_data.get_as()
    }

    pub fn set_user_data(&self, data: Option<UserData>) {
        self.inner.user_data.set(data);
    }

    pub fn log_priority(&self) -> LogPriority {
        self.inner.log_priority.get()
    }

    pub fn set_log_priority(&self, priority: LogPriority) {
        self.inner.log_priority.set(priority);
    }

    /// Replace the log sink.
    pub fn set_log_handler(&self, handler: LogHandler) {
        *self.inner.log_handler.borrow_mut() = Some(handler);
    }

    /// Drop all log output.
    pub fn clear_log_handler(&self) {
        *self.inner.log_handler.borrow_mut() = None;
    }

    /// Route one message through this context's threshold and handler.
    pub fn log(&self, priority: LogPriority, args: fmt::Arguments<'_>) {
        if priority < self.log_priority() {
            return;
        }
        if self.inner.log_held.get() > 0 {
            self.inner
                .log_queue
                .borrow_mut()
                .push((priority, args.to_string()));
            return;
        }
        self.dispatch(priority, &args.to_string());
    }

    fn dispatch(&self, priority: LogPriority, msg: &str) {
        let handler = self.inner.log_handler.borrow().clone();
        if let Some(handler) = handler {
            handler(priority, msg);
        }
    }

    /// Queue messages instead of calling the handler, until the matching
    /// [`release_log`](Self::release_log). Used while handle state is borrowed.
    pub(crate) fn hold_log(&self) {
        self.inner.log_held.set(self.inner.log_held.get() + 1);
    }

    /// Deliver queued messages once the outermost hold is released.
    pub(crate) fn release_log(&self) {
        let held = self.inner.log_held.get().saturating_sub(1);
        self.inner.log_held.set(held);
        if held > 0 {
            return;
        }
        let queued = std::mem::take(&mut *self.inner.log_queue.borrow_mut());
        for (priority, msg) in queued {
            self.dispatch(priority, &msg);
        }
    }

    /// Names of the registered backends, in probe order.
    pub fn backend_names(&self) -> Vec<String> {
        self.inner
            .backends
            .iter()
            .map(|b| b.name().to_string())
            .collect()
    }

    /// Bind a device to the first backend that accepts it.
    pub fn create_device(&self, token: &DeviceToken) -> Result<Device> {
        let io = DeviceIo::new(self.clone(), &token.devnode);

        for backend in &self.inner.backends {
            if !backend.recognizes(&token.id) {
                continue;
            }
            io.open(OpenMode::ReadWrite)?;
            log_debug!(
                self,
                "{}: probing '{}' with driver '{}'",
                token.devnode,
                token.name,
                backend.name()
            );
            match backend.probe(&io, &token.id) {
                Ok(Probe::Bound(bound)) => {
                    log_debug!(self, "{}: bound to driver '{}'", token.devnode, backend.name());
                    return Ok(Device::bind(self.clone(), token, backend.name(), io, bound));
                }
                Ok(Probe::Declined) => {
                    log_debug!(self, "{}: driver '{}' declined", token.devnode, backend.name());
                }
                Err(e) => {
                    log_info!(
                        self,
                        "{}: driver '{}' failed to probe: {}",
                        token.devnode,
                        backend.name(),
                        e
                    );
                    return Err(e);
                }
            }
        }

        log_debug!(
            self,
            "{}: no driver for '{}' ({})",
            token.devnode,
            token.name,
            token.id
        );
        Err(Error::unsupported(format!(
            "no driver supports '{}' ({})",
            token.name, token.id
        )))
    }

    pub(crate) fn open_restricted(
        &self,
        path: &str,
        mode: OpenMode,
    ) -> std::io::Result<Box<dyn HidTransport>> {
        (self.inner.open)(path, mode)
    }

    pub(crate) fn close_restricted(&self, transport: Box<dyn HidTransport>) {
        (self.inner.close)(transport)
    }
}

impl Refcounted for Context {
    fn ref_count(&self) -> usize {
        Rc::strong_count(&self.inner)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("log_priority", &self.log_priority())
            .field("backends", &self.backend_names())
            .finish()
    }
}
