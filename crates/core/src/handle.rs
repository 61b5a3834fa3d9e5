//! Shared plumbing for the refcounted handle types.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

/// Opaque caller-owned data attached to a handle.
pub type UserData = Rc<dyn Any>;

/// Interior-mutable user data slot embedded in every handle's shared state.
#[derive(Default)]
pub(crate) struct UserDataCell(RefCell<Option<UserData>>);

impl UserDataCell {
    pub(crate) fn new(data: Option<UserData>) -> Self {
        Self(RefCell::new(data))
    }

    pub(crate) fn get(&self) -> Option<UserData> {
        self.0.borrow().clone()
    }

    pub(crate) fn set(&self, data: Option<UserData>) {
        *self.0.borrow_mut() = data;
    }

    /// Downcast the stored value to `T`, if one is set and has that type.
    pub(crate) fn get_as<T: Any>(&self) -> Option<Rc<T>> {
        self.get().and_then(|data| data.downcast::<T>().ok())
    }
}

impl std::fmt::Debug for UserDataCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let set = self.0.borrow().is_some();
        f.debug_struct("UserData").field("set", &set).finish()
    }
}

/// Reference-count inspection and explicit release, shared by every handle kind.
///
/// Acquiring another reference is `Clone::clone`.
pub trait Refcounted: Clone {
    /// Number of live handle values referring to the same object.
    ///
    /// Internal child caches are not counted.
    fn ref_count(&self) -> usize;

    /// Drop the reference held in `slot`, leaving `None` behind.
    ///
    /// Always returns `None`; releasing an empty slot does nothing.
    fn release(slot: &mut Option<Self>) -> Option<Self> {
        drop(slot.take());
        None
    }
}
