//! Opaque handle allocation shared by every suite.
//!
//! A [`Handle`] is a pointer-width integer the plugin holds on to and passes
//! back. It never dereferences anything on the host side: it is only a key
//! into the [`HandleRegistry`] that issued it. Value `0` is reserved for the
//! null/empty handle.
//!
//! Handles come from a strictly monotonic counter, so a handle value is never
//! issued twice by the same registry, even after the object it named is gone.

use crate::error::{Result, SuiteError};
use std::collections::HashMap;
use std::fmt;

/// ABI-stable opaque handle.
///
/// `#[repr(transparent)]` over `usize`, so it travels through `extern "C"`
/// signatures exactly like the pointer-sized handle the plugin expects, and
/// the null handle compares equal to a zero-valued native handle.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Handle(usize);

impl Handle {
    /// The reserved null/empty handle.
    pub const NULL: Handle = Handle(0);

    /// Wrap a raw value received from native code.
    pub const fn from_raw(raw: usize) -> Self {
        Handle(raw)
    }

    /// The raw value handed to native code.
    pub const fn into_raw(self) -> usize {
        self.0
    }

    /// Whether this is the reserved null/empty handle.
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "Handle(null)")
        } else {
            write!(f, "Handle({:#x})", self.0)
        }
    }
}

/// Keyed table of host-owned objects addressed by [`Handle`].
pub struct HandleRegistry<T> {
    /// Suite name, used in log output.
    name: &'static str,
    entries: HashMap<Handle, T>,
    /// Last handle value issued.
    counter: usize,
}

impl<T> HandleRegistry<T> {
    /// Create an empty registry.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: HashMap::new(),
            counter: 0,
        }
    }

    /// Produce a handle distinct from every handle this registry has issued.
    pub fn generate(&mut self) -> Result<Handle> {
        let next = self.counter.checked_add(1).ok_or(SuiteError::OutOfMemory)?;
        self.counter = next;
        Ok(Handle(next))
    }

    /// Store `value` under `handle`.
    ///
    /// Null handles and handles already naming a live object are rejected.
    pub fn insert(&mut self, handle: Handle, value: T) -> Result<()> {
        if handle.is_null() {
            return Err(SuiteError::BadParameter("null handle"));
        }
        if self.entries.contains_key(&handle) {
            tracing::warn!(registry = self.name, ?handle, "handle already live");
            return Err(SuiteError::BadParameter("handle already live"));
        }
        self.entries.insert(handle, value);
        tracing::trace!(registry = self.name, ?handle, "handle registered");
        Ok(())
    }

    /// Generate a fresh handle and store `value` under it.
    pub fn allocate(&mut self, value: T) -> Result<Handle> {
        let handle = self.generate()?;
        self.insert(handle, value)?;
        Ok(handle)
    }

    /// Look up a live object.
    pub fn get(&self, handle: Handle) -> Result<&T> {
        match self.entries.get(&handle) {
            Some(value) => Ok(value),
            None => Err(self.miss(handle)),
        }
    }

    /// Look up a live object for mutation.
    pub fn get_mut(&mut self, handle: Handle) -> Result<&mut T> {
        let name = self.name;
        match self.entries.get_mut(&handle) {
            Some(value) => Ok(value),
            None => {
                tracing::warn!(registry = name, ?handle, "unknown handle");
                Err(SuiteError::BadParameter("unknown handle"))
            }
        }
    }

    /// Remove a live object and hand it back.
    pub fn remove(&mut self, handle: Handle) -> Result<T> {
        match self.entries.remove(&handle) {
            Some(value) => {
                tracing::trace!(registry = self.name, ?handle, "handle released");
                Ok(value)
            }
            None => Err(self.miss(handle)),
        }
    }

    /// Whether `handle` names a live object.
    pub fn contains(&self, handle: Handle) -> bool {
        self.entries.contains_key(&handle)
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no objects are live.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn miss(&self, handle: Handle) -> SuiteError {
        tracing::warn!(registry = self.name, ?handle, "unknown handle");
        SuiteError::BadParameter("unknown handle")
    }
}

impl<T> fmt::Debug for HandleRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleRegistry")
            .field("name", &self.name)
            .field("live", &self.entries.len())
            .field("counter", &self.counter)
            .finish()
    }
}
