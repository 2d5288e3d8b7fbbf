//! Lazily-resolved networked property accessor
//!
//! Field locations inside engine objects are discovered at runtime: a
//! symbolic gamedata key (e.g. `m_iScore`) maps to the field name the
//! running game uses, and the class's property table maps that name to a
//! byte offset. [`PropField`] performs both steps once per process and keeps
//! the raw pointer arithmetic confined to its `read`/`write` methods.
//!
//! The offset is shared across every class the field is read from: the
//! first successful resolution wins for the remainder of the process. All
//! team classes lay the field out identically, which is what makes that
//! safe for the natives built on this.

use std::ffi::c_void;
use std::marker::PhantomData;
use std::sync::OnceLock;

use tracing::debug;

use sourcerust_engine::{GameConfig, GameHelpers};

/// Error type for property resolution
///
/// The `Display` text interpolates the symbolic key, matching the messages
/// scripts have always received from the natives built on top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PropError {
    /// The key is not defined for the running game
    #[error("Failed to get {0} key")]
    KeyNotConfigured(&'static str),

    /// The key resolved but no matching prop exists in the class's table
    #[error("Failed to get {0} prop")]
    PropNotFound(&'static str),
}

/// A lazily-resolved accessor for one networked field
///
/// The gamedata key and the byte offset are each resolved on first use and
/// cached in a `OnceLock` for thread-safe, lock-free subsequent access.
///
/// # Type Parameters
/// * `T` - The field type. Must be `Copy` for safe read/write through raw
///   pointers.
pub struct PropField<T: Copy> {
    /// Symbolic gamedata key, e.g. "m_iScore"
    key: &'static str,
    /// Game-specific field name the key resolved to
    field_name: OnceLock<String>,
    /// Byte offset within the owning object
    offset: OnceLock<i32>,
    _marker: PhantomData<T>,
}

impl<T: Copy> PropField<T> {
    /// Create a field accessor; nothing is resolved until first use.
    pub const fn new(key: &'static str) -> Self {
        Self {
            key,
            field_name: OnceLock::new(),
            offset: OnceLock::new(),
            _marker: PhantomData,
        }
    }

    /// The symbolic gamedata key.
    pub const fn key(&self) -> &'static str {
        self.key
    }

    /// Whether the offset has been resolved.
    pub fn is_resolved(&self) -> bool {
        self.offset.get().is_some()
    }

    /// The resolved offset, if resolution already happened.
    pub fn try_offset(&self) -> Option<i32> {
        self.offset.get().copied()
    }

    /// Resolve the field offset (cached after the first success).
    ///
    /// `class_name` identifies the property table to search; once any class
    /// resolves the field, the cached offset is reused for all of them.
    pub fn resolve(
        &self,
        conf: &dyn GameConfig,
        helpers: &dyn GameHelpers,
        class_name: &str,
    ) -> Result<i32, PropError> {
        if let Some(offset) = self.offset.get() {
            return Ok(*offset);
        }

        let field_name = match self.field_name.get() {
            Some(name) => name.clone(),
            None => {
                let name = conf
                    .key_value(self.key)
                    .ok_or(PropError::KeyNotConfigured(self.key))?;
                // Another thread may have set it first, that's ok
                let _ = self.field_name.set(name.clone());
                name
            }
        };

        let info = helpers
            .find_in_send_table(class_name, &field_name)
            .ok_or(PropError::PropNotFound(self.key))?;

        debug!(
            "Resolved {} ({}) on {}: offset={}",
            self.key, field_name, class_name, info.offset
        );

        let _ = self.offset.set(info.offset);
        Ok(*self.offset.get().unwrap_or(&info.offset))
    }

    /// Read the field from an object.
    ///
    /// # Panics
    /// Panics if the field has not been resolved.
    ///
    /// # Safety
    /// - `base` must be a valid pointer to an object whose class resolved
    ///   this field (or lays it out identically)
    /// - `T` must match the actual field type
    /// - The object must remain valid for the duration of the read
    #[inline]
    pub unsafe fn read(&self, base: *const c_void) -> T {
        debug_assert!(!base.is_null(), "Null object pointer");
        let offset = self.offset.get().expect("prop field not resolved");
        let ptr = base.byte_add(*offset as usize) as *const T;
        ptr.read()
    }

    /// Write the field on an object.
    ///
    /// The caller must notify the engine of the change afterwards for it to
    /// replicate.
    ///
    /// # Panics
    /// Panics if the field has not been resolved.
    ///
    /// # Safety
    /// Same requirements as [`read`](Self::read), plus exclusive access to
    /// the field for the duration of the write.
    #[inline]
    pub unsafe fn write(&self, base: *mut c_void, value: T) {
        debug_assert!(!base.is_null(), "Null object pointer");
        let offset = self.offset.get().expect("prop field not resolved");
        let ptr = base.byte_add(*offset as usize) as *mut T;
        ptr.write(value);
    }
}
