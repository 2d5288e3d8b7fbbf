//! Native registration and dispatch

use std::collections::HashMap;

use slotmap::{new_key_type, SlotMap};

use sourcerust_sdk::Cell;

use super::context::PluginContext;
use super::error::NativeError;

new_key_type! {
    /// Handle for a registered native
    pub struct NativeKey;
}

/// Callback invoked when a script calls the native.
pub type NativeCallback =
    Box<dyn Fn(&mut dyn PluginContext, &[Cell]) -> Result<Cell, NativeError> + Send + Sync>;

/// Registered native information
struct NativeEntry {
    /// Exact native name as scripts call it (e.g. "GetTeamScore")
    name: String,
    /// Callback function
    callback: NativeCallback,
}

/// Table of named natives exposed to the scripting VM.
///
/// Names are exact-match: the VM resolves natives case-sensitively at
/// plugin load.
#[derive(Default)]
pub struct NativeRegistry {
    /// Natives indexed by key
    natives: SlotMap<NativeKey, NativeEntry>,

    /// Lookup by exact name
    by_name: HashMap<String, NativeKey>,
}

impl NativeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a native
    ///
    /// Returns `None` (keeping the existing native) if the name is taken.
    pub fn register(&mut self, name: &str, callback: NativeCallback) -> Option<NativeKey> {
        if self.by_name.contains_key(name) {
            tracing::warn!("Native '{}' already registered", name);
            return None;
        }

        let key = self.natives.insert(NativeEntry {
            name: name.to_string(),
            callback,
        });
        self.by_name.insert(name.to_string(), key);

        tracing::debug!("Registered native: {}", name);
        Some(key)
    }

    /// Unregister a native by key
    pub fn unregister(&mut self, key: NativeKey) -> bool {
        if let Some(entry) = self.natives.remove(key) {
            self.by_name.remove(&entry.name);
            tracing::debug!("Unregistered native: {}", entry.name);
            true
        } else {
            false
        }
    }

    /// Find a native by name
    pub fn find_by_name(&self, name: &str) -> Option<NativeKey> {
        self.by_name.get(name).copied()
    }

    /// Invoke a native by name on behalf of the VM
    pub fn dispatch(
        &self,
        name: &str,
        ctx: &mut dyn PluginContext,
        params: &[Cell],
    ) -> Result<Cell, NativeError> {
        let key = self
            .find_by_name(name)
            .ok_or_else(|| NativeError::UnknownNative(name.to_string()))?;
        (self.natives[key].callback)(ctx, params)
    }

    /// Number of registered natives
    pub fn len(&self) -> usize {
        self.natives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.natives.is_empty()
    }
}
