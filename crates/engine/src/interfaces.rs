//! Service traits consumed by the scripting platform
//!
//! The platform never reaches the engine through ambient globals; it holds
//! these traits as injected `Arc<dyn ...>` services. [`HalfLife2`] is the
//! production implementation; tests provide in-memory fakes.
//!
//! [`HalfLife2`]: crate::halflife2::HalfLife2

use std::ffi::c_void;

use sourcerust_sdk::{ArrayLengthSendProxyFn, Cell};

/// One in-game team as tracked by the engine collaborator.
///
/// Records are created and destroyed by the engine; the platform only reads
/// the current collection. A record without a class name is an unused slot
/// and fails index validation.
#[derive(Clone, Debug)]
pub struct TeamRecord {
    /// Network class name (e.g. `CTeam`); `None` marks an invalid slot.
    pub class_name: Option<String>,
    /// The engine-owned team object.
    pub entity: *mut c_void,
}

impl TeamRecord {
    /// An empty, invalid slot.
    pub fn unused() -> Self {
        Self {
            class_name: None,
            entity: std::ptr::null_mut(),
        }
    }

    /// Whether the slot holds a live team.
    pub fn is_valid(&self) -> bool {
        self.class_name.is_some()
    }
}

/// A resolved networked property.
#[derive(Clone, Copy, Debug)]
pub struct PropInfo {
    /// Byte offset of the field within the owning object.
    pub offset: i32,
    /// Length callback for array-style props, if the prop carries one.
    pub array_length_proxy: Option<ArrayLengthSendProxyFn>,
}

/// Engine-interface collaborator: team records, property lookup, replication.
pub trait GameHelpers: Send + Sync {
    /// Current size of the team record collection.
    fn team_count(&self) -> usize;

    /// Team record at `index`, if the index is in range.
    fn team(&self, index: usize) -> Option<TeamRecord>;

    /// Capability flag: byte offset of the team-name field, 0 when the
    /// running game has no team names.
    fn teamname_offset(&self) -> i32;

    /// Name of the team at `index`, when team names are supported.
    fn team_name(&self, index: usize) -> Option<String>;

    /// Search a class's property table (recursing into nested data tables)
    /// for a prop by name.
    fn find_in_send_table(&self, class_name: &str, prop_name: &str) -> Option<PropInfo>;

    /// Tell the engine a replicated object changed at `offset` so the change
    /// is sent to observers.
    fn notify_state_changed(&self, entity: *mut c_void, offset: u32);

    /// Convert an engine object pointer into a backward-compatible script
    /// reference: the entity index for networked entities, the raw handle
    /// with the top bit set otherwise.
    fn entity_to_bcompat_ref(&self, entity: *mut c_void) -> Cell;
}

/// Session-state collaborator.
pub trait GameSession: Send + Sync {
    /// Whether a map is currently running.
    fn is_map_running(&self) -> bool;
}

/// Game-configuration collaborator: maps a symbolic property key (e.g.
/// `m_iScore`) to the field name used by the currently loaded game.
pub trait GameConfig: Send + Sync {
    /// The configured value for `key`, or `None` if the key is not defined
    /// for the running game.
    fn key_value(&self, key: &str) -> Option<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unused_record_is_invalid() {
        let record = TeamRecord::unused();
        assert!(!record.is_valid());
        assert!(record.entity.is_null());
    }

    #[test]
    fn test_named_record_is_valid() {
        let record = TeamRecord {
            class_name: Some("CTeam".into()),
            entity: std::ptr::null_mut(),
        };
        assert!(record.is_valid());
    }
}
