//! Edict state flags
//!
//! Every networked entity owns an edict, the engine-side slot that tracks
//! replication state. Marking an edict changed is how the server tells the
//! networking layer to re-send the entity's fields to observers.

use std::ffi::c_int;

/// Game DLL sets this when the entity state changes.
pub const FL_EDICT_CHANGED: c_int = 1 << 0;
/// The edict slot is free for reuse.
pub const FL_EDICT_FREE: c_int = 1 << 1;
/// The edict is fully initialized.
pub const FL_EDICT_FULL: c_int = 1 << 2;
/// Always transmit this entity.
pub const FL_EDICT_ALWAYS: c_int = 1 << 3;
/// Don't transmit this entity.
pub const FL_EDICT_DONTSEND: c_int = 1 << 4;
/// Always transmit, but cull against the PVS.
pub const FL_EDICT_PVSCHECK: c_int = 1 << 5;
/// All the entity's fields changed, not a tracked subset.
pub const FL_FULL_EDICT_CHANGED: c_int = 1 << 8;

/// The leading, stable portion of the engine's edict.
///
/// Only the state-flag block is mirrored; everything past it is
/// engine-version dependent and never touched here.
#[repr(C)]
pub struct Edict {
    pub state_flags: c_int,
}

impl Edict {
    /// Mark the edict changed with no per-offset bookkeeping.
    ///
    /// Without the engine's shared change-info block there is nowhere to
    /// record which offset moved, so the edict is flagged fully changed.
    pub fn state_changed(&mut self) {
        self.state_flags |= FL_EDICT_CHANGED | FL_FULL_EDICT_CHANGED;
    }

    /// Whether the slot is free.
    pub fn is_free(&self) -> bool {
        self.state_flags & FL_EDICT_FREE != 0
    }
}
