//! Live engine collaborator backed by the server's own structures
//!
//! [`HalfLife2`] owns the platform's view of the engine: the team record
//! collection (driven by the platform's entity listeners), the current map,
//! and networked-property lookup against the engine's ServerClass list.
//!
//! # Property lookup
//!
//! ```text
//! ServerClass list ──match network name──▶ SendTable
//!                                             │
//!                          linear scan, recursing into data-table props
//!                                             ▼
//!                                  SendProp { offset, array proxy }
//! ```
//!
//! Results are cached per (class, prop) pair; the engine's tables are
//! immutable after server start, so cached entries never go stale.

use std::ffi::{c_char, c_void, CStr};
use std::ptr::NonNull;
use std::sync::OnceLock;

use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::{debug, trace, warn};

use sourcerust_sdk::{
    CBaseHandle, Cell, Edict, SendTable, ServerClass, INVALID_EHANDLE_INDEX, MAX_EDICTS,
};

use crate::error::EngineError;
use crate::hash::combined_hash;
use crate::interfaces::{GameHelpers, GameSession, PropInfo, TeamRecord};

/// Property holding a team's display name in games that have one.
const TEAMNAME_PROP: &str = "m_szTeamname";

/// Virtual function indices for the entity interface chain
///
/// These are platform-specific vtable offsets. The Itanium ABI emits two
/// destructor slots per virtual destructor, MSVC emits one, so the Linux
/// indices sit one higher.
mod vfunc_indices {
    /// IHandleEntity::GetRefEHandle
    #[cfg(target_os = "linux")]
    pub const GET_REF_EHANDLE: usize = 3;
    #[cfg(not(target_os = "linux"))]
    pub const GET_REF_EHANDLE: usize = 2;

    /// IServerUnknown::GetNetworkable
    #[cfg(target_os = "linux")]
    pub const GET_NETWORKABLE: usize = 5;
    #[cfg(not(target_os = "linux"))]
    pub const GET_NETWORKABLE: usize = 4;

    /// IServerNetworkable::GetEdict (no virtual destructor in the interface,
    /// so the index matches on both platforms)
    pub const GET_EDICT: usize = 2;
}

/// Production implementation of [`GameHelpers`] and [`GameSession`].
pub struct HalfLife2 {
    /// Head of the engine's ServerClass linked list.
    server_classes: NonNull<ServerClass>,

    /// Team records in engine insertion order. Slot 0 is usually the
    /// engine's "unassigned" team and may carry no class name.
    teams: RwLock<Vec<TeamRecord>>,

    /// (class, prop) hash -> resolved prop.
    prop_cache: DashMap<u64, PropInfo>,

    /// Resolved team-name field offset; 0 means the game has no team names.
    teamname_offset: OnceLock<i32>,

    /// Currently running map, if any.
    current_map: RwLock<Option<String>>,
}

// SAFETY: server_classes and the pointers inside TeamRecord refer to
// engine-owned structures that live for the entire server process. The
// mutable collections are guarded by locks; raw pointers are only
// dereferenced on the game thread that handed them to us.
unsafe impl Send for HalfLife2 {}
unsafe impl Sync for HalfLife2 {}

impl HalfLife2 {
    /// Wrap the engine's ServerClass list.
    ///
    /// # Safety
    /// `server_classes` must be the head of the engine's class list and
    /// remain valid for the lifetime of the returned value.
    pub unsafe fn new(server_classes: *mut ServerClass) -> Result<Self, EngineError> {
        let server_classes =
            NonNull::new(server_classes).ok_or(EngineError::NullServerClassList)?;

        Ok(Self {
            server_classes,
            teams: RwLock::new(Vec::new()),
            prop_cache: DashMap::new(),
            teamname_offset: OnceLock::new(),
            current_map: RwLock::new(None),
        })
    }

    /// Record a team entity the engine created.
    ///
    /// Called from the platform's entity listeners; `class_name` of `None`
    /// reserves an unused slot (the engine's team indices are positional).
    pub fn register_team(&self, class_name: Option<String>, entity: *mut c_void) {
        let mut teams = self.teams.write();
        trace!(
            "Registered team slot {}: {}",
            teams.len(),
            class_name.as_deref().unwrap_or("<unused>")
        );
        teams.push(TeamRecord { class_name, entity });
    }

    /// Mark a map as running.
    pub fn on_map_start(&self, map_name: &str) {
        debug!("Map started: {}", map_name);
        *self.current_map.write() = Some(map_name.to_string());
    }

    /// Map unloaded: the engine destroys its team entities, so drop the
    /// records that pointed at them.
    pub fn on_map_end(&self) {
        debug!("Map ended, clearing team records");
        self.teams.write().clear();
        *self.current_map.write() = None;
    }

    /// Number of cached property resolutions.
    pub fn cache_size(&self) -> usize {
        self.prop_cache.len()
    }
}

impl GameHelpers for HalfLife2 {
    fn team_count(&self) -> usize {
        self.teams.read().len()
    }

    fn team(&self, index: usize) -> Option<TeamRecord> {
        self.teams.read().get(index).cloned()
    }

    fn teamname_offset(&self) -> i32 {
        if let Some(offset) = self.teamname_offset.get() {
            return *offset;
        }

        // Resolve against the first live team's class. If no team exists yet
        // the capability is unknown, not absent; report 0 without caching so
        // a later call can still resolve.
        let class_name = {
            let teams = self.teams.read();
            match teams.iter().find_map(|t| t.class_name.clone()) {
                Some(name) => name,
                None => return 0,
            }
        };

        let offset = match self.find_in_send_table(&class_name, TEAMNAME_PROP) {
            Some(info) => info.offset,
            None => {
                debug!("{} has no {} prop, team names unavailable", class_name, TEAMNAME_PROP);
                0
            }
        };

        let _ = self.teamname_offset.set(offset);
        *self.teamname_offset.get().unwrap_or(&offset)
    }

    fn team_name(&self, index: usize) -> Option<String> {
        let offset = self.teamname_offset();
        if offset <= 0 {
            return None;
        }

        let record = self.team(index)?;
        if !record.is_valid() || record.entity.is_null() {
            return None;
        }

        // SAFETY: the offset came from the class's own property table and
        // the team entity stays alive while its record is registered. The
        // field is an inline NUL-terminated character array.
        unsafe {
            let name_ptr = record.entity.byte_add(offset as usize) as *const c_char;
            Some(CStr::from_ptr(name_ptr).to_string_lossy().into_owned())
        }
    }

    fn find_in_send_table(&self, class_name: &str, prop_name: &str) -> Option<PropInfo> {
        let cache_key = combined_hash(class_name.as_bytes(), prop_name.as_bytes());
        if let Some(entry) = self.prop_cache.get(&cache_key) {
            trace!(
                "Cache hit for {}::{}: offset={}",
                class_name,
                prop_name,
                entry.offset
            );
            return Some(*entry);
        }

        // SAFETY: server_classes was handed to us as the live list head and
        // the engine never frees it.
        let info = unsafe {
            find_prop_in_class(self.server_classes.as_ptr(), class_name, prop_name)?
        };

        debug!(
            "Resolved {}::{}: offset={}, array={}",
            class_name,
            prop_name,
            info.offset,
            info.array_length_proxy.is_some()
        );

        self.prop_cache.insert(cache_key, info);
        Some(info)
    }

    fn notify_state_changed(&self, entity: *mut c_void, offset: u32) {
        if entity.is_null() {
            return;
        }

        // SAFETY: entity is a live engine object; the vtable chain below is
        // the engine's own IServerUnknown -> IServerNetworkable -> edict path.
        unsafe {
            let networkable = call_get_networkable(entity);
            if networkable.is_null() {
                warn!("Entity {:p} has no networkable, skipping state change", entity);
                return;
            }

            let edict = call_get_edict(networkable);
            if edict.is_null() {
                // Server-only entity, nothing to replicate.
                trace!("Entity {:p} has no edict", entity);
                return;
            }

            (*edict).state_changed();
        }

        trace!("State changed: entity={:p}, offset={}", entity, offset);
    }

    fn entity_to_bcompat_ref(&self, entity: *mut c_void) -> Cell {
        if entity.is_null() {
            return INVALID_EHANDLE_INDEX as Cell;
        }

        // SAFETY: entity is a live engine object carrying the IHandleEntity
        // vtable at its base.
        let handle = unsafe { call_get_ref_ehandle(entity) };

        if !handle.is_valid() {
            return INVALID_EHANDLE_INDEX as Cell;
        }

        if handle.entry_index() < MAX_EDICTS {
            handle.entry_index() as Cell
        } else {
            (handle.raw() | (1u32 << 31)) as Cell
        }
    }
}

impl GameSession for HalfLife2 {
    fn is_map_running(&self) -> bool {
        self.current_map.read().is_some()
    }
}

/// Walk the ServerClass list for `class_name`, then search its table.
///
/// # Safety
/// `head` must be the live list head; every node's name and table pointers
/// must be valid.
unsafe fn find_prop_in_class(
    head: *mut ServerClass,
    class_name: &str,
    prop_name: &str,
) -> Option<PropInfo> {
    let mut current = head;
    while !current.is_null() {
        let class = &*current;
        if let Some(name) = class.network_name() {
            if name.to_string_lossy() == class_name {
                if class.table.is_null() {
                    return None;
                }
                return search_table(class.table, prop_name);
            }
        }
        current = class.next;
    }
    None
}

/// Depth-first search of a SendTable for a prop by name.
///
/// Data-table props are descended into; the first name match wins, with its
/// own offset (offsets in nested tables are relative to the sub-object the
/// engine's proxy exposes, which is what direct field access wants for the
/// flat classes handled here).
///
/// # Safety
/// `table` must be a valid SendTable whose props array is live.
unsafe fn search_table(table: *const SendTable, prop_name: &str) -> Option<PropInfo> {
    for prop in (*table).props() {
        if let Some(name) = prop.var_name() {
            if name.to_string_lossy() == prop_name {
                return Some(PropInfo {
                    offset: prop.offset(),
                    array_length_proxy: prop.array_length_proxy(),
                });
            }
        }

        if let Some(child) = prop.data_table() {
            if let Some(found) = search_table(child, prop_name) {
                return Some(found);
            }
        }
    }
    None
}

/// Call IServerUnknown::GetNetworkable.
///
/// # Safety
/// `entity` must carry the engine entity vtable.
unsafe fn call_get_networkable(entity: *mut c_void) -> *mut c_void {
    let vtable = *(entity as *const *const usize);
    let func_ptr = *vtable.add(vfunc_indices::GET_NETWORKABLE);

    // IServerNetworkable* (*)(IServerUnknown*)
    let func: extern "C" fn(*mut c_void) -> *mut c_void = std::mem::transmute(func_ptr);
    func(entity)
}

/// Call IServerNetworkable::GetEdict.
///
/// # Safety
/// `networkable` must be a valid IServerNetworkable pointer.
unsafe fn call_get_edict(networkable: *mut c_void) -> *mut Edict {
    let vtable = *(networkable as *const *const usize);
    let func_ptr = *vtable.add(vfunc_indices::GET_EDICT);

    // edict_t* (*)(IServerNetworkable*)
    let func: extern "C" fn(*mut c_void) -> *mut Edict = std::mem::transmute(func_ptr);
    func(networkable)
}

/// Call IHandleEntity::GetRefEHandle.
///
/// # Safety
/// `entity` must carry the engine entity vtable.
unsafe fn call_get_ref_ehandle(entity: *mut c_void) -> CBaseHandle {
    let vtable = *(entity as *const *const usize);
    let func_ptr = *vtable.add(vfunc_indices::GET_REF_EHANDLE);

    // const CBaseHandle& (*)(IHandleEntity*)
    let func: extern "C" fn(*mut c_void) -> *const u32 = std::mem::transmute(func_ptr);
    let handle_ptr = func(entity);

    if handle_ptr.is_null() {
        CBaseHandle::invalid()
    } else {
        CBaseHandle::from_raw(*handle_ptr)
    }
}
