//! SendTable property description mirrors
//!
//! Every networked entity class exposes a `ServerClass` carrying a
//! `SendTable`: a flat array of `SendProp` descriptors the engine uses to
//! replicate object state. Data-table props nest child tables, so a class's
//! full property set is a tree rooted at its ServerClass.
//!
//! These are `repr(C)` mirrors of the engine's `dt_send.h` layout. They are
//! only ever read through pointers handed out by the engine; nothing here is
//! allocated on the engine's behalf.

use std::ffi::{c_char, c_int, c_void, CStr};

/// Length-computation callback attached to array-style props.
///
/// The engine invokes this with the owning object to learn the current
/// element count (e.g. how many players a team's `player_array` holds).
pub type ArrayLengthSendProxyFn =
    unsafe extern "C" fn(instance: *const c_void, object_id: c_int) -> c_int;

/// SendProp variable types, matching the engine's `SendPropType` enum.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendPropType {
    Int = 0,
    Float,
    Vector,
    VectorXy,
    String,
    Array,
    DataTable,
}

/// A single networked property descriptor.
///
/// # Layout
///
/// Field-for-field mirror of the engine's `SendProp` (which carries a vtable
/// pointer for its virtual destructor). `props` in a [`SendTable`] is a
/// contiguous array of these, so the size must match the engine's exactly.
#[repr(C)]
pub struct SendProp {
    /// Virtual destructor slot.
    pub vtable: *const c_void,
    /// Matching receive-side prop (unused server-side).
    pub matching_recv_prop: *mut c_void,
    pub prop_type: SendPropType,
    pub bits: c_int,
    pub low_value: f32,
    pub high_value: f32,
    /// Element descriptor for array props.
    pub array_prop: *mut SendProp,
    /// Length callback for array props; null for scalar props.
    pub array_length_proxy: Option<ArrayLengthSendProxyFn>,
    pub elements: c_int,
    pub element_stride: c_int,
    pub exclude_dt_name: *const c_char,
    pub parent_array_prop_name: *const c_char,
    /// Property name, e.g. `m_iScore`.
    pub var_name: *const c_char,
    pub high_low_mul: f32,
    pub flags: c_int,
    /// Send proxy (value transform) callback.
    pub proxy_fn: *const c_void,
    pub data_table_proxy_fn: *const c_void,
    /// Child table for data-table props; null otherwise.
    pub data_table: *mut SendTable,
    /// Byte offset of the field within the owning object.
    pub offset: c_int,
    pub extra_data: *const c_void,
}

impl SendProp {
    /// Property name, if the engine set one.
    ///
    /// # Safety
    /// `self` must point at a live engine SendProp (or a test fixture whose
    /// `var_name` is null or a valid NUL-terminated string).
    pub unsafe fn var_name(&self) -> Option<&CStr> {
        if self.var_name.is_null() {
            None
        } else {
            Some(CStr::from_ptr(self.var_name))
        }
    }

    /// Byte offset of the field within the owning object.
    pub fn offset(&self) -> i32 {
        self.offset
    }

    /// Child table for data-table props.
    pub fn data_table(&self) -> Option<*mut SendTable> {
        if self.data_table.is_null() {
            None
        } else {
            Some(self.data_table)
        }
    }

    /// Length callback for array props.
    pub fn array_length_proxy(&self) -> Option<ArrayLengthSendProxyFn> {
        self.array_length_proxy
    }
}

impl Default for SendProp {
    /// An all-null scalar prop. Test fixtures start from this; the engine
    /// never constructs props through this crate.
    fn default() -> Self {
        Self {
            vtable: std::ptr::null(),
            matching_recv_prop: std::ptr::null_mut(),
            prop_type: SendPropType::Int,
            bits: 0,
            low_value: 0.0,
            high_value: 0.0,
            array_prop: std::ptr::null_mut(),
            array_length_proxy: None,
            elements: 1,
            element_stride: 0,
            exclude_dt_name: std::ptr::null(),
            parent_array_prop_name: std::ptr::null(),
            var_name: std::ptr::null(),
            high_low_mul: 0.0,
            flags: 0,
            proxy_fn: std::ptr::null(),
            data_table_proxy_fn: std::ptr::null(),
            data_table: std::ptr::null_mut(),
            offset: 0,
            extra_data: std::ptr::null(),
        }
    }
}

/// A class's flat property table.
#[repr(C)]
pub struct SendTable {
    /// Contiguous array of `props_count` descriptors.
    pub props: *mut SendProp,
    pub props_count: c_int,
    /// Network table name, e.g. `DT_Team`.
    pub net_table_name: *const c_char,
    /// Precalculated send data (engine internal).
    pub precalc: *mut c_void,
}

impl SendTable {
    /// Iterate the table's props.
    ///
    /// # Safety
    /// `self` must describe a live table: `props` valid for `props_count`
    /// elements of the engine's SendProp layout.
    pub unsafe fn props(&self) -> impl Iterator<Item = &SendProp> {
        let count = self.props_count.max(0) as usize;
        // SAFETY: caller guaranteed props is valid for count elements
        (0..count).map(move |i| unsafe { &*self.props.add(i) })
    }
}

impl Default for SendTable {
    fn default() -> Self {
        Self {
            props: std::ptr::null_mut(),
            props_count: 0,
            net_table_name: std::ptr::null(),
            precalc: std::ptr::null_mut(),
        }
    }
}

/// One entry in the engine's linked list of networked classes.
#[repr(C)]
pub struct ServerClass {
    /// Network class name, e.g. `CTeam`.
    pub network_name: *const c_char,
    pub table: *mut SendTable,
    pub next: *mut ServerClass,
    pub class_id: c_int,
    pub instance_baseline_index: c_int,
}

impl ServerClass {
    /// Network class name.
    ///
    /// # Safety
    /// `self` must point at a live engine ServerClass (or a fixture whose
    /// `network_name` is null or a valid NUL-terminated string).
    pub unsafe fn network_name(&self) -> Option<&CStr> {
        if self.network_name.is_null() {
            None
        } else {
            Some(CStr::from_ptr(self.network_name))
        }
    }
}

impl Default for ServerClass {
    fn default() -> Self {
        Self {
            network_name: std::ptr::null(),
            table: std::ptr::null_mut(),
            next: std::ptr::null_mut(),
            class_id: 0,
            instance_baseline_index: 0,
        }
    }
}
