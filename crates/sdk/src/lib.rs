//! Sourcerust SDK - Source Engine Type Definitions
//!
//! This crate contains type definitions for the Source engine structures the
//! platform touches: the networked property description tables (SendTables),
//! the edict state block, and entity handles. It has no dependencies and
//! compiles quickly, allowing parallel compilation of dependent crates.
//!
//! # Modules
//!
//! - [`dt_send`] - SendTable/SendProp property description mirrors
//! - [`edict`] - edict state flags
//! - [`handle`] - 32-bit entity handles

pub mod dt_send;
pub mod edict;
pub mod handle;

pub use dt_send::*;
pub use edict::*;
pub use handle::*;

/// A single scripting-VM cell.
///
/// Every native receives its arguments as cells and returns one cell.
pub type Cell = i32;
