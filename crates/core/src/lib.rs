//! Sourcerust Core - Scripting Platform Logic
//!
//! This crate is the scripting-platform side of the workspace: the boundary
//! types the embedded VM calls through, the typed accessor for networked
//! entity properties, and the team natives built on both.
//!
//! # Re-exports
//!
//! This crate re-exports the SDK and engine crates for convenience:
//! - [`sdk`] - Source engine type definitions
//! - [`engine`] - engine collaborator services

// Re-export SDK and engine crates
pub use sourcerust_engine as engine;
pub use sourcerust_sdk as sdk;

pub mod gamedata;
pub mod logging;
pub mod natives;
pub mod props;
pub mod teams;

// Re-export commonly used items
pub use gamedata::{Gamedata, GamedataError};
pub use natives::{
    truncate_utf8, NativeError, NativeKey, NativeRegistry, NativeResult, PluginContext,
};
pub use props::{PropError, PropField};
pub use teams::{register_team_natives, TeamNatives};
