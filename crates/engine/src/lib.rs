//! Sourcerust Engine - Game Engine Collaborator Services
//!
//! This crate is the boundary between the scripting platform and the live
//! game engine. It defines the service traits the platform consumes and the
//! production implementation backed by the engine's own structures:
//!
//! - [`GameHelpers`] - team records, networked property lookup, replication
//!   notification, entity references
//! - [`GameSession`] - whether a map is currently running
//! - [`GameConfig`] - symbolic key to game-specific field name mapping
//!
//! # Architecture
//!
//! Services are injected into consumers as trait objects rather than reached
//! through ambient globals. [`HalfLife2`] is the production implementation of
//! [`GameHelpers`] and [`GameSession`]; tests substitute in-memory fakes.
//!
//! # Thread Safety
//!
//! All engine pointers held by [`HalfLife2`] are valid for the server
//! process's lifetime. Mutable state (the team registry, the current map)
//! sits behind `parking_lot` locks so the services can be shared as
//! `Arc<dyn ...>` even though natives only ever run on the game thread.

pub mod error;
pub mod halflife2;
pub mod hash;
pub mod interfaces;

pub use error::EngineError;
pub use halflife2::HalfLife2;
pub use interfaces::{GameConfig, GameHelpers, GameSession, PropInfo, TeamRecord};
