//! The VM boundary
//!
//! Natives are named functions the embedded scripting VM calls with an array
//! of cells, receiving one cell back. Failure is an abort: the native
//! returns a [`NativeError`] whose message the host shows the script author,
//! and the call produces no partial results.
//!
//! - [`registry`] - named native registration and dispatch
//! - [`context`] - the per-call handle into the calling plugin's memory
//! - [`error`] - the abort-with-message channel

pub mod context;
pub mod error;
pub mod registry;

pub use context::{truncate_utf8, PluginContext};
pub use error::NativeError;
pub use registry::{NativeCallback, NativeKey, NativeRegistry};

use sourcerust_sdk::Cell;

/// What a native call produces: one cell, or an abort carrying a message.
pub type NativeResult = Result<Cell, NativeError>;
