//! Error type for aborted native calls

use sourcerust_sdk::Cell;

use crate::props::PropError;

/// Why a native call aborted.
///
/// The `Display` text is the message the host VM surfaces to the script
/// author, so the variants carry the exact wording scripts have always seen
/// (with the offending index interpolated where relevant).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NativeError {
    /// Index out of range, or pointing at an unused team slot
    #[error("Team index {0} is invalid")]
    InvalidTeamIndex(Cell),

    /// The engine build lacks team names
    #[error("Team names are not available on this game.")]
    TeamNamesUnavailable,

    /// Mutation attempted outside an active game session
    #[error("Cannot set team score when no map is running")]
    NoMapRunning,

    /// The roster array prop exists but carries no length callback
    #[error("Failed to get player_array length proxy")]
    ArrayLengthUnavailable,

    /// Property key/offset resolution failed
    #[error(transparent)]
    Prop(#[from] PropError),

    /// Dispatch target was never registered
    #[error("Native \"{0}\" is not registered")]
    UnknownNative(String),

    /// Caller passed the wrong number of cells
    #[error("Expected {expected} parameters, got {got}")]
    BadParameterCount { expected: usize, got: usize },

    /// A cell did not name a valid plugin-local buffer
    #[error("Local address {0:#x} is not a valid plugin buffer")]
    InvalidLocalAddress(Cell),
}
