//! Per-call handle into the calling plugin
//!
//! String-output natives don't return strings; they write into a buffer the
//! calling script owns, addressed by a cell. The host VM provides the actual
//! memory access, behind this trait.

use sourcerust_sdk::Cell;

use super::error::NativeError;

/// The host VM's view of the calling plugin, for the duration of one native
/// call.
pub trait PluginContext {
    /// Copy `source` into the plugin-local buffer addressed by `local_addr`.
    ///
    /// At most `max_bytes - 1` bytes are written, truncated at a UTF-8
    /// character boundary, followed by a NUL terminator. With `max_bytes` of
    /// zero nothing is written. Never touches memory past the buffer.
    ///
    /// # Returns
    /// The number of string bytes written, excluding the terminator.
    fn string_to_local_utf8(
        &mut self,
        local_addr: Cell,
        max_bytes: usize,
        source: &str,
    ) -> Result<usize, NativeError>;
}

/// Longest prefix of `source` that fits in `max_bytes` without splitting a
/// UTF-8 sequence.
pub fn truncate_utf8(source: &str, max_bytes: usize) -> &str {
    if source.len() <= max_bytes {
        return source;
    }
    let mut end = max_bytes;
    while end > 0 && !source.is_char_boundary(end) {
        end -= 1;
    }
    &source[..end]
}
