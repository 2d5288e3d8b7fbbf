//! Error types for engine collaborator construction

/// Error type for building the live engine services
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The engine handed us a null ServerClass list head
    #[error("Server class list is null")]
    NullServerClassList,
}
