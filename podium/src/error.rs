//! Error types for lifecycle and conductor operations.

use thiserror::Error;

/// Error type carried out of user-overridable lifecycle hooks.
///
/// Hooks may fail with any error; the framework never swallows them. It only
/// guards its own bookkeeping (completion signalling) so a failed hook cannot
/// strand a sibling transition that is awaiting this one.
pub type ScreenError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Configuration errors raised by the conductor machinery itself.
///
/// These are invalid-operation failures, fatal to the calling operation and
/// never recovered internally. Guard rejection and cancellation are *not*
/// errors; they are reported through return values and observable state.
#[derive(Debug, Error)]
pub enum ConductorError {
    /// A screen with no conductor parent has no generic way to close itself.
    #[error("screen has no conductor parent to close through")]
    NoParent,

    /// The item is not conducted by the conductor it was handed to.
    #[error("item is not conducted by this conductor")]
    NotOwned,

    /// The parent conductor was dropped while the child still linked to it.
    #[error("parent conductor no longer exists")]
    ParentGone,
}
