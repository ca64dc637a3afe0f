//! Error types for the completion-signaling registry.
//!
//! Only invalid identifiers are surfaced as errors. Every other misuse the
//! crate absorbs as a no-op: re-adding a check, re-completing a check,
//! completing an unknown check id, removing an unknown listener id.

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Watch names key registry entries and must be non-blank.
    #[error("watch name must be a non-empty string")]
    EmptyWatchName,

    /// Check ids key a watch's checks and must be non-blank.
    #[error("check id must be a non-empty string")]
    EmptyCheckId,
}
