use praxis_common::error::PraxisError;

/// Failures a sync propagates to its caller. Provider quirks that only
/// concern one run (404s, other HTTP failures, misconfigured site URLs)
/// are absorbed inside the syncers and never surface here.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The provider reports a different numeric id than the one recorded
    /// for this repository: the remote was deleted and recreated, or the
    /// link points somewhere else now. Hard error, not retriable.
    #[error(
        "repository identity changed for {owner}/{name}: provider reports id {actual}, recorded id {expected}"
    )]
    IdentityConflict {
        owner: String,
        name: String,
        expected: i64,
        actual: i64,
    },

    /// Network-level failure (DNS, connect, timeout) talking to a provider.
    #[error("transport failure: {0}")]
    Transport(String),

    #[error(transparent)]
    Store(#[from] PraxisError),
}
