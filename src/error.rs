//! Error type for the command line tool

use pinreclaim_core::reclaim::FailureReason;
use pinreclaim_dummy::ProfileError;

/// Errors reported by `pinreclaim`
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// No profile with that name
    #[error("unknown chip profile '{0}' (see `pinreclaim profiles`)")]
    UnknownProfile(String),

    /// The profile file could not be loaded
    #[error("failed to load chip profiles: {0}")]
    Profile(#[from] ProfileError),

    /// A flash operation failed
    #[error("flash error: {0}")]
    Flash(#[from] pinreclaim_core::Error),

    /// The reclaim sequence ended in a failure state
    #[error("GPIO9 and GPIO10 were not reclaimed: {0}")]
    Reclaim(FailureReason),

    /// At least one diagnostic test failed
    #[error("diagnostic tests failed")]
    TestsFailed,

    /// The chip has no SFDP table
    #[error("chip does not answer SFDP")]
    NoSfdp,
}
