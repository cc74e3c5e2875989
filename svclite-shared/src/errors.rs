//! Error taxonomy for the remote-service lifecycle protocol.
//!
//! Identity and argument validation fail fast and synchronously; everything
//! downstream of an accepted request (spawn, attach, delivery) fails
//! asynchronously and is surfaced only through the absence of an expected
//! event.

use thiserror::Error;

pub type SvcliteResult<T> = Result<T, SvcliteError>;

#[derive(Debug, Error)]
pub enum SvcliteError {
    /// The calling uid's app id does not own the package it named.
    #[error("package {package} is not owned by app id {app_id}")]
    IdentityMismatch { package: String, app_id: u32 },

    /// The package does not resolve for the caller's user.
    #[error("unable to find package {package} for user {user_id}")]
    PackageNotFound { package: String, user_id: u32 },

    /// Attach presented a token no record is waiting for.
    #[error("unable to find token {0}")]
    UnknownToken(String),

    /// Attach presented the token of a record that already holds a live
    /// handle. The stored handle is never replaced in place.
    #[error("service record {0} is already attached")]
    AlreadyAttached(String),

    /// Launching the service process failed or the starter exited non-zero.
    #[error("spawn failed: {0}")]
    Spawn(String),

    #[error("{0}")]
    Internal(String),
}
