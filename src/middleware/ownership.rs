use tracing::warn;

use crate::auth::VerifiedIdentity;
use crate::error::ApiError;

/// Rejects a mutation addressed to another user's namespace.
///
/// Runs before the path id or body is looked at, so a foreign caller learns
/// nothing about whether the target exists.
pub fn ensure_owner(path_username: &str, identity: &VerifiedIdentity) -> Result<(), ApiError> {
    if identity.username() == path_username {
        return Ok(());
    }

    warn!(
        caller = identity.username(),
        owner = path_username,
        "ownership check failed"
    );
    Err(ApiError::forbidden("You do not own this resource"))
}
