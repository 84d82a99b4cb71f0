//! Authorization guards. Each decides whether the acting session may reach a
//! handler's effect; denials never distinguish "forbidden" from "missing".

use tracing::warn;

use super::extractors::Session;
use crate::repo::{self, Repository, RequestId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Denied {
    #[error("You must be signed in to do that.")]
    SignInRequired,
    #[error("This page does not exist.")]
    NotFound,
    #[error("You are already signed in.")]
    SignedIn,
}

pub fn require_login(session: &Session) -> Result<UserId, Denied> {
    session.user_id().ok_or(Denied::SignInRequired)
}

pub fn require_anonymous(session: &Session) -> Result<(), Denied> {
    match session.user_id() {
        Some(_) => Err(Denied::SignedIn),
        None => Ok(()),
    }
}

/// Path ids must be all digits; anything else is treated as not found.
pub fn parse_id(raw: &str) -> Option<i32> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

/// Resolves a path-supplied user id to an existing user.
pub async fn existing_user(repo: &dyn Repository, raw_id: &str) -> repo::Result<Option<UserId>> {
    let Some(id) = parse_id(raw_id) else {
        warn!(raw_id, "non-numeric user id");
        return Ok(None);
    };
    if repo.user_exists(id).await? {
        Ok(Some(id))
    } else {
        warn!(user_id = id, "unknown user id");
        Ok(None)
    }
}

/// Resolves a path-supplied request id to a request sent by `user_id`.
/// Requests that do not exist are refused the same way as foreign ones.
pub async fn owned_request(
    repo: &dyn Repository,
    user_id: UserId,
    raw_id: &str,
) -> repo::Result<Option<RequestId>> {
    let Some(id) = parse_id(raw_id) else {
        return Ok(None);
    };
    if repo.user_owns_request(user_id, id).await? {
        Ok(Some(id))
    } else {
        warn!(user_id, request_id = id, "request not owned by user");
        Ok(None)
    }
}

pub async fn owned_skill(
    repo: &dyn Repository,
    user_id: UserId,
    skill_name: &str,
) -> repo::Result<bool> {
    let owned = repo.user_has_skill(user_id, skill_name).await?;
    if !owned {
        warn!(user_id, skill_name, "skill not on user's list");
    }
    Ok(owned)
}
