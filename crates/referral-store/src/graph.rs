//! Referral Graph Store (C2) — mutates the parent-of relation under
//! anti-cycle and no-overwrite invariants.

use referral_core::constants::CYCLE_WALK_DEPTH_CAP;
use referral_core::types::UserId;
use referral_core::ReferralError;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::repo::{self, Tx};
use crate::retry::with_serializable_tx;

pub struct LinkResult {
    pub child_id: UserId,
    pub parent_id: UserId,
}

/// Links `child` to the referrer identified by `code`.
///
/// Runs at serializable isolation with retry: the ancestor walk and the
/// eventual write must be serialized against a concurrent `assign_referrer`
/// anywhere on the same path, or a cycle could race in.
pub async fn assign_referrer(
    pool: &PgPool,
    child: UserId,
    code: &str,
) -> Result<LinkResult, ReferralError> {
    let code = code.to_string();
    let result = with_serializable_tx(pool, move |tx| {
        let code = code.clone();
        Box::pin(assign_referrer_tx(tx, child, code))
    })
    .await;

    match &result {
        Ok(link) => info!(
            child_id = link.child_id.0,
            parent_id = link.parent_id.0,
            "referrer assigned"
        ),
        Err(ReferralError::SelfReferral) => {
            warn!(child_id = child.0, "referrer assignment rejected: self_referral")
        }
        Err(ReferralError::AlreadyReferred { child }) => {
            warn!(child_id = child, "referrer assignment rejected: already_referred")
        }
        Err(ReferralError::Cycle) => {
            warn!(child_id = child.0, "referrer assignment rejected: cycle")
        }
        Err(_) => {}
    }

    result
}

async fn assign_referrer_tx(
    tx: &mut Tx<'_>,
    child: UserId,
    code: String,
) -> Result<LinkResult, ReferralError> {
    let parent_raw = repo::get_user_id_by_referral_code(tx, &code)
        .await?
        .ok_or_else(|| ReferralError::UnknownCode(code.clone()))?;
    let parent = UserId(parent_raw);

    if parent == child {
        return Err(ReferralError::SelfReferral);
    }

    if repo::get_user_referrer_id(tx, child).await?.is_some() {
        return Err(ReferralError::AlreadyReferred { child: child.0 });
    }

    if walk_visits(tx, parent, child).await? {
        return Err(ReferralError::Cycle);
    }

    let updated = repo::set_referrer_if_unset(tx, child, parent).await?;
    if !updated {
        // Lost a race against another writer between the check above and
        // this statement; the invariant still holds, just report it plainly.
        return Err(ReferralError::AlreadyReferred { child: child.0 });
    }

    Ok(LinkResult {
        child_id: child,
        parent_id: parent,
    })
}

/// Walks ancestors of `start` (inclusive) following `referrer_id`, bounded by
/// `CYCLE_WALK_DEPTH_CAP`. Returns `true` if `target` is visited anywhere on
/// the walk — meaning linking `target` as a descendant of `start` would
/// create a cycle.
async fn walk_visits(tx: &mut Tx<'_>, start: UserId, target: UserId) -> Result<bool, ReferralError> {
    let mut current = start;
    for _ in 0..CYCLE_WALK_DEPTH_CAP {
        if current == target {
            return Ok(true);
        }
        match repo::get_user_referrer_id(tx, current).await? {
            Some(parent) => current = UserId(parent),
            None => return Ok(false),
        }
    }
    Ok(false)
}

/// Returns `user`'s referral code, generating and persisting one if absent.
pub async fn get_or_assign_code(pool: &PgPool, user: UserId) -> Result<String, ReferralError> {
    with_serializable_tx(pool, move |tx| {
        Box::pin(async move { repo::get_or_generate_referral_code(tx, user).await })
    })
    .await
}
