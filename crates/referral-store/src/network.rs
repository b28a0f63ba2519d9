//! Network Walker (C7) — breadth-first expansion of a user's downline, one
//! level at a time, capped per level rather than globally.

use referral_core::types::{NetworkLevel, NetworkUser, UserId};
use referral_core::ReferralError;
use sqlx::PgPool;

use crate::repo;

/// Walks `root`'s downline for `max_levels`, capping each level's result set
/// at `limit_per_level`. An empty current set short-circuits the remaining
/// levels to empty rather than querying further.
pub async fn downline(
    pool: &PgPool,
    root: UserId,
    max_levels: u32,
    limit_per_level: u32,
) -> Result<Vec<NetworkLevel>, ReferralError> {
    let mut tx = pool.begin().await?;

    let mut levels = Vec::with_capacity(max_levels as usize);
    let mut current_ids = vec![root.0];

    for level in 1..=max_levels {
        if current_ids.is_empty() {
            levels.push(NetworkLevel {
                level,
                users: Vec::new(),
            });
            continue;
        }

        let rows = repo::get_direct_referrals(&mut tx, &current_ids, limit_per_level as i64).await?;
        let users: Vec<NetworkUser> = rows
            .iter()
            .map(|r| NetworkUser {
                user_id: UserId(r.id),
                username: r.username.clone(),
                joined_at: r.created_at,
                referrer_id: r.referrer_id.map(UserId),
            })
            .collect();

        current_ids = rows.iter().map(|r| r.id).collect();
        levels.push(NetworkLevel { level, users });
    }

    tx.rollback().await.ok();
    Ok(levels)
}
