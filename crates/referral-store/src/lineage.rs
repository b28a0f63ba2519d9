//! Lineage Resolver (C3) — walks `referrer_id` up to `max_levels` times and
//! returns a fixed-length, absent-padded ancestor vector.

use referral_core::types::{Lineage, UserId};
use referral_core::ReferralError;

use crate::repo::{self, Tx};

/// Resolves the lineage of `user_id` up to `max_levels` ancestors, nearest
/// first. The returned vector always has exactly `max_levels` entries —
/// positions past the root are `None`.
pub async fn resolve_lineage(
    tx: &mut Tx<'_>,
    user_id: UserId,
    max_levels: u32,
) -> Result<Lineage, ReferralError> {
    let mut levels = Vec::with_capacity(max_levels as usize);
    let mut current = user_id;

    for _ in 0..max_levels {
        match repo::get_user_referrer_id(tx, current).await? {
            Some(parent) => {
                let parent = UserId(parent);
                levels.push(Some(parent));
                current = parent;
            }
            None => levels.push(None),
        }
    }

    Ok(Lineage(levels))
}

#[cfg(test)]
mod tests {
    use sqlx::PgPool;

    use super::*;

    async fn seed_user(pool: &PgPool, username: &str) -> i64 {
        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO users (username, is_treasury) VALUES ($1, false) RETURNING id",
        )
        .bind(username)
        .fetch_one(pool)
        .await
        .unwrap();
        id
    }

    /// Three levels requested, only two ancestors exist: the result is
    /// padded to exactly three entries rather than truncated to two.
    #[sqlx::test(migrations = "../../migrations")]
    async fn pads_short_lineage_to_max_levels(pool: PgPool) {
        let a = seed_user(&pool, "a").await;
        let b = seed_user(&pool, "b").await;
        sqlx::query("UPDATE users SET referrer_id = $1 WHERE id = $2")
            .bind(a)
            .bind(b)
            .execute(&pool)
            .await
            .unwrap();

        let mut tx = pool.begin().await.unwrap();
        let lineage = resolve_lineage(&mut tx, UserId(b), 3).await.unwrap();

        assert_eq!(
            lineage,
            Lineage(vec![Some(UserId(a)), None, None])
        );
    }

    /// A full lineage fills every requested level with an ancestor.
    #[sqlx::test(migrations = "../../migrations")]
    async fn fills_full_lineage(pool: PgPool) {
        let a = seed_user(&pool, "a").await;
        let b = seed_user(&pool, "b").await;
        let c = seed_user(&pool, "c").await;
        sqlx::query("UPDATE users SET referrer_id = $1 WHERE id = $2")
            .bind(a)
            .bind(b)
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("UPDATE users SET referrer_id = $1 WHERE id = $2")
            .bind(b)
            .bind(c)
            .execute(&pool)
            .await
            .unwrap();

        let mut tx = pool.begin().await.unwrap();
        let lineage = resolve_lineage(&mut tx, UserId(c), 2).await.unwrap();

        assert_eq!(lineage, Lineage(vec![Some(UserId(b)), Some(UserId(a))]));
    }
}
