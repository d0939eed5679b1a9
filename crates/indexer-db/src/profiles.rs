use sqlx::PgPool;

/// Refreshes the canonical profile view (spec.md §4.9). Operator-triggered,
/// not scheduled by any queue; `CONCURRENTLY` requires the unique index from
/// the `0002_user_profiles` migration and lets readers keep querying the
/// view mid-refresh.
pub async fn refresh_user_profiles(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("refresh materialized view concurrently user_profiles").execute(pool).await?;
    Ok(())
}
