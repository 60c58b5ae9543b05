//! Thin settings accessors against the `app_settings` table. Re-reads on
//! every call rather than caching — the same re-read-every-call idiom the
//! teacher's risk parameters used, since governance decisions must see a
//! setting flip (e.g. an operator re-enabling automation) immediately.

use sqlx::AnyPool;

pub async fn get_string(pool: &AnyPool, key: &str) -> Option<String> {
    sqlx::query_scalar::<_, String>("SELECT value FROM app_settings WHERE key = $1")
        .bind(key)
        .fetch_optional(pool)
        .await
        .ok()
        .flatten()
}

pub async fn get_bool(pool: &AnyPool, key: &str, default: bool) -> bool {
    match get_string(pool, key).await {
        Some(v) => v.eq_ignore_ascii_case("true"),
        None => default,
    }
}

pub async fn get_i64(pool: &AnyPool, key: &str, default: i64) -> i64 {
    get_string(pool, key).await.and_then(|v| v.parse().ok()).unwrap_or(default)
}

pub async fn get_f64(pool: &AnyPool, key: &str, default: f64) -> f64 {
    get_string(pool, key).await.and_then(|v| v.parse().ok()).unwrap_or(default)
}

pub async fn set_string(pool: &AnyPool, key: &str, value: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO app_settings (key, value, is_secret) VALUES ($1, $2, false)
         ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value",
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;
    Ok(())
}
