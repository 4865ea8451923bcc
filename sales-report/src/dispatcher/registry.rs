//! SQLite subscriber registry
//!
//! Tables: `users` (chat id, sealed API token, active flag),
//! `user_settings` (notification opt-in, defaults; one row per user) and
//! `request_logs`.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use shared::{ReportError, ReportResult};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

use super::collaborators::{Subscriber, SubscriberRegistry, TenantId, TenantProfile};

fn registry_err(e: sqlx::Error) -> ReportError {
    ReportError::Registry(e.to_string())
}

#[derive(sqlx::FromRow)]
struct ProfileRow {
    id: i64,
    telegram_id: i64,
    phone_number: Option<String>,
    is_active: Option<bool>,
    created_at: Option<NaiveDateTime>,
    last_active: Option<NaiveDateTime>,
    notification_enabled: Option<bool>,
    default_report_type: Option<String>,
    timezone: Option<String>,
}

impl From<ProfileRow> for TenantProfile {
    fn from(row: ProfileRow) -> Self {
        Self {
            user_id: row.id,
            tenant_id: row.telegram_id,
            phone_number: row.phone_number,
            is_active: row.is_active.unwrap_or(true),
            notification_enabled: row.notification_enabled.unwrap_or(false),
            default_report_type: row.default_report_type.unwrap_or_else(|| "today".into()),
            timezone: row.timezone.unwrap_or_else(|| "Europe/Moscow".into()),
            created_at: row.created_at,
            last_active: row.last_active,
        }
    }
}

/// Registry backed by a SQLite pool
#[derive(Clone)]
pub struct SqliteRegistry {
    pool: SqlitePool,
}

impl SqliteRegistry {
    /// Open (creating if missing) and migrate the database at `url`
    pub async fn connect(url: &str) -> ReportResult<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(registry_err)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .pragma("foreign_keys", "ON");

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(registry_err)?;

        let registry = Self::from_pool(pool).await?;
        tracing::info!("Subscriber registry ready");
        Ok(registry)
    }

    /// Private in-memory database
    ///
    /// Limited to one connection; each SQLite memory connection is its own
    /// database.
    pub async fn in_memory() -> ReportResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(registry_err)?;
        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> ReportResult<Self> {
        sqlx::migrate!("./migrations")
            .set_ignore_missing(true)
            .run(&pool)
            .await
            .map_err(|e| ReportError::Registry(format!("Failed to apply migrations: {e}")))?;
        Ok(Self { pool })
    }

    /// Register a tenant with default settings; returns the row id
    pub async fn add_user(&self, tenant: TenantId, phone_number: Option<&str>) -> ReportResult<i64> {
        if let Some(id) = sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE telegram_id = ?")
            .bind(tenant)
            .fetch_optional(&self.pool)
            .await
            .map_err(registry_err)?
        {
            return Ok(id);
        }

        let mut tx = self.pool.begin().await.map_err(registry_err)?;
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO users (telegram_id, phone_number, last_active) VALUES (?, ?, CURRENT_TIMESTAMP) RETURNING id",
        )
        .bind(tenant)
        .bind(phone_number)
        .fetch_one(&mut *tx)
        .await
        .map_err(registry_err)?;
        sqlx::query("INSERT INTO user_settings (user_id) VALUES (?)")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(registry_err)?;
        tx.commit().await.map_err(registry_err)?;

        tracing::info!(tenant = %tenant, "New user added");
        Ok(id)
    }

    /// Store a sealed API token; false when the tenant is unknown
    pub async fn update_token(&self, tenant: TenantId, encrypted_token: &str) -> ReportResult<bool> {
        let result = sqlx::query(
            "UPDATE users SET api_token_encrypted = ?, last_active = CURRENT_TIMESTAMP WHERE telegram_id = ?",
        )
        .bind(encrypted_token)
        .bind(tenant)
        .execute(&self.pool)
        .await
        .map_err(registry_err)?;
        Ok(result.rows_affected() > 0)
    }

    /// Opt a tenant in or out of scheduled reports
    pub async fn set_notifications(&self, tenant: TenantId, enabled: bool) -> ReportResult<bool> {
        let result = sqlx::query(
            "UPDATE user_settings SET notification_enabled = ?, updated_at = CURRENT_TIMESTAMP \
             WHERE user_id = (SELECT id FROM users WHERE telegram_id = ?)",
        )
        .bind(enabled)
        .bind(tenant)
        .execute(&self.pool)
        .await
        .map_err(registry_err)?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl SubscriberRegistry for SqliteRegistry {
    async fn subscribers(&self) -> ReportResult<Vec<Subscriber>> {
        let rows = sqlx::query_as::<_, (i64, String)>(
            "SELECT u.telegram_id, u.api_token_encrypted FROM users u \
             JOIN user_settings us ON u.id = us.user_id \
             WHERE u.is_active = 1 AND us.notification_enabled = 1 \
             AND u.api_token_encrypted IS NOT NULL AND u.api_token_encrypted != '' \
             ORDER BY u.id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(registry_err)?;

        Ok(rows
            .into_iter()
            .map(|(tenant_id, encrypted_credential)| Subscriber {
                tenant_id,
                encrypted_credential,
            })
            .collect())
    }

    async fn profile(&self, tenant: TenantId) -> ReportResult<Option<TenantProfile>> {
        let row = sqlx::query_as::<_, ProfileRow>(
            "SELECT u.id, u.telegram_id, u.phone_number, u.is_active, u.created_at, u.last_active, \
             us.notification_enabled, us.default_report_type, us.timezone \
             FROM users u LEFT JOIN user_settings us ON u.id = us.user_id \
             WHERE u.telegram_id = ?",
        )
        .bind(tenant)
        .fetch_optional(&self.pool)
        .await
        .map_err(registry_err)?;
        Ok(row.map(TenantProfile::from))
    }

    async fn log_request(
        &self,
        tenant: TenantId,
        request_type: &str,
        period: &str,
    ) -> ReportResult<()> {
        let result = sqlx::query(
            "INSERT INTO request_logs (user_id, request_type, period) \
             SELECT id, ?, ? FROM users WHERE telegram_id = ?",
        )
        .bind(request_type)
        .bind(period)
        .bind(tenant)
        .execute(&self.pool)
        .await
        .map_err(registry_err)?;

        if result.rows_affected() == 0 {
            return Err(ReportError::Registry(format!("unknown tenant {tenant}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> SqliteRegistry {
        let registry = SqliteRegistry::in_memory().await.unwrap();
        // 1: subscribed, 2: opted out, 3: no token, 4: subscribed
        for tenant in 1..=4 {
            registry.add_user(tenant, None).await.unwrap();
        }
        registry.update_token(1, "blob-1").await.unwrap();
        registry.update_token(2, "blob-2").await.unwrap();
        registry.update_token(4, "blob-4").await.unwrap();
        for tenant in [1, 3, 4] {
            registry.set_notifications(tenant, true).await.unwrap();
        }
        registry
    }

    #[tokio::test]
    async fn test_subscribers_need_opt_in_and_token() {
        let registry = seeded().await;
        let subs = registry.subscribers().await.unwrap();
        let ids: Vec<_> = subs.iter().map(|s| s.tenant_id).collect();
        assert_eq!(ids, [1, 4]);
        assert_eq!(subs[0].encrypted_credential, "blob-1");
    }

    #[tokio::test]
    async fn test_inactive_users_are_skipped() {
        let registry = seeded().await;
        sqlx::query("UPDATE users SET is_active = 0 WHERE telegram_id = 4")
            .execute(&registry.pool)
            .await
            .unwrap();
        let ids: Vec<_> = registry
            .subscribers()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.tenant_id)
            .collect();
        assert_eq!(ids, [1]);
    }

    #[tokio::test]
    async fn test_add_user_is_idempotent() {
        let registry = SqliteRegistry::in_memory().await.unwrap();
        let first = registry.add_user(42, Some("+70000000000")).await.unwrap();
        let second = registry.add_user(42, None).await.unwrap();
        assert_eq!(first, second);

        let profile = registry.profile(42).await.unwrap().unwrap();
        assert_eq!(profile.user_id, first);
        assert_eq!(profile.phone_number.as_deref(), Some("+70000000000"));
        assert!(profile.is_active);
        assert!(!profile.notification_enabled);
        assert_eq!(profile.default_report_type, "today");
        assert_eq!(profile.timezone, "Europe/Moscow");
        assert!(profile.created_at.is_some());

        assert!(registry.profile(7).await.unwrap().is_none());
        assert!(!registry.update_token(7, "x").await.unwrap());
    }

    #[tokio::test]
    async fn test_settings_are_unique_per_user() {
        let registry = seeded().await;
        let duplicate = sqlx::query(
            "INSERT INTO user_settings (user_id, notification_enabled) \
             SELECT id, 1 FROM users WHERE telegram_id = 1",
        )
        .execute(&registry.pool)
        .await;
        assert!(duplicate.is_err());

        let ids: Vec<_> = registry
            .subscribers()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.tenant_id)
            .collect();
        assert_eq!(ids, [1, 4]);
    }

    #[tokio::test]
    async fn test_migration_collapses_duplicate_settings() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::raw_sql(include_str!("../../migrations/0001_initial.sql"))
            .execute(&pool)
            .await
            .unwrap();
        sqlx::raw_sql(
            "INSERT INTO users (telegram_id, api_token_encrypted) VALUES (5, 'blob-5'); \
             INSERT INTO user_settings (user_id, notification_enabled) VALUES (1, 0); \
             INSERT INTO user_settings (user_id, notification_enabled) VALUES (1, 1);",
        )
        .execute(&pool)
        .await
        .unwrap();

        let registry = SqliteRegistry::from_pool(pool).await.unwrap();
        let subs = registry.subscribers().await.unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].tenant_id, 5);

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_settings")
            .fetch_one(&registry.pool)
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn test_log_request() {
        let registry = seeded().await;
        registry
            .log_request(1, "scheduled_daily", "2024-01-14 - 2024-01-14")
            .await
            .unwrap();

        let (request_type, period): (String, String) =
            sqlx::query_as("SELECT request_type, period FROM request_logs")
                .fetch_one(&registry.pool)
                .await
                .unwrap();
        assert_eq!(request_type, "scheduled_daily");
        assert_eq!(period, "2024-01-14 - 2024-01-14");

        let err = registry.log_request(99, "scheduled_daily", "x").await.unwrap_err();
        assert_eq!(err.code(), "registry");
    }
}
