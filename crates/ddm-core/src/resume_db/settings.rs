//! `Settings(Key PK, Value)` — a flat key/value store for install-wide
//! defaults. Recognized keys are documented in `config::apply_settings_overrides`.

use anyhow::Result;
use sqlx::Row;

use super::db::ResumeDb;

impl ResumeDb {
    /// Reads a setting by key, if present.
    pub async fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM settings WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get::<String, _>("value")))
    }

    /// Writes (or overwrites) a setting.
    pub async fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO settings (key, value) VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Lists all settings as `(key, value)` pairs.
    pub async fn list_settings(&self) -> Result<Vec<(String, String)>> {
        let rows = sqlx::query("SELECT key, value FROM settings ORDER BY key")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|r| (r.get("key"), r.get("value")))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_setting() {
        let db = ResumeDb::open_memory().await.unwrap();
        assert!(db.get_setting("GlobalSpeedLimit").await.unwrap().is_none());
        db.set_setting("GlobalSpeedLimit", "500").await.unwrap();
        assert_eq!(
            db.get_setting("GlobalSpeedLimit").await.unwrap().as_deref(),
            Some("500")
        );
    }

    #[tokio::test]
    async fn set_setting_overwrites() {
        let db = ResumeDb::open_memory().await.unwrap();
        db.set_setting("MaxRetries", "3").await.unwrap();
        db.set_setting("MaxRetries", "7").await.unwrap();
        assert_eq!(
            db.get_setting("MaxRetries").await.unwrap().as_deref(),
            Some("7")
        );
    }

    #[tokio::test]
    async fn list_settings_sorted() {
        let db = ResumeDb::open_memory().await.unwrap();
        db.set_setting("Zeta", "1").await.unwrap();
        db.set_setting("Alpha", "2").await.unwrap();
        let all = db.list_settings().await.unwrap();
        assert_eq!(
            all,
            vec![
                ("Alpha".to_string(), "2".to_string()),
                ("Zeta".to_string(), "1".to_string())
            ]
        );
    }
}
