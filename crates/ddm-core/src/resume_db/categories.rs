//! `Categories(Id, Name, Extensions CSV, MimeTypes CSV, SaveFolder)`.

use anyhow::Result;
use sqlx::Row;

use super::db::ResumeDb;
use super::types::CategoryRecord;

fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl ResumeDb {
    /// Creates a new category, returning its id.
    pub async fn add_category(
        &self,
        name: &str,
        extensions: &[String],
        mime_types: &[String],
        save_folder: Option<&str>,
    ) -> Result<i64> {
        let id = sqlx::query(
            r#"
            INSERT INTO categories (name, extensions, mime_types, save_folder)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(name)
        .bind(extensions.join(","))
        .bind(mime_types.join(","))
        .bind(save_folder)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();
        Ok(id)
    }

    /// Lists all categories.
    pub async fn list_categories(&self) -> Result<Vec<CategoryRecord>> {
        let rows = sqlx::query(
            "SELECT id, name, extensions, mime_types, save_folder FROM categories ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| CategoryRecord {
                id: row.get("id"),
                name: row.get("name"),
                extensions: split_csv(&row.get::<String, _>("extensions")),
                mime_types: split_csv(&row.get::<String, _>("mime_types")),
                save_folder: row.get("save_folder"),
            })
            .collect())
    }

    /// Removes a category by id.
    pub async fn remove_category(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM categories WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn add_and_list_category() {
        let db = ResumeDb::open_memory().await.unwrap();
        let id = db
            .add_category(
                "Videos",
                &["mp4".to_string(), "mkv".to_string()],
                &["video/mp4".to_string()],
                Some("/home/user/Videos"),
            )
            .await
            .unwrap();
        let cats = db.list_categories().await.unwrap();
        assert_eq!(cats.len(), 1);
        assert_eq!(cats[0].id, id);
        assert_eq!(cats[0].extensions, vec!["mp4", "mkv"]);
        assert_eq!(cats[0].save_folder.as_deref(), Some("/home/user/Videos"));
    }

    #[tokio::test]
    async fn remove_category() {
        let db = ResumeDb::open_memory().await.unwrap();
        let id = db.add_category("Docs", &[], &[], None).await.unwrap();
        db.remove_category(id).await.unwrap();
        assert!(db.list_categories().await.unwrap().is_empty());
    }
}
