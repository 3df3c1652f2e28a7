//! Audio reference records
//!
//! Rows are written once per successful upload and never updated or deleted.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

/// One uploaded asset: where it lives and when it arrived.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct AudioRecord {
    pub id: Uuid,
    pub audio_url: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Record a new upload. Call only after the media host accepted the file.
pub async fn insert(pool: &SqlitePool, audio_url: &str) -> Result<AudioRecord, sqlx::Error> {
    let record = AudioRecord {
        id: Uuid::new_v4(),
        audio_url: audio_url.to_string(),
        uploaded_at: Utc::now(),
    };

    sqlx::query("INSERT INTO audios (id, audio_url, uploaded_at) VALUES (?, ?, ?)")
        .bind(record.id)
        .bind(&record.audio_url)
        .bind(record.uploaded_at)
        .execute(pool)
        .await?;

    Ok(record)
}

pub async fn get(pool: &SqlitePool, id: Uuid) -> Result<Option<AudioRecord>, sqlx::Error> {
    sqlx::query_as::<_, AudioRecord>("SELECT id, audio_url, uploaded_at FROM audios WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn count(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM audios")
        .fetch_one(pool)
        .await
}

/// Newest first. Rows are append-only, so rowid order is creation order.
pub async fn list_page(
    pool: &SqlitePool,
    offset: i64,
    limit: i64,
) -> Result<Vec<AudioRecord>, sqlx::Error> {
    sqlx::query_as::<_, AudioRecord>(
        "SELECT id, audio_url, uploaded_at FROM audios ORDER BY rowid DESC LIMIT ? OFFSET ?",
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;

    #[tokio::test]
    async fn test_insert_and_get() {
        let pool = memory_pool().await;
        let url = "https://res.cloudinary.com/demo/video/upload/v1/a.webm";

        let record = insert(&pool, url).await.unwrap();
        assert_eq!(record.audio_url, url);

        let fetched = get(&pool, record.id).await.unwrap().expect("record should exist");
        assert_eq!(fetched.id, record.id);
        assert_eq!(fetched.audio_url, url);
        assert_eq!(fetched.uploaded_at.timestamp(), record.uploaded_at.timestamp());
    }

    #[tokio::test]
    async fn test_get_unknown_id() {
        let pool = memory_pool().await;
        assert!(get(&pool, Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_page_newest_first() {
        let pool = memory_pool().await;
        for i in 0..5 {
            insert(&pool, &format!("https://example.com/{}.webm", i)).await.unwrap();
        }

        assert_eq!(count(&pool).await.unwrap(), 5);

        let first = list_page(&pool, 0, 2).await.unwrap();
        let urls: Vec<&str> = first.iter().map(|r| r.audio_url.as_str()).collect();
        assert_eq!(urls, vec!["https://example.com/4.webm", "https://example.com/3.webm"]);

        let last = list_page(&pool, 4, 2).await.unwrap();
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].audio_url, "https://example.com/0.webm");
    }
}
