/// Membership repository - conversations and their members
use sqlx::SqlitePool;

use crate::error::Result;

pub async fn is_member(pool: &SqlitePool, conversation_id: &str, username: &str) -> Result<bool> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM members WHERE conversation_id = ? AND username = ?")
            .bind(conversation_id)
            .bind(username)
            .fetch_one(pool)
            .await?;

    Ok(count > 0)
}

pub async fn conversation_exists(pool: &SqlitePool, conversation_id: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM conversations WHERE id = ?")
        .bind(conversation_id)
        .fetch_one(pool)
        .await?;

    Ok(count > 0)
}

pub async fn create_conversation(
    pool: &SqlitePool,
    id: &str,
    invite_code: &str,
    name: &str,
) -> Result<()> {
    sqlx::query("INSERT INTO conversations (id, invite_code, name) VALUES (?, ?, ?)")
        .bind(id)
        .bind(invite_code)
        .bind(name)
        .execute(pool)
        .await?;

    Ok(())
}

/// Idempotent: joining twice keeps a single membership
pub async fn add_member(pool: &SqlitePool, conversation_id: &str, username: &str) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO members (conversation_id, username) VALUES (?, ?)")
        .bind(conversation_id)
        .bind(username)
        .execute(pool)
        .await?;

    Ok(())
}
