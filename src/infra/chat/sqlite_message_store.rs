// SQLite-backed message ledger.
//
// Tables:
// - messages: one row per stored classroom message, moderation alongside

use crate::core::chat::{
    ledger_now, ChatError, ClassroomId, Message, MessageContent, MessageId, MessageLedger,
    NewMessage, UserId,
};
use crate::core::moderation::{ModerationFlag, ModerationResult};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};

#[derive(Clone)]
pub struct SqliteMessageStore {
    pool: Pool<Sqlite>,
}

impl SqliteMessageStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Run database migrations to create required tables.
    pub async fn migrate(&self) -> Result<(), ChatError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                id TEXT PRIMARY KEY,
                classroom_id TEXT NOT NULL,
                course_id TEXT NOT NULL,
                language TEXT NOT NULL,
                author_id TEXT NOT NULL,
                author_role TEXT NOT NULL,
                created_at TEXT NOT NULL,
                content_kind TEXT NOT NULL,
                content_text TEXT NOT NULL,
                moderation_verdict TEXT NOT NULL,
                moderation_flags TEXT NOT NULL,
                moderation_student_hint TEXT
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| ChatError::StorageError(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_messages_classroom_created
                ON messages (classroom_id, created_at DESC);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| ChatError::StorageError(e.to_string()))?;

        Ok(())
    }
}

/// Fixed-width UTC timestamp so string order matches time order.
fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn flags_json(flags: &[ModerationFlag]) -> Result<String, ChatError> {
    serde_json::to_string(flags).map_err(|e| ChatError::StorageError(e.to_string()))
}

fn corrupt(column: &str, err: impl std::fmt::Display) -> ChatError {
    ChatError::StorageError(format!("Invalid {} in messages row: {}", column, err))
}

fn row_to_message(row: &SqliteRow) -> Result<Message, ChatError> {
    let created_at: String = row.get("created_at");
    let flags: String = row.get("moderation_flags");
    let kind: String = row.get("content_kind");

    let content = match kind.as_str() {
        "text" => MessageContent::Text {
            text: row.get("content_text"),
        },
        other => return Err(corrupt("content_kind", other)),
    };

    Ok(Message {
        id: MessageId::new(row.get::<String, _>("id")),
        classroom_id: ClassroomId::new(row.get::<String, _>("classroom_id")),
        course_id: row
            .get::<String, _>("course_id")
            .parse()
            .map_err(|e| corrupt("course_id", e))?,
        language: row
            .get::<String, _>("language")
            .parse()
            .map_err(|e| corrupt("language", e))?,
        author_id: UserId::new(row.get::<String, _>("author_id")),
        author_role: row
            .get::<String, _>("author_role")
            .parse()
            .map_err(|e| corrupt("author_role", e))?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| corrupt("created_at", e))?,
        content,
        moderation: ModerationResult {
            verdict: row
                .get::<String, _>("moderation_verdict")
                .parse()
                .map_err(|e| corrupt("moderation_verdict", e))?,
            flags: serde_json::from_str(&flags).map_err(|e| corrupt("moderation_flags", e))?,
            student_hint: row.get("moderation_student_hint"),
        },
    })
}

#[async_trait]
impl MessageLedger for SqliteMessageStore {
    async fn append(
        &self,
        message: NewMessage,
        moderation: ModerationResult,
    ) -> Result<Message, ChatError> {
        let stored = Message {
            id: MessageId::generate(),
            classroom_id: message.classroom_id,
            course_id: message.course_id,
            language: message.language,
            author_id: message.author_id,
            author_role: message.author_role,
            created_at: ledger_now(),
            content: MessageContent::Text { text: message.text },
            moderation,
        };

        sqlx::query(
            r#"
            INSERT INTO messages (
                id, classroom_id, course_id, language, author_id, author_role, created_at,
                content_kind, content_text,
                moderation_verdict, moderation_flags, moderation_student_hint
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(stored.id.as_str())
        .bind(stored.classroom_id.as_str())
        .bind(stored.course_id.as_str())
        .bind(stored.language.as_str())
        .bind(stored.author_id.as_str())
        .bind(stored.author_role.as_str())
        .bind(timestamp(&stored.created_at))
        .bind(stored.content.kind())
        .bind(stored.content.text())
        .bind(stored.moderation.verdict.as_str())
        .bind(flags_json(&stored.moderation.flags)?)
        .bind(stored.moderation.student_hint.as_deref())
        .execute(&self.pool)
        .await
        .map_err(|e| ChatError::StorageError(e.to_string()))?;

        Ok(stored)
    }

    async fn list(&self, classroom_id: &ClassroomId, limit: u32) -> Result<Vec<Message>, ChatError> {
        // Newest first so LIMIT keeps the latest, then flipped to oldest first.
        let rows = sqlx::query(
            r#"
            SELECT * FROM messages
            WHERE classroom_id = ?
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?
            "#,
        )
        .bind(classroom_id.as_str())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ChatError::StorageError(e.to_string()))?;

        let mut messages = rows
            .iter()
            .map(row_to_message)
            .collect::<Result<Vec<_>, _>>()?;
        messages.reverse();
        Ok(messages)
    }

    async fn get_by_id(&self, id: &MessageId) -> Result<Option<Message>, ChatError> {
        let row = sqlx::query("SELECT * FROM messages WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ChatError::StorageError(e.to_string()))?;

        row.as_ref().map(row_to_message).transpose()
    }

    async fn update_moderation(
        &self,
        id: &MessageId,
        moderation: &ModerationResult,
    ) -> Result<bool, ChatError> {
        let result = sqlx::query(
            r#"
            UPDATE messages SET
                moderation_verdict = ?,
                moderation_flags = ?,
                moderation_student_hint = ?
            WHERE id = ?
            "#,
        )
        .bind(moderation.verdict.as_str())
        .bind(flags_json(&moderation.flags)?)
        .bind(moderation.student_hint.as_deref())
        .bind(id.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| ChatError::StorageError(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}
