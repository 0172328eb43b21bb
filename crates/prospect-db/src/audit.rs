//! Search audit log repository.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};

use prospect_core::{AuditActor, AuditEntry, AuditLog, Error, NewAuditEntry, Result, SearchStatus};

/// PostgreSQL append-only audit log.
pub struct PgAuditLog {
    pool: Pool<Postgres>,
}

impl PgAuditLog {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn parse_row(row: &sqlx::postgres::PgRow) -> Result<AuditEntry> {
        let from_status: Option<String> = row.get("from_status");
        let from_status = from_status
            .map(|s| {
                SearchStatus::parse(&s)
                    .ok_or_else(|| Error::Internal(format!("unknown search status '{}'", s)))
            })
            .transpose()?;
        let to_status: String = row.get("to_status");
        let actor: String = row.get("actor");

        Ok(AuditEntry {
            id: row.get("id"),
            search_id: row.get("search_id"),
            from_status,
            to_status: SearchStatus::parse(&to_status)
                .ok_or_else(|| Error::Internal(format!("unknown search status '{}'", to_status)))?,
            actor: AuditActor::parse(&actor)
                .ok_or_else(|| Error::Internal(format!("unknown audit actor '{}'", actor)))?,
            message: row.get("message"),
            created_at: row.get("created_at"),
        })
    }
}

#[async_trait]
impl AuditLog for PgAuditLog {
    async fn append(&self, entry: NewAuditEntry) -> Result<AuditEntry> {
        let row = sqlx::query(
            "INSERT INTO search_audit_log (search_id, from_status, to_status, actor, message)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id, search_id, from_status, to_status, actor, message, created_at",
        )
        .bind(entry.search_id)
        .bind(entry.from_status.map(SearchStatus::as_str))
        .bind(entry.to_status.as_str())
        .bind(entry.actor.as_str())
        .bind(&entry.message)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Self::parse_row(&row)
    }

    async fn list_for_search(&self, search_id: i64) -> Result<Vec<AuditEntry>> {
        let rows = sqlx::query(
            "SELECT id, search_id, from_status, to_status, actor, message, created_at
             FROM search_audit_log
             WHERE search_id = $1
             ORDER BY id",
        )
        .bind(search_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.iter().map(Self::parse_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{insert_test_search, test_pool};

    #[tokio::test]
    #[ignore = "requires PostgreSQL"]
    async fn test_audit_entries_are_ordered_oldest_first() {
        let pool = test_pool().await;
        let log = PgAuditLog::new(pool.clone());
        let search_id = insert_test_search(&pool, "dentists").await;

        log.append(NewAuditEntry {
            search_id,
            from_status: None,
            to_status: SearchStatus::New,
            actor: AuditActor::User,
            message: "search created".to_string(),
        })
        .await
        .unwrap();
        log.append(NewAuditEntry {
            search_id,
            from_status: Some(SearchStatus::New),
            to_status: SearchStatus::Processing,
            actor: AuditActor::System,
            message: "trigger accepted".to_string(),
        })
        .await
        .unwrap();

        let entries = log.list_for_search(search_id).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].from_status, None);
        assert_eq!(entries[1].to_status, SearchStatus::Processing);
        assert_eq!(entries[1].actor, AuditActor::System);
    }
}
