//! Search job repository.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};

use prospect_core::{
    Error, Result, SearchJob, SearchRepository, SearchState, SearchStatus, SearchSummary,
};

const SEARCH_COLUMNS: &str = "id, query, status, next_page_token, error_message, created_by,
     created_at, updated_at, version";

/// PostgreSQL search job repository.
pub struct PgSearchRepository {
    pool: Pool<Postgres>,
}

impl PgSearchRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub(crate) fn parse_row(row: &sqlx::postgres::PgRow) -> Result<SearchJob> {
        let status: String = row.get("status");
        let status = SearchStatus::parse(&status)
            .ok_or_else(|| Error::Internal(format!("unknown search status '{}'", status)))?;
        Ok(SearchJob {
            id: row.get("id"),
            query: row.get("query"),
            status,
            next_page_token: row.get("next_page_token"),
            error_message: row.get("error_message"),
            created_by: row.get("created_by"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
            version: row.get("version"),
        })
    }
}

#[async_trait]
impl SearchRepository for PgSearchRepository {
    async fn insert(&self, query: &str, created_by: Option<&str>) -> Result<SearchJob> {
        let row = sqlx::query(&format!(
            "INSERT INTO search_job (query, created_by) VALUES ($1, $2) RETURNING {}",
            SEARCH_COLUMNS
        ))
        .bind(query)
        .bind(created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Self::parse_row(&row)
    }

    async fn get(&self, id: i64) -> Result<Option<SearchJob>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM search_job WHERE id = $1",
            SEARCH_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.as_ref().map(Self::parse_row).transpose()
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<SearchSummary>> {
        let rows = sqlx::query(
            "SELECT s.id, s.query, s.status, s.next_page_token, s.error_message, s.created_by,
                    s.created_at, s.updated_at, s.version,
                    (SELECT COUNT(*) FROM lead l WHERE l.search_id = s.id) AS lead_count
             FROM search_job s
             ORDER BY s.created_at DESC, s.id DESC
             LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset.max(0))
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.iter()
            .map(|r| {
                Ok(SearchSummary {
                    search: Self::parse_row(r)?,
                    lead_count: r.get("lead_count"),
                })
            })
            .collect()
    }

    async fn count(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM search_job")
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)
    }

    async fn write_state(
        &self,
        id: i64,
        expected_version: i64,
        state: &SearchState,
    ) -> Result<SearchJob> {
        let row = sqlx::query(&format!(
            "UPDATE search_job SET
                status = $1,
                next_page_token = $2,
                error_message = $3,
                version = version + 1,
                updated_at = now()
             WHERE id = $4 AND version = $5
             RETURNING {}",
            SEARCH_COLUMNS
        ))
        .bind(state.status.as_str())
        .bind(&state.next_page_token)
        .bind(&state.error_message)
        .bind(id)
        .bind(expected_version)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        if let Some(row) = row {
            return Self::parse_row(&row);
        }

        // Nothing matched: either the row is gone or someone else wrote first.
        let current: Option<i64> = sqlx::query_scalar("SELECT version FROM search_job WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        match current {
            None => Err(Error::SearchNotFound(id)),
            Some(found) => Err(Error::Conflict(format!(
                "search {} changed concurrently (expected version {}, found {})",
                id, expected_version, found
            ))),
        }
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM search_job WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(result.rows_affected() > 0)
    }
}
