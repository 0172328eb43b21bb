//! Lead repository.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};

use prospect_core::{
    defaults::clamp_limit, Error, Lead, LeadRepository, ListLeadsRequest, NewLead, Result,
    UpdateLeadMessageRequest,
};

const LEAD_COLUMNS: &str = "id, search_id, name, phone, email, address, activity_summary,
     message_text, use_default_message, contact_created, created_partner_id,
     opportunity_created, created_opportunity_id, created_at";

/// PostgreSQL lead repository.
pub struct PgLeadRepository {
    pool: Pool<Postgres>,
}

impl PgLeadRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn parse_row(row: &sqlx::postgres::PgRow) -> Lead {
        Lead {
            id: row.get("id"),
            search_id: row.get("search_id"),
            name: row.get("name"),
            phone: row.get("phone"),
            email: row.get("email"),
            address: row.get("address"),
            activity_summary: row.get("activity_summary"),
            message_text: row.get("message_text"),
            use_default_message: row.get("use_default_message"),
            contact_created: row.get("contact_created"),
            created_partner_id: row.get("created_partner_id"),
            opportunity_created: row.get("opportunity_created"),
            created_opportunity_id: row.get("created_opportunity_id"),
            created_at: row.get("created_at"),
        }
    }

    async fn mark(&self, id: i64, sql: &str, reference: i64) -> Result<()> {
        let result = sqlx::query(sql)
            .bind(reference)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        if result.rows_affected() == 0 {
            return Err(Error::LeadNotFound(id));
        }
        Ok(())
    }
}

#[async_trait]
impl LeadRepository for PgLeadRepository {
    async fn insert(&self, lead: NewLead) -> Result<Lead> {
        let row = sqlx::query(&format!(
            "INSERT INTO lead (search_id, name, phone, email, address, activity_summary)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {}",
            LEAD_COLUMNS
        ))
        .bind(lead.search_id)
        .bind(&lead.name)
        .bind(&lead.phone)
        .bind(&lead.email)
        .bind(&lead.address)
        .bind(&lead.activity_summary)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => Error::InvalidInput(
                format!("search {} does not exist", lead.search_id.unwrap_or_default()),
            ),
            e => Error::Database(e),
        })?;

        Ok(Self::parse_row(&row))
    }

    async fn get(&self, id: i64) -> Result<Option<Lead>> {
        let row = sqlx::query(&format!("SELECT {} FROM lead WHERE id = $1", LEAD_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(row.as_ref().map(Self::parse_row))
    }

    async fn list(&self, req: &ListLeadsRequest) -> Result<Vec<Lead>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM lead
             WHERE ($1::BIGINT IS NULL OR search_id = $1)
             ORDER BY created_at DESC, id DESC
             LIMIT $2 OFFSET $3",
            LEAD_COLUMNS
        ))
        .bind(req.search_id)
        .bind(clamp_limit(req.limit))
        .bind(req.offset.unwrap_or(0).max(0))
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(Self::parse_row).collect())
    }

    async fn count_for_search(&self, search_id: i64) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM lead WHERE search_id = $1")
            .bind(search_id)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)
    }

    async fn update_message(&self, id: i64, req: &UpdateLeadMessageRequest) -> Result<Lead> {
        let row = sqlx::query(&format!(
            "UPDATE lead SET
                message_text = COALESCE($1, message_text),
                use_default_message = COALESCE($2, use_default_message)
             WHERE id = $3
             RETURNING {}",
            LEAD_COLUMNS
        ))
        .bind(&req.message_text)
        .bind(req.use_default_message)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.as_ref()
            .map(Self::parse_row)
            .ok_or(Error::LeadNotFound(id))
    }

    async fn mark_contact_created(&self, id: i64, partner_id: i64) -> Result<()> {
        self.mark(
            id,
            "UPDATE lead SET contact_created = TRUE, created_partner_id = $1 WHERE id = $2",
            partner_id,
        )
        .await
    }

    async fn mark_opportunity_created(&self, id: i64, opportunity_id: i64) -> Result<()> {
        self.mark(
            id,
            "UPDATE lead SET opportunity_created = TRUE, created_opportunity_id = $1 WHERE id = $2",
            opportunity_id,
        )
        .await
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM lead WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(result.rows_affected() > 0)
    }
}
