//! Contact and opportunity repositories.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};

use prospect_core::{
    Contact, ContactRepository, Error, NewContact, NewOpportunity, Opportunity,
    OpportunityRepository, Result,
};

const CONTACT_COLUMNS: &str = "id, name, phone, email, street, comment, is_company, created_at";

const OPPORTUNITY_COLUMNS: &str =
    "id, name, lead_id, contact_id, email, phone, description, created_at";

/// PostgreSQL contact repository.
pub struct PgContactRepository {
    pool: Pool<Postgres>,
}

impl PgContactRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn parse_row(row: &sqlx::postgres::PgRow) -> Contact {
        Contact {
            id: row.get("id"),
            name: row.get("name"),
            phone: row.get("phone"),
            email: row.get("email"),
            street: row.get("street"),
            comment: row.get("comment"),
            is_company: row.get("is_company"),
            created_at: row.get("created_at"),
        }
    }
}

#[async_trait]
impl ContactRepository for PgContactRepository {
    async fn insert(&self, contact: NewContact) -> Result<Contact> {
        let row = sqlx::query(&format!(
            "INSERT INTO contact (name, phone, email, street, comment, is_company)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {}",
            CONTACT_COLUMNS
        ))
        .bind(&contact.name)
        .bind(&contact.phone)
        .bind(&contact.email)
        .bind(&contact.street)
        .bind(&contact.comment)
        .bind(contact.is_company)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(Self::parse_row(&row))
    }

    async fn get(&self, id: i64) -> Result<Option<Contact>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM contact WHERE id = $1",
            CONTACT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.as_ref().map(Self::parse_row))
    }

    async fn find_by_email_or_phone(
        &self,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> Result<Option<Contact>> {
        if email.is_none() && phone.is_none() {
            return Ok(None);
        }

        let row = sqlx::query(&format!(
            "SELECT {} FROM contact
             WHERE ($1::TEXT IS NOT NULL AND email = $1)
                OR ($2::TEXT IS NOT NULL AND phone = $2)
             ORDER BY id
             LIMIT 1",
            CONTACT_COLUMNS
        ))
        .bind(email)
        .bind(phone)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.as_ref().map(Self::parse_row))
    }

    async fn ids_by_email(&self, email: &str) -> Result<Vec<i64>> {
        sqlx::query_scalar("SELECT id FROM contact WHERE email = $1 ORDER BY id")
            .bind(email)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)
    }
}

/// PostgreSQL opportunity repository.
pub struct PgOpportunityRepository {
    pool: Pool<Postgres>,
}

impl PgOpportunityRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn parse_row(row: &sqlx::postgres::PgRow) -> Opportunity {
        Opportunity {
            id: row.get("id"),
            name: row.get("name"),
            lead_id: row.get("lead_id"),
            contact_id: row.get("contact_id"),
            email: row.get("email"),
            phone: row.get("phone"),
            description: row.get("description"),
            created_at: row.get("created_at"),
        }
    }
}

#[async_trait]
impl OpportunityRepository for PgOpportunityRepository {
    async fn insert(&self, opportunity: NewOpportunity) -> Result<Opportunity> {
        let row = sqlx::query(&format!(
            "INSERT INTO opportunity (name, lead_id, contact_id, email, phone, description)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {}",
            OPPORTUNITY_COLUMNS
        ))
        .bind(&opportunity.name)
        .bind(opportunity.lead_id)
        .bind(opportunity.contact_id)
        .bind(&opportunity.email)
        .bind(&opportunity.phone)
        .bind(&opportunity.description)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(Self::parse_row(&row))
    }

    async fn get(&self, id: i64) -> Result<Option<Opportunity>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM opportunity WHERE id = $1",
            OPPORTUNITY_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.as_ref().map(Self::parse_row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::test_pool;

    fn contact(email: Option<&str>, phone: Option<&str>) -> NewContact {
        NewContact {
            name: "Oficina Central".to_string(),
            phone: phone.map(str::to_string),
            email: email.map(str::to_string),
            street: None,
            comment: None,
            is_company: true,
        }
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL"]
    async fn test_contact_lookup_by_email_or_phone() {
        let repo = PgContactRepository::new(test_pool().await);
        let email = format!("contato+{}@oficina.example", chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default());
        let created = repo.insert(contact(Some(&email), None)).await.unwrap();

        let by_email = repo.find_by_email_or_phone(Some(&email), None).await.unwrap();
        assert_eq!(by_email.map(|c| c.id), Some(created.id));

        let none = repo.find_by_email_or_phone(None, None).await.unwrap();
        assert!(none.is_none());

        let ids = repo.ids_by_email(&email).await.unwrap();
        assert_eq!(ids, vec![created.id]);
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL"]
    async fn test_opportunity_insert_and_get() {
        let pool = test_pool().await;
        let contacts = PgContactRepository::new(pool.clone());
        let repo = PgOpportunityRepository::new(pool);
        let partner = contacts.insert(contact(None, Some("5511999990000"))).await.unwrap();

        let opp = repo
            .insert(NewOpportunity {
                name: "Oficina Central".to_string(),
                lead_id: None,
                contact_id: Some(partner.id),
                email: None,
                phone: partner.phone.clone(),
                description: Some("Auto repair".to_string()),
            })
            .await
            .unwrap();

        let fetched = repo.get(opp.id).await.unwrap().expect("opportunity should exist");
        assert_eq!(fetched.contact_id, Some(partner.id));
    }
}
