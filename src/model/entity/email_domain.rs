//! Allowed sign-up e-mail domains.
//!
//! Seeded from `[signup] allowed_domains` at startup and edited by administrators
//! afterwards. Sign-up reads this table; there is no in-process copy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;

use crate::{
    model::{
        ModelManager, ResourceType,
        error::{DatabaseError, DatabaseResult},
        repo::ResourceTyped,
    },
    utils::validation::normalize_domain,
    web::AuthenticatedUser,
};

#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct AllowedEmailDomain {
    domain: String,
    created_at: DateTime<Utc>,
}

impl ResourceTyped for AllowedEmailDomain {
    fn get_resource_type() -> ResourceType {
        ResourceType::EmailDomain
    }
}

impl AllowedEmailDomain {
    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub async fn list(mm: &ModelManager, actor: &AuthenticatedUser) -> DatabaseResult<Vec<Self>> {
        require_admin(actor)?;
        let result = sqlx::query_as("SELECT * FROM allowed_email_domains ORDER BY domain")
            .fetch_all(mm.executor())
            .await?;
        Ok(result)
    }

    pub async fn add(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        domain: &str,
    ) -> DatabaseResult<Self> {
        require_admin(actor)?;
        let domain =
            normalize_domain(domain).ok_or(DatabaseError::validation("invalid domain"))?;

        let result = sqlx::query_as(
            "INSERT INTO allowed_email_domains (domain) VALUES ($1) ON CONFLICT (domain) DO NOTHING RETURNING *",
        )
        .bind(&domain)
        .fetch_optional(mm.executor())
        .await?;

        result.ok_or(DatabaseError::conflict(format!("domain {domain} is already allowed")))
    }

    pub async fn remove(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        domain: &str,
    ) -> DatabaseResult<()> {
        require_admin(actor)?;
        let domain = domain.trim().to_lowercase();

        let result = sqlx::query("DELETE FROM allowed_email_domains WHERE domain = $1")
            .bind(&domain)
            .execute(mm.executor())
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound);
        }
        Ok(())
    }

    pub async fn contains(mm: &ModelManager, domain: &str) -> DatabaseResult<bool> {
        let result: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM allowed_email_domains WHERE domain = $1)",
        )
        .bind(domain.to_lowercase())
        .fetch_one(mm.executor())
        .await?;
        Ok(result)
    }

    /// Insert-if-absent; domains removed by an administrator come back only on restart.
    pub async fn seed(mm: &ModelManager, domains: &[String]) -> DatabaseResult<()> {
        for domain in domains {
            let Some(domain) = normalize_domain(domain) else {
                tracing::warn!("ignoring invalid configured domain {:?}", domain);
                continue;
            };

            sqlx::query(
                "INSERT INTO allowed_email_domains (domain) VALUES ($1) ON CONFLICT (domain) DO NOTHING",
            )
            .bind(&domain)
            .execute(mm.executor())
            .await?;
        }
        Ok(())
    }
}

fn require_admin(actor: &AuthenticatedUser) -> DatabaseResult<()> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(DatabaseError::forbidden("administrators only"))
    }
}
