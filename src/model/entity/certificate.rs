//! Certificate issuance and public verification.

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Connection;
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::{
    auth::generate_verification_code,
    model::{
        ModelManager, ResourceType,
        access::{HasOwner, check_access},
        error::{DatabaseError, DatabaseResult},
        repo::ResourceTyped,
        scoring::is_course_complete,
    },
    web::AuthenticatedUser,
};

use super::Enrollment;

/// How many fresh verification codes to try before giving up.
const CODE_ATTEMPTS: usize = 5;
const VERIFICATION_CODE_CONSTRAINT: &str = "certificates_verification_code_key";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Certificate {
    id: String,
    enrollment_id: Uuid,
    user_id: Uuid,
    course_id: Uuid,
    issue_date: DateTime<Utc>,
    expiry_date: Option<DateTime<Utc>>,
    verification_code: String,
    created_at: DateTime<Utc>,
}

impl ResourceTyped for Certificate {
    fn get_resource_type() -> ResourceType {
        ResourceType::Certificate
    }
}

impl Certificate {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn enrollment_id(&self) -> Uuid {
        self.enrollment_id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn course_id(&self) -> Uuid {
        self.course_id
    }

    pub fn issue_date(&self) -> DateTime<Utc> {
        self.issue_date
    }

    pub fn expiry_date(&self) -> Option<DateTime<Utc>> {
        self.expiry_date
    }

    pub fn verification_code(&self) -> &str {
        &self.verification_code
    }
}

#[async_trait::async_trait]
impl HasOwner for Certificate {
    type OwnerId = Uuid;

    async fn get_owner_id(
        &self,
        _mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        Ok(self.user_id)
    }
}

/// `LHC-{enrollment}-{YYYYMMDD}`.
pub fn certificate_id(enrollment_id: Uuid, issue_date: DateTime<Utc>) -> String {
    format!("LHC-{}-{}", enrollment_id, issue_date.format("%Y%m%d"))
}

pub fn expiry_for(issue_date: DateTime<Utc>) -> Option<DateTime<Utc>> {
    issue_date.checked_add_months(Months::new(24))
}

impl Certificate {
    /// Mints the certificate of a completed enrollment. One shot: a second call
    /// for the same enrollment is a conflict.
    pub async fn issue(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        course_id: Uuid,
    ) -> DatabaseResult<Self> {
        let mut tx = mm.begin().await?;

        let enrollment = Enrollment::lock_active(&mut tx, actor.user_id(), course_id).await?;
        if enrollment.certificate_id().is_some() {
            return Err(DatabaseError::conflict("certificate already issued"));
        }
        if !is_course_complete(enrollment.progress()) {
            return Err(DatabaseError::validation("course not completed yet"));
        }

        let issue_date = Utc::now();
        let id = certificate_id(enrollment.id(), issue_date);
        let expiry_date = expiry_for(issue_date);

        let mut certificate = None;
        for _ in 0..CODE_ATTEMPTS {
            let code = generate_verification_code();

            let mut savepoint = Connection::begin(&mut *tx).await?;
            let result = sqlx::query_as::<_, Certificate>(
                r#"
                INSERT INTO certificates
                    (id, enrollment_id, user_id, course_id, issue_date, expiry_date, verification_code)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING *
                "#,
            )
            .bind(&id)
            .bind(enrollment.id())
            .bind(actor.user_id())
            .bind(course_id)
            .bind(issue_date)
            .bind(expiry_date)
            .bind(&code)
            .fetch_one(&mut *savepoint)
            .await
            .map_err(DatabaseError::from);

            match result {
                Ok(c) => {
                    savepoint.commit().await?;
                    certificate = Some(c);
                    break;
                }
                Err(e) if e.violated_constraint() == Some(VERIFICATION_CODE_CONSTRAINT) => {
                    tracing::warn!("verification code collision, retrying");
                    savepoint.rollback().await?;
                }
                Err(e) if e.is_unique_violation() => {
                    return Err(DatabaseError::conflict("certificate already issued"));
                }
                Err(e) => return Err(e),
            }
        }

        let certificate = certificate.ok_or(DatabaseError::conflict(
            "could not allocate a unique verification code, retry later",
        ))?;

        sqlx::query(
            "UPDATE enrollments SET certificate_id = $1, certificate_issued_at = $2 WHERE id = $3",
        )
        .bind(certificate.id())
        .bind(issue_date)
        .bind(enrollment.id())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            "certificate {} issued to user {}",
            certificate.id(),
            actor.user_id()
        );
        Ok(certificate)
    }

    pub async fn find_by_id(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        id: &str,
    ) -> DatabaseResult<Self> {
        let certificate: Certificate = sqlx::query_as("SELECT * FROM certificates WHERE id = $1")
            .bind(id)
            .fetch_optional(mm.executor())
            .await?
            .ok_or(DatabaseError::NotFound)?;

        check_access(mm, actor, &certificate, actor.user_id()).await?;
        Ok(certificate)
    }

    /// Public lookup by verification code, falling back to the certificate id.
    pub async fn verify(
        mm: &ModelManager,
        code: Option<&str>,
        id: Option<&str>,
    ) -> DatabaseResult<CertificateVerification> {
        let code = code.map(str::trim).filter(|c| !c.is_empty());
        let id = id.map(str::trim).filter(|i| !i.is_empty());
        if code.is_none() && id.is_none() {
            return Err(DatabaseError::validation("code or id is required"));
        }

        let row = match code {
            Some(code) => VerificationRow::fetch(mm, "c.verification_code", code).await?,
            None => None,
        };
        let row = match (row, id) {
            (None, Some(id)) => VerificationRow::fetch(mm, "c.id", id).await?,
            (row, _) => row,
        };

        Ok(row
            .map(|r| r.into_verification(Utc::now()))
            .unwrap_or_else(CertificateVerification::invalid))
    }
}

#[derive(Debug, FromRow)]
struct VerificationRow {
    id: String,
    student_name: String,
    course_title: String,
    issue_date: DateTime<Utc>,
    expiry_date: Option<DateTime<Utc>>,
    verification_code: String,
}

impl VerificationRow {
    async fn fetch(mm: &ModelManager, column: &str, value: &str) -> DatabaseResult<Option<Self>> {
        let sql = format!(
            r#"
            SELECT c.id, u.name AS student_name, co.title AS course_title,
                   c.issue_date, c.expiry_date, c.verification_code
            FROM certificates c
            JOIN users u ON u.id = c.user_id
            JOIN courses co ON co.id = c.course_id
            WHERE {column} = $1
            "#
        );
        let result = sqlx::query_as(&sql)
            .bind(value)
            .fetch_optional(mm.executor())
            .await?;
        Ok(result)
    }

    fn into_verification(self, now: DateTime<Utc>) -> CertificateVerification {
        CertificateVerification {
            valid: self.expiry_date.is_none_or(|expiry| expiry > now),
            certificate_id: Some(self.id),
            student_name: Some(self.student_name),
            course_title: Some(self.course_title),
            issue_date: Some(format_issue_date(self.issue_date)),
            verification_code: Some(self.verification_code),
        }
    }
}

/// Public projection; carries no user or enrollment ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CertificateVerification {
    pub valid: bool,
    pub certificate_id: Option<String>,
    pub student_name: Option<String>,
    pub course_title: Option<String>,
    pub issue_date: Option<String>,
    pub verification_code: Option<String>,
}

impl CertificateVerification {
    pub fn invalid() -> Self {
        Self {
            valid: false,
            certificate_id: None,
            student_name: None,
            course_title: None,
            issue_date: None,
            verification_code: None,
        }
    }
}

/// e.g. `January 2, 2006`
pub fn format_issue_date(date: DateTime<Utc>) -> String {
    date.format("%B %-d, %Y").to_string()
}

#[cfg(test)]
mod test {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn id_embeds_enrollment_and_date() {
        let enrollment = Uuid::nil();
        let date = Utc.with_ymd_and_hms(2025, 3, 7, 12, 0, 0).unwrap();
        assert_eq!(
            certificate_id(enrollment, date),
            "LHC-00000000-0000-0000-0000-000000000000-20250307"
        );
    }

    #[test]
    fn expires_two_years_later() {
        let date = Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap();
        let expiry = expiry_for(date).unwrap();
        assert_eq!(expiry, Utc.with_ymd_and_hms(2026, 2, 28, 0, 0, 0).unwrap());
    }

    #[test]
    fn issue_date_is_human_readable() {
        let date = Utc.with_ymd_and_hms(2006, 1, 2, 15, 4, 5).unwrap();
        assert_eq!(format_issue_date(date), "January 2, 2006");
    }

    #[test]
    fn expired_certificates_are_invalid() {
        let issued = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let row = VerificationRow {
            id: String::from("LHC-x-20200101"),
            student_name: String::from("Ada"),
            course_title: String::from("Rust 101"),
            issue_date: issued,
            expiry_date: expiry_for(issued),
            verification_code: String::from("LHC-ABC"),
        };
        let v = row.into_verification(Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap());
        assert!(!v.valid);
        assert_eq!(v.course_title.as_deref(), Some("Rust 101"));
    }
}
