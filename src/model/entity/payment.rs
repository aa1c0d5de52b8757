//! Paid enrollment. The gateway itself is not modelled: a payment is created
//! pending and a confirmation signal keyed by `tx_ref` settles it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::{
    auth::generate_tx_ref,
    model::{
        ModelManager, ResourceType,
        access::{HasOwner, check_access},
        error::{DatabaseError, DatabaseResult},
        repo::{CrudRepository, ResourceTyped},
    },
    web::AuthenticatedUser,
};

use super::{Course, Enrollment};

pub static CURRENCY: &str = "ETB";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
}

impl From<&str> for PaymentStatus {
    fn from(value: &str) -> Self {
        match value {
            "success" => Self::Success,
            "failed" => Self::Failed,
            _ => Self::Pending,
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Success => write!(f, "success"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Payment {
    id: Uuid,
    user_id: Uuid,
    course_id: Uuid,
    amount: f64,
    currency: String,
    tx_ref: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ResourceTyped for Payment {
    fn get_resource_type() -> ResourceType {
        ResourceType::Payment
    }
}

impl Payment {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn course_id(&self) -> Uuid {
        self.course_id
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn tx_ref(&self) -> &str {
        &self.tx_ref
    }

    pub fn status(&self) -> PaymentStatus {
        PaymentStatus::from(self.status.as_str())
    }
}

#[async_trait::async_trait]
impl HasOwner for Payment {
    type OwnerId = Uuid;

    async fn get_owner_id(
        &self,
        _mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        Ok(self.user_id)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, utoipa::ToSchema)]
pub struct PaymentSignal {
    pub tx_ref: String,
    pub success: bool,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct PaymentConfirmation {
    pub payment: Payment,
    pub enrollment: Option<Enrollment>,
}

impl Payment {
    pub async fn initiate(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        course_id: Uuid,
    ) -> DatabaseResult<Self> {
        let course = Course::find_by_id(mm, actor, course_id)
            .await?
            .ok_or(DatabaseError::NotFound)?;
        if !course.published() {
            return Err(DatabaseError::forbidden("course is not published"));
        }
        if course.is_free() {
            return Err(DatabaseError::validation("course is free, enroll directly"));
        }

        let mut tx = mm.begin().await?;
        if Enrollment::find_for(&mut tx, actor.user_id(), course_id)
            .await?
            .is_some()
        {
            return Err(DatabaseError::conflict("already enrolled in this course"));
        }

        let payment: Payment = sqlx::query_as(
            r#"
            INSERT INTO payments (id, user_id, course_id, amount, currency, tx_ref)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(actor.user_id())
        .bind(course_id)
        .bind(course.price())
        .bind(CURRENCY)
        .bind(generate_tx_ref())
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::info!("payment {} initiated for course {}", payment.tx_ref, course_id);
        Ok(payment)
    }

    /// Settles a pending payment. Idempotent per `tx_ref`: repeated signals
    /// return the settled state and never create a second enrollment.
    pub async fn confirm(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        signal: PaymentSignal,
    ) -> DatabaseResult<PaymentConfirmation> {
        if !actor.is_admin() {
            return Err(DatabaseError::forbidden("payment confirmation is restricted"));
        }

        let mut tx = mm.begin().await?;

        let payment: Payment =
            sqlx::query_as("SELECT * FROM payments WHERE tx_ref = $1 FOR UPDATE")
                .bind(&signal.tx_ref)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(DatabaseError::NotFound)?;

        if payment.status() != PaymentStatus::Pending {
            let enrollment = Enrollment::find_for(&mut tx, payment.user_id, payment.course_id).await?;
            tx.commit().await?;
            return Ok(PaymentConfirmation {
                payment,
                enrollment,
            });
        }

        let status = if signal.success {
            PaymentStatus::Success
        } else {
            PaymentStatus::Failed
        };

        let payment: Payment = sqlx::query_as(
            "UPDATE payments SET status = $1, updated_at = now() WHERE id = $2 RETURNING *",
        )
        .bind(status.to_string())
        .bind(payment.id)
        .fetch_one(&mut *tx)
        .await?;

        let enrollment = match status {
            PaymentStatus::Success => {
                match Enrollment::find_for(&mut tx, payment.user_id, payment.course_id).await? {
                    Some(existing) => Some(existing),
                    None => Some(
                        Enrollment::create_in(
                            &mut tx,
                            payment.user_id,
                            payment.course_id,
                            Some(payment.id),
                        )
                        .await?,
                    ),
                }
            }
            _ => None,
        };

        tx.commit().await?;

        tracing::info!("payment {} settled as {}", payment.tx_ref, status);
        Ok(PaymentConfirmation {
            payment,
            enrollment,
        })
    }

    /// The caller's payment history, newest first.
    pub async fn list_own(mm: &ModelManager, actor: &AuthenticatedUser) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as(
            "SELECT * FROM payments WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(actor.user_id())
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }

    /// Payer or admin.
    pub async fn find_visible(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        id: Uuid,
    ) -> DatabaseResult<Self> {
        let payment: Payment = sqlx::query_as("SELECT * FROM payments WHERE id = $1")
            .bind(id)
            .fetch_optional(mm.executor())
            .await?
            .ok_or(DatabaseError::NotFound)?;

        check_access(mm, actor, &payment, actor.user_id()).await?;
        Ok(payment)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn status_round_trips_through_text() {
        for status in [PaymentStatus::Pending, PaymentStatus::Success, PaymentStatus::Failed] {
            assert_eq!(PaymentStatus::from(status.to_string().as_str()), status);
        }
        assert_eq!(PaymentStatus::from("whatever"), PaymentStatus::Pending);
    }
}
