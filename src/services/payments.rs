use super::{clean, find_for_update, find_or_404, page_offset};
use crate::{
    db::DbPool,
    entities::{assignment, payment, PaymentStatus},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// How strictly payment status changes follow PENDING -> APPROVED -> PAID.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransitionPolicy {
    /// Forward moves only, approval may be skipped.
    #[default]
    Permissive,
    /// Every step is required.
    Strict,
}

/// Validates a payment status change under `policy`.
///
/// Re-setting the current status is accepted and changes nothing.
pub fn check_transition(
    policy: TransitionPolicy,
    from: PaymentStatus,
    to: PaymentStatus,
) -> Result<(), ServiceError> {
    use PaymentStatus::*;

    if from == to {
        return Ok(());
    }
    if to < from {
        return Err(ServiceError::InvalidStatus(format!(
            "payment cannot move back from {from} to {to}"
        )));
    }

    match (policy, from, to) {
        (TransitionPolicy::Strict, Pending, Paid) => Err(ServiceError::InvalidStatus(
            "payment must be APPROVED before it is PAID".to_string(),
        )),
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct CreatePaymentInput {
    pub assignment_id: Uuid,
    pub amount: Decimal,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
#[schema(example = json!({"status": "APPROVED", "actor": "Choi (finance)"}))]
pub struct UpdatePaymentStatusInput {
    pub status: PaymentStatus,
    /// Who is approving or paying; falls back to the signed-in user.
    #[validate(length(min = 1, max = 100))]
    pub actor: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

/// Service for instructor payments
#[derive(Clone)]
pub struct PaymentService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    policy: TransitionPolicy,
    default_actor: String,
}

impl PaymentService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        policy: TransitionPolicy,
        default_actor: impl Into<String>,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            policy,
            default_actor: default_actor.into(),
        }
    }

    pub fn policy(&self) -> TransitionPolicy {
        self.policy
    }

    /// Inserts a PENDING payment on `conn`, which may be an open transaction.
    pub(crate) async fn insert_pending<C>(
        conn: &C,
        assignment: &assignment::Model,
        amount: Decimal,
        notes: Option<String>,
    ) -> Result<payment::Model, ServiceError>
    where
        C: ConnectionTrait,
    {
        if amount <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "amount must be greater than zero".to_string(),
            ));
        }

        payment::ActiveModel {
            id: Set(Uuid::new_v4()),
            assignment_id: Set(assignment.id),
            instructor_id: Set(assignment.instructor_id),
            amount: Set(amount),
            status: Set(PaymentStatus::Pending),
            notes: Set(clean(notes)),
            ..Default::default()
        }
        .insert(conn)
        .await
        .map_err(ServiceError::db_error)
    }

    #[instrument(skip(self, input), fields(assignment_id = %input.assignment_id))]
    pub async fn create_payment(
        &self,
        input: CreatePaymentInput,
    ) -> Result<payment::Model, ServiceError> {
        input.validate()?;
        let db = self.db_pool.as_ref();
        let assignment =
            find_or_404::<assignment::Entity, _>(db, input.assignment_id, "Assignment").await?;

        let created = Self::insert_pending(db, &assignment, input.amount, input.notes).await?;
        info!(payment_id = %created.id, amount = %created.amount, "payment created");

        self.event_sender
            .send_or_log(Event::PaymentCreated {
                payment_id: created.id,
                instructor_id: created.instructor_id,
                amount: created.amount,
            })
            .await;

        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get_payment(&self, id: Uuid) -> Result<payment::Model, ServiceError> {
        find_or_404::<payment::Entity, _>(self.db_pool.as_ref(), id, "Payment").await
    }

    #[instrument(skip(self))]
    pub async fn list_payments(
        &self,
        page: u64,
        limit: u64,
        status: Option<PaymentStatus>,
    ) -> Result<(Vec<payment::Model>, u64), ServiceError> {
        let db = self.db_pool.as_ref();
        let mut query = payment::Entity::find();
        if let Some(status) = status {
            query = query.filter(payment::Column::Status.eq(status));
        }

        let total = query.clone().count(db).await.map_err(ServiceError::db_error)?;
        let payments = query
            .order_by_desc(payment::Column::CreatedAt)
            .offset(page_offset(page, limit))
            .limit(limit)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok((payments, total))
    }

    /// Moves a payment along its status line and stamps who did it.
    ///
    /// The actor is `input.actor`, else `auth_actor`, else the configured
    /// default.
    #[instrument(skip(self, input), fields(status = %input.status))]
    pub async fn update_status(
        &self,
        id: Uuid,
        input: UpdatePaymentStatusInput,
        auth_actor: Option<&str>,
    ) -> Result<payment::Model, ServiceError> {
        input.validate()?;
        let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;
        // Held until commit so a concurrent change cannot slip between check and write
        let existing = find_for_update::<payment::Entity, _>(&txn, id, "Payment").await?;
        let from = existing.status;
        let to = input.status;

        if let Err(e) = check_transition(self.policy, from, to) {
            warn!(payment_id = %id, %from, %to, error = %e, "payment transition rejected");
            return Err(e);
        }

        if from == to && input.notes.is_none() {
            return Ok(existing);
        }

        let actor = clean(input.actor)
            .or_else(|| auth_actor.map(str::to_string))
            .unwrap_or_else(|| self.default_actor.clone());
        let now = Utc::now();

        let mut active: payment::ActiveModel = existing.into();
        if from != to {
            active.status = Set(to);
            match to {
                PaymentStatus::Approved => {
                    active.approved_at = Set(Some(now));
                    active.approved_by = Set(Some(actor.clone()));
                }
                PaymentStatus::Paid => {
                    active.paid_at = Set(Some(now));
                    active.paid_by = Set(Some(actor.clone()));
                }
                PaymentStatus::Pending => {}
            }
        }
        if input.notes.is_some() {
            active.notes = Set(clean(input.notes));
        }

        let updated = active.update(&txn).await.map_err(ServiceError::db_error)?;
        txn.commit().await.map_err(|e| {
            error!(error = %e, "failed to commit payment status change");
            ServiceError::db_error(e)
        })?;

        if from != to {
            info!(payment_id = %id, %from, %to, %actor, "payment status changed");
            self.event_sender
                .send_or_log(Event::PaymentStatusChanged {
                    payment_id: id,
                    old_status: from.to_string(),
                    new_status: to.to_string(),
                    actor,
                })
                .await;
        }

        Ok(updated)
    }
}
