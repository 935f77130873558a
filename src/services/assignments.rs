use super::{clean, find_for_update, find_or_404, page_offset, payments::PaymentService};
use crate::{
    db::DbPool,
    entities::{
        assignment, instructor, payment, school_request, AssignmentStatus, SchoolRequestStatus,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct CreateAssignmentInput {
    pub request_id: Uuid,
    pub instructor_id: Uuid,
    pub session_date: NaiveDate,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate, ToSchema)]
pub struct CompleteAssignmentInput {
    /// When present, a PENDING payment of this amount is raised for the
    /// instructor.
    pub payment_amount: Option<Decimal>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

/// Filters for listing assignments
#[derive(Debug, Clone, Copy, Default)]
pub struct AssignmentFilter {
    pub instructor_id: Option<Uuid>,
    pub request_id: Option<Uuid>,
    pub status: Option<AssignmentStatus>,
}

/// Result of completing an assignment
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CompletedAssignment {
    pub assignment: assignment::Model,
    pub payment: Option<payment::Model>,
}

/// Service for scheduling instructors onto school requests
#[derive(Clone)]
pub struct AssignmentService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl AssignmentService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self, input), fields(request_id = %input.request_id, instructor_id = %input.instructor_id))]
    pub async fn create_assignment(
        &self,
        input: CreateAssignmentInput,
    ) -> Result<assignment::Model, ServiceError> {
        input.validate()?;
        let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;

        let request =
            find_for_update::<school_request::Entity, _>(&txn, input.request_id, "School request")
                .await?;
        if request.status.is_terminal() {
            return Err(ServiceError::InvalidOperation(format!(
                "School request {} is {}; instructors cannot be assigned",
                request.request_number, request.status
            )));
        }

        let instructor =
            find_or_404::<instructor::Entity, _>(&txn, input.instructor_id, "Instructor").await?;
        if !instructor.is_active {
            return Err(ServiceError::InvalidOperation(format!(
                "Instructor {} is inactive",
                instructor.id
            )));
        }

        let created = assignment::ActiveModel {
            id: Set(Uuid::new_v4()),
            request_id: Set(request.id),
            instructor_id: Set(instructor.id),
            session_date: Set(input.session_date),
            status: Set(AssignmentStatus::Scheduled),
            notes: Set(clean(input.notes)),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(ServiceError::db_error)?;
        txn.commit().await.map_err(|e| {
            error!(error = %e, "failed to commit assignment");
            ServiceError::db_error(e)
        })?;

        info!(assignment_id = %created.id, session_date = %created.session_date, "assignment scheduled");
        self.event_sender
            .send_or_log(Event::AssignmentScheduled {
                assignment_id: created.id,
                instructor_id: created.instructor_id,
                session_date: created.session_date,
            })
            .await;

        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get_assignment(&self, id: Uuid) -> Result<assignment::Model, ServiceError> {
        find_or_404::<assignment::Entity, _>(self.db_pool.as_ref(), id, "Assignment").await
    }

    #[instrument(skip(self))]
    pub async fn list_assignments(
        &self,
        page: u64,
        limit: u64,
        filter: AssignmentFilter,
    ) -> Result<(Vec<assignment::Model>, u64), ServiceError> {
        let db = self.db_pool.as_ref();
        let mut query = assignment::Entity::find();
        if let Some(instructor_id) = filter.instructor_id {
            query = query.filter(assignment::Column::InstructorId.eq(instructor_id));
        }
        if let Some(request_id) = filter.request_id {
            query = query.filter(assignment::Column::RequestId.eq(request_id));
        }
        if let Some(status) = filter.status {
            query = query.filter(assignment::Column::Status.eq(status));
        }

        let total = query.clone().count(db).await.map_err(ServiceError::db_error)?;
        let assignments = query
            .order_by_asc(assignment::Column::SessionDate)
            .offset(page_offset(page, limit))
            .limit(limit)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok((assignments, total))
    }

    /// Marks the session delivered, closes the request and optionally raises
    /// the instructor's payment, in one transaction.
    #[instrument(skip(self, input))]
    pub async fn complete_assignment(
        &self,
        id: Uuid,
        input: CompleteAssignmentInput,
    ) -> Result<CompletedAssignment, ServiceError> {
        input.validate()?;
        let db = self.db_pool.as_ref();
        let txn = db.begin().await.map_err(ServiceError::db_error)?;

        let existing = find_for_update::<assignment::Entity, _>(&txn, id, "Assignment").await?;
        if !existing.status.is_open() {
            return Err(ServiceError::InvalidStatus(format!(
                "Assignment {id} is {} and cannot be completed",
                existing.status
            )));
        }

        let request = find_for_update::<school_request::Entity, _>(
            &txn,
            existing.request_id,
            "School request",
        )
        .await?;
        if request.status != SchoolRequestStatus::Completed {
            if !request.status.can_transition_to(SchoolRequestStatus::Completed) {
                return Err(ServiceError::InvalidStatus(format!(
                    "School request {} is {}; approve it before completing the session",
                    request.request_number, request.status
                )));
            }
            let mut active: school_request::ActiveModel = request.into();
            active.status = Set(SchoolRequestStatus::Completed);
            active.update(&txn).await.map_err(ServiceError::db_error)?;
        }

        let mut active: assignment::ActiveModel = existing.into();
        active.status = Set(AssignmentStatus::Completed);
        active.completed_at = Set(Some(Utc::now()));
        if input.notes.is_some() {
            active.notes = Set(clean(input.notes));
        }
        let completed = active.update(&txn).await.map_err(ServiceError::db_error)?;

        let payment = match input.payment_amount {
            Some(amount) => {
                Some(PaymentService::insert_pending(&txn, &completed, amount, None).await?)
            }
            None => None,
        };

        txn.commit().await.map_err(|e| {
            error!(error = %e, "failed to commit assignment completion");
            ServiceError::db_error(e)
        })?;

        info!(assignment_id = %id, payment = ?payment.as_ref().map(|p| p.id), "assignment completed");
        self.event_sender
            .send_or_log(Event::AssignmentCompleted {
                assignment_id: id,
                request_id: completed.request_id,
                payment_id: payment.as_ref().map(|p| p.id),
            })
            .await;
        if let Some(payment) = &payment {
            self.event_sender
                .send_or_log(Event::PaymentCreated {
                    payment_id: payment.id,
                    instructor_id: payment.instructor_id,
                    amount: payment.amount,
                })
                .await;
        }

        Ok(CompletedAssignment {
            assignment: completed,
            payment,
        })
    }

    #[instrument(skip(self))]
    pub async fn cancel_assignment(&self, id: Uuid) -> Result<assignment::Model, ServiceError> {
        let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;
        let existing = find_for_update::<assignment::Entity, _>(&txn, id, "Assignment").await?;
        if !existing.status.is_open() {
            return Err(ServiceError::InvalidStatus(format!(
                "Assignment {id} is {} and cannot be cancelled",
                existing.status
            )));
        }

        let mut active: assignment::ActiveModel = existing.into();
        active.status = Set(AssignmentStatus::Cancelled);
        let cancelled = active.update(&txn).await.map_err(ServiceError::db_error)?;
        txn.commit().await.map_err(|e| {
            error!(error = %e, "failed to commit assignment cancellation");
            ServiceError::db_error(e)
        })?;

        info!(assignment_id = %id, "assignment cancelled");
        self.event_sender
            .send_or_log(Event::AssignmentCancelled(id))
            .await;
        Ok(cancelled)
    }
}
