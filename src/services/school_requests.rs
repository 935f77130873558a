use super::{
    clean, find_for_update, find_or_404,
    numbering::{self, with_number_retry, DocumentKind},
    page_offset,
    schools::{CreateSchoolInput, SchoolService},
    NumberingSettings,
};
use crate::{
    db::DbPool,
    entities::{program, quote, school, school_request, SchoolRequestStatus},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::NaiveDate;
use metrics::counter;
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
use validator::{Validate, ValidationError};

/// A school's request for a program, as posted from the public website.
///
/// Exactly one of `school_id` and `school` identifies the requester; an
/// inline `school` is registered together with the request.
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
#[validate(schema(function = "validate_requester"))]
#[schema(example = json!({
    "school": {"name": "Hanbit Elementary School", "email": "office@hanbit.example"},
    "desired_date": "2025-05-20",
    "student_count": 28,
    "budget": "300000"
}))]
pub struct SubmitRequestInput {
    pub school_id: Option<Uuid>,
    #[validate]
    pub school: Option<CreateSchoolInput>,
    pub program_id: Option<Uuid>,
    pub desired_date: Option<NaiveDate>,
    pub alternate_date: Option<NaiveDate>,
    #[validate(range(min = 1, max = 10000))]
    pub student_count: Option<i32>,
    pub budget: Option<Decimal>,
    #[validate(length(max = 5000))]
    pub notes: Option<String>,
}

fn validate_requester(input: &SubmitRequestInput) -> Result<(), ValidationError> {
    match (&input.school_id, &input.school) {
        (Some(_), None) | (None, Some(_)) => {}
        _ => return Err(ValidationError::new("exactly one of school_id or school is required")),
    }
    if matches!(input.budget, Some(b) if b < Decimal::ZERO) {
        return Err(ValidationError::new("budget must not be negative"));
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct UpdateRequestStatusInput {
    pub status: SchoolRequestStatus,
}

/// Service for school requests
#[derive(Clone)]
pub struct SchoolRequestService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    numbering: NumberingSettings,
}

impl SchoolRequestService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        numbering: NumberingSettings,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            numbering,
        }
    }

    /// Records a request in SUBMITTED state under the next `REQ-YYYY-NNN`.
    #[instrument(skip(self, input))]
    pub async fn submit_request(
        &self,
        input: SubmitRequestInput,
    ) -> Result<school_request::Model, ServiceError> {
        input.validate()?;
        let db = self.db_pool.as_ref();

        if let Some(school_id) = input.school_id {
            find_or_404::<school::Entity, _>(db, school_id, "School").await?;
        }
        if let Some(program_id) = input.program_id {
            find_or_404::<program::Entity, _>(db, program_id, "Program").await?;
        }

        let today = self.numbering.calendar.today();
        let created = with_number_retry(DocumentKind::Request, self.numbering.max_attempts, || {
            let input = input.clone();
            async move {
                let txn = db.begin().await.map_err(ServiceError::db_error)?;

                let school_id = match (input.school_id, input.school) {
                    (Some(id), _) => id,
                    (None, Some(school)) => SchoolService::insert_on(&txn, school).await?.id,
                    (None, None) => {
                        return Err(ServiceError::ValidationError(
                            "school_id or school is required".to_string(),
                        ))
                    }
                };

                let request_number = numbering::next_number(&txn, DocumentKind::Request, today)
                    .await
                    .map_err(ServiceError::db_error)?;

                let request = school_request::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    request_number: Set(request_number),
                    school_id: Set(school_id),
                    program_id: Set(input.program_id),
                    desired_date: Set(input.desired_date),
                    alternate_date: Set(input.alternate_date),
                    student_count: Set(input.student_count),
                    budget: Set(input.budget),
                    notes: Set(clean(input.notes)),
                    status: Set(SchoolRequestStatus::Submitted),
                    ..Default::default()
                }
                .insert(&txn)
                .await
                .map_err(ServiceError::db_error)?;

                txn.commit().await.map_err(|e| {
                    error!(error = %e, "failed to commit school request");
                    ServiceError::db_error(e)
                })?;
                Ok(request)
            }
        })
        .await?;

        counter!("eduops_requests.submitted", 1);
        info!(
            request_id = %created.id,
            request_number = %created.request_number,
            "school request submitted"
        );
        self.event_sender
            .send_or_log(Event::SchoolRequestSubmitted {
                request_id: created.id,
                request_number: created.request_number.clone(),
                school_id: created.school_id,
            })
            .await;

        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get_request(&self, id: Uuid) -> Result<school_request::Model, ServiceError> {
        find_or_404::<school_request::Entity, _>(self.db_pool.as_ref(), id, "School request")
            .await
    }

    /// Newest first, optionally narrowed to one status.
    #[instrument(skip(self))]
    pub async fn list_requests(
        &self,
        page: u64,
        limit: u64,
        status: Option<SchoolRequestStatus>,
    ) -> Result<(Vec<school_request::Model>, u64), ServiceError> {
        let db = self.db_pool.as_ref();
        let mut query = school_request::Entity::find();
        if let Some(status) = status {
            query = query.filter(school_request::Column::Status.eq(status));
        }

        let total = query.clone().count(db).await.map_err(ServiceError::db_error)?;
        let requests = query
            .order_by_desc(school_request::Column::CreatedAt)
            .order_by_desc(school_request::Column::RequestNumber)
            .offset(page_offset(page, limit))
            .limit(limit)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok((requests, total))
    }

    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        id: Uuid,
        status: SchoolRequestStatus,
    ) -> Result<school_request::Model, ServiceError> {
        let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;
        let existing =
            find_for_update::<school_request::Entity, _>(&txn, id, "School request").await?;
        let old_status = existing.status;

        if !old_status.can_transition_to(status) {
            return Err(ServiceError::InvalidStatus(format!(
                "School request cannot move from {old_status} to {status}"
            )));
        }
        if old_status == status {
            return Ok(existing);
        }

        let mut active: school_request::ActiveModel = existing.into();
        active.status = Set(status);
        let updated = active.update(&txn).await.map_err(ServiceError::db_error)?;
        txn.commit().await.map_err(|e| {
            error!(error = %e, "failed to commit school request status change");
            ServiceError::db_error(e)
        })?;

        info!(request_id = %id, from = %old_status, to = %status, "school request status changed");
        self.event_sender
            .send_or_log(Event::SchoolRequestStatusChanged {
                request_id: id,
                old_status: old_status.to_string(),
                new_status: status.to_string(),
            })
            .await;

        Ok(updated)
    }

    /// Quotes issued for a request, newest first.
    #[instrument(skip(self))]
    pub async fn list_quotes(&self, id: Uuid) -> Result<Vec<quote::Model>, ServiceError> {
        let db = self.db_pool.as_ref();
        find_or_404::<school_request::Entity, _>(db, id, "School request").await?;

        quote::Entity::find()
            .filter(quote::Column::RequestId.eq(id))
            .order_by_desc(quote::Column::QuoteNumber)
            .all(db)
            .await
            .map_err(ServiceError::db_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing;
    use assert_matches::assert_matches;

    fn service(db: Arc<DbPool>) -> SchoolRequestService {
        SchoolRequestService::new(db, testing::events(), NumberingSettings::default())
    }

    fn inline(name: &str) -> SubmitRequestInput {
        SubmitRequestInput {
            school_id: None,
            school: Some(CreateSchoolInput {
                name: name.to_string(),
                region: None,
                address: None,
                contact_name: None,
                phone: None,
                email: Some("office@school.example".into()),
            }),
            program_id: None,
            desired_date: None,
            alternate_date: None,
            student_count: Some(25),
            budget: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn submit_with_inline_school_numbers_sequentially() {
        let db = testing::db().await;
        let svc = service(db.clone());

        let first = svc.submit_request(inline("Hanbit")).await.unwrap();
        let second = svc.submit_request(inline("Daehan")).await.unwrap();

        let year = NumberingSettings::default().calendar.today().format("%Y");
        assert_eq!(first.request_number, format!("REQ-{year}-001"));
        assert_eq!(second.request_number, format!("REQ-{year}-002"));
        assert_eq!(first.status, SchoolRequestStatus::Submitted);

        let schools = school::Entity::find().count(db.as_ref()).await.unwrap();
        assert_eq!(schools, 2);
    }

    #[tokio::test]
    async fn unknown_program_is_rejected_before_any_write() {
        let db = testing::db().await;
        let svc = service(db.clone());

        let mut input = inline("Hanbit");
        input.program_id = Some(Uuid::new_v4());
        assert_matches!(svc.submit_request(input).await, Err(ServiceError::NotFound(_)));

        let schools = school::Entity::find().count(db.as_ref()).await.unwrap();
        assert_eq!(schools, 0);
    }

    #[tokio::test]
    async fn requester_must_be_given_once() {
        let svc = service(testing::db().await);
        let mut both = inline("Hanbit");
        both.school_id = Some(Uuid::new_v4());
        assert_matches!(svc.submit_request(both).await, Err(ServiceError::ValidationError(_)));

        let mut neither = inline("Hanbit");
        neither.school = None;
        assert_matches!(svc.submit_request(neither).await, Err(ServiceError::ValidationError(_)));
    }

    #[tokio::test]
    async fn status_changes_follow_the_lifecycle() {
        let svc = service(testing::db().await);
        let req = svc.submit_request(inline("Hanbit")).await.unwrap();

        assert_matches!(
            svc.update_status(req.id, SchoolRequestStatus::Completed).await,
            Err(ServiceError::InvalidStatus(_))
        );

        let same = svc
            .update_status(req.id, SchoolRequestStatus::Submitted)
            .await
            .unwrap();
        assert_eq!(same.updated_at, None);

        let cancelled = svc
            .update_status(req.id, SchoolRequestStatus::Cancelled)
            .await
            .unwrap();
        assert_eq!(cancelled.status, SchoolRequestStatus::Cancelled);
    }
}
