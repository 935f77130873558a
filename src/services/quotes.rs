use super::{
    clean, find_for_update, find_or_404,
    numbering::{self, with_number_retry, DocumentKind},
    page_offset,
    pricing::{derive_quote, FeeInputs},
    NumberingSettings,
};
use crate::{
    db::DbPool,
    entities::{quote, school_request, SchoolRequestStatus},
    errors::ServiceError,
    events::{Event, EventSender},
};
use metrics::counter;
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

/// Pricing a school request.
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
#[schema(example = json!({
    "request_id": "5a3f2b8e-0c1d-4e5f-8a9b-1c2d3e4f5a6b",
    "session_fee": "100000",
    "transport_fee": "20000",
    "margin_rate": "0.15",
    "valid_days": 30
}))]
pub struct CreateQuoteInput {
    pub request_id: Uuid,
    #[serde(flatten)]
    pub fees: FeeInputs,
    #[validate(length(max = 5000))]
    pub notes: Option<String>,
}

/// Service for quotes issued against school requests
#[derive(Clone)]
pub struct QuoteService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    numbering: NumberingSettings,
}

impl QuoteService {
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

    /// Prices the request, stores the quote under the next `QT-YYYY-NNN` and
    /// marks the request QUOTED, all in one transaction.
    #[instrument(skip(self, input), fields(request_id = %input.request_id))]
    pub async fn create_quote(
        &self,
        input: CreateQuoteInput,
        actor: &str,
    ) -> Result<quote::Model, ServiceError> {
        input.validate()?;
        let today = self.numbering.calendar.today();
        let breakdown = derive_quote(&input.fees, today)?;
        let notes = clean(input.notes);
        let request_id = input.request_id;
        let db = self.db_pool.as_ref();

        let created = with_number_retry(DocumentKind::Quote, self.numbering.max_attempts, || {
            let breakdown = breakdown.clone();
            let notes = notes.clone();
            async move {
                let txn = db.begin().await.map_err(ServiceError::db_error)?;

                // Locked so a cancellation cannot land between the check and the QUOTED write
                let request =
                    find_for_update::<school_request::Entity, _>(&txn, request_id, "School request")
                        .await?;
                if !request.status.accepts_quote() {
                    return Err(ServiceError::InvalidOperation(format!(
                        "School request {} is {} and can no longer be quoted",
                        request.request_number, request.status
                    )));
                }

                let quote_number = numbering::next_number(&txn, DocumentKind::Quote, today)
                    .await
                    .map_err(ServiceError::db_error)?;

                let quote = quote::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    quote_number: Set(quote_number),
                    request_id: Set(request_id),
                    session_fee: Set(breakdown.session_fee),
                    transport_fee: Set(breakdown.transport_fee),
                    material_cost: Set(breakdown.material_cost),
                    assistant_fee: Set(breakdown.assistant_fee),
                    overhead: Set(breakdown.overhead),
                    subtotal: Set(breakdown.subtotal),
                    margin_rate: Set(breakdown.margin_rate),
                    margin_amount: Set(breakdown.margin_amount),
                    vat: Set(breakdown.vat),
                    discount: Set(breakdown.discount),
                    total: Set(breakdown.total),
                    final_total: Set(breakdown.final_total),
                    valid_until: Set(breakdown.valid_until),
                    notes: Set(notes),
                    created_by: Set(actor.to_string()),
                    ..Default::default()
                }
                .insert(&txn)
                .await
                .map_err(ServiceError::db_error)?;

                if request.status != SchoolRequestStatus::Quoted {
                    let mut active: school_request::ActiveModel = request.into();
                    active.status = Set(SchoolRequestStatus::Quoted);
                    active.update(&txn).await.map_err(ServiceError::db_error)?;
                }

                txn.commit().await.map_err(|e| {
                    error!(error = %e, "failed to commit quote");
                    ServiceError::db_error(e)
                })?;
                Ok(quote)
            }
        })
        .await?;

        counter!("eduops_quotes.created", 1);
        info!(
            quote_id = %created.id,
            quote_number = %created.quote_number,
            final_total = %created.final_total,
            "quote created"
        );
        self.event_sender
            .send_or_log(Event::QuoteCreated {
                quote_id: created.id,
                request_id,
                quote_number: created.quote_number.clone(),
                final_total: created.final_total,
            })
            .await;

        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get_quote(&self, id: Uuid) -> Result<quote::Model, ServiceError> {
        find_or_404::<quote::Entity, _>(self.db_pool.as_ref(), id, "Quote").await
    }

    #[instrument(skip(self))]
    pub async fn get_by_number(&self, number: &str) -> Result<quote::Model, ServiceError> {
        quote::Entity::find()
            .filter(quote::Column::QuoteNumber.eq(number))
            .one(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Quote {number} not found")))
    }

    #[instrument(skip(self))]
    pub async fn list_quotes(
        &self,
        page: u64,
        limit: u64,
        request_id: Option<Uuid>,
    ) -> Result<(Vec<quote::Model>, u64), ServiceError> {
        let db = self.db_pool.as_ref();
        let mut query = quote::Entity::find();
        if let Some(request_id) = request_id {
            query = query.filter(quote::Column::RequestId.eq(request_id));
        }

        let total = query.clone().count(db).await.map_err(ServiceError::db_error)?;
        let quotes = query
            .order_by_desc(quote::Column::CreatedAt)
            .order_by_desc(quote::Column::QuoteNumber)
            .offset(page_offset(page, limit))
            .limit(limit)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok((quotes, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{
        school_requests::{SchoolRequestService, SubmitRequestInput},
        schools::CreateSchoolInput,
        testing,
    };
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    async fn submitted(db: Arc<DbPool>) -> school_request::Model {
        SchoolRequestService::new(db, testing::events(), NumberingSettings::default())
            .submit_request(SubmitRequestInput {
                school_id: None,
                school: Some(CreateSchoolInput {
                    name: "Hanbit Elementary".into(),
                    region: None,
                    address: None,
                    contact_name: None,
                    phone: None,
                    email: None,
                }),
                program_id: None,
                desired_date: None,
                alternate_date: None,
                student_count: None,
                budget: None,
                notes: None,
            })
            .await
            .unwrap()
    }

    fn fees() -> FeeInputs {
        FeeInputs {
            session_fee: Some(dec!(100000)),
            transport_fee: Some(dec!(20000)),
            margin_rate: Some(dec!(0.15)),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn quoting_marks_request_quoted() {
        let db = testing::db().await;
        let request = submitted(db.clone()).await;
        let svc = QuoteService::new(db.clone(), testing::events(), NumberingSettings::default());

        let quote = svc
            .create_quote(
                CreateQuoteInput {
                    request_id: request.id,
                    fees: fees(),
                    notes: None,
                },
                "admin",
            )
            .await
            .unwrap();

        assert_eq!(quote.final_total, dec!(151800));
        assert!(quote.quote_number.ends_with("-001"));
        assert_eq!(quote.created_by, "admin");

        let reloaded = school_request::Entity::find_by_id(request.id)
            .one(db.as_ref())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.status, SchoolRequestStatus::Quoted);

        let found = svc.get_by_number(&quote.quote_number).await.unwrap();
        assert_eq!(found.id, quote.id);
    }

    #[tokio::test]
    async fn cancelled_request_cannot_be_quoted() {
        let db = testing::db().await;
        let request = submitted(db.clone()).await;
        SchoolRequestService::new(db.clone(), testing::events(), NumberingSettings::default())
            .update_status(request.id, SchoolRequestStatus::Cancelled)
            .await
            .unwrap();

        let svc = QuoteService::new(db.clone(), testing::events(), NumberingSettings::default());
        let result = svc
            .create_quote(
                CreateQuoteInput {
                    request_id: request.id,
                    fees: fees(),
                    notes: None,
                },
                "admin",
            )
            .await;
        assert_matches!(result, Err(ServiceError::InvalidOperation(_)));

        let (_, total) = svc.list_quotes(1, 10, None).await.unwrap();
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn missing_request_is_not_found() {
        let svc = QuoteService::new(
            testing::db().await,
            testing::events(),
            NumberingSettings::default(),
        );
        let result = svc
            .create_quote(
                CreateQuoteInput {
                    request_id: Uuid::new_v4(),
                    fees: fees(),
                    notes: None,
                },
                "admin",
            )
            .await;
        assert_matches!(result, Err(ServiceError::NotFound(_)));
    }
}
