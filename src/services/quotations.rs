use super::{
    clean, find_or_404,
    numbering::{self, with_number_retry, DocumentKind},
    page_offset,
    pricing::{derive_quotation, LineInput},
    NumberingSettings,
};
use crate::{
    db::DbPool,
    entities::quotation,
    errors::ServiceError,
    events::{Event, EventSender},
};
use metrics::counter;
use sea_orm::{
    ActiveModelTrait, EntityTrait, PaginatorTrait, QueryOrder, QuerySelect, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// A stand-alone quotation addressed to any organisation.
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
#[schema(example = json!({
    "recipient": "Daehan High School",
    "title": "Spring robotics camp",
    "items": [{"description": "Robotics workshop", "quantity": 2, "unit_price": "150000"}]
}))]
pub struct CreateQuotationInput {
    #[validate(length(min = 1, max = 200))]
    pub recipient: String,
    #[validate(length(max = 100))]
    pub contact_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 100))]
    pub items: Vec<LineInput>,
    #[validate(length(max = 5000))]
    pub notes: Option<String>,
}

/// Service for stand-alone quotations
#[derive(Clone)]
pub struct QuotationService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    numbering: NumberingSettings,
}

impl QuotationService {
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

    /// Prices the lines and stores the quotation under today's next
    /// `YYYY/MM/DD-N` number.
    #[instrument(skip(self, input), fields(recipient = %input.recipient))]
    pub async fn create_quotation(
        &self,
        input: CreateQuotationInput,
        actor: &str,
    ) -> Result<quotation::Model, ServiceError> {
        input.validate()?;
        let totals = derive_quotation(&input.items)?;
        let items = serde_json::to_value(&totals.items)
            .map_err(|e| ServiceError::InternalError(format!("failed to encode line items: {e}")))?;

        let today = self.numbering.calendar.today();
        let db = self.db_pool.as_ref();

        let created = with_number_retry(
            DocumentKind::Quotation,
            self.numbering.max_attempts,
            || {
                let input = input.clone();
                let items = items.clone();
                let totals = &totals;
                async move {
                    let txn = db.begin().await.map_err(ServiceError::db_error)?;

                    let quotation_number =
                        numbering::next_number(&txn, DocumentKind::Quotation, today)
                            .await
                            .map_err(ServiceError::db_error)?;

                    let quotation = quotation::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        quotation_number: Set(quotation_number),
                        recipient: Set(input.recipient.trim().to_string()),
                        contact_name: Set(clean(input.contact_name)),
                        email: Set(clean(input.email)),
                        phone: Set(clean(input.phone)),
                        title: Set(input.title.trim().to_string()),
                        items: Set(items),
                        supply_amount: Set(totals.supply_amount),
                        vat: Set(totals.vat),
                        total_amount: Set(totals.total_amount),
                        notes: Set(clean(input.notes)),
                        created_by: Set(actor.to_string()),
                        ..Default::default()
                    }
                    .insert(&txn)
                    .await
                    .map_err(ServiceError::db_error)?;

                    txn.commit().await.map_err(|e| {
                        error!(error = %e, "failed to commit quotation");
                        ServiceError::db_error(e)
                    })?;
                    Ok(quotation)
                }
            },
        )
        .await?;

        counter!("eduops_quotations.issued", 1);
        info!(
            quotation_id = %created.id,
            quotation_number = %created.quotation_number,
            total_amount = %created.total_amount,
            "quotation issued"
        );
        self.event_sender
            .send_or_log(Event::QuotationIssued {
                quotation_id: created.id,
                quotation_number: created.quotation_number.clone(),
                total_amount: created.total_amount,
            })
            .await;

        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get_quotation(&self, id: Uuid) -> Result<quotation::Model, ServiceError> {
        find_or_404::<quotation::Entity, _>(self.db_pool.as_ref(), id, "Quotation").await
    }

    #[instrument(skip(self))]
    pub async fn list_quotations(
        &self,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<quotation::Model>, u64), ServiceError> {
        let db = self.db_pool.as_ref();
        let total = quotation::Entity::find()
            .count(db)
            .await
            .map_err(ServiceError::db_error)?;
        let quotations = quotation::Entity::find()
            .order_by_desc(quotation::Column::CreatedAt)
            .offset(page_offset(page, limit))
            .limit(limit)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok((quotations, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn input() -> CreateQuotationInput {
        CreateQuotationInput {
            recipient: "Daehan High".into(),
            contact_name: None,
            email: None,
            phone: None,
            title: "Spring camp".into(),
            items: vec![
                LineInput {
                    description: "Robotics workshop".into(),
                    quantity: 2,
                    unit_price: dec!(150000),
                },
                LineInput {
                    description: "Kits".into(),
                    quantity: 30,
                    unit_price: dec!(5500),
                },
            ],
            notes: None,
        }
    }

    #[tokio::test]
    async fn numbers_restart_daily_and_store_items() {
        let svc = QuotationService::new(
            testing::db().await,
            testing::events(),
            NumberingSettings::default(),
        );

        let first = svc.create_quotation(input(), "admin").await.unwrap();
        let second = svc.create_quotation(input(), "admin").await.unwrap();

        let prefix = NumberingSettings::default()
            .calendar
            .today()
            .format("%Y/%m/%d")
            .to_string();
        assert_eq!(first.quotation_number, format!("{prefix}-1"));
        assert_eq!(second.quotation_number, format!("{prefix}-2"));

        assert_eq!(first.total_amount, dec!(511500));
        let items = first.line_items().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].amount, dec!(165000));
    }

    #[tokio::test]
    async fn skips_past_numbers_written_outside_the_allocator() {
        let db = testing::db().await;
        let svc = QuotationService::new(db.clone(), testing::events(), NumberingSettings::default());
        let prefix = NumberingSettings::default()
            .calendar
            .today()
            .format("%Y/%m/%d")
            .to_string();

        // An imported row holding the second number while the window is otherwise empty
        quotation::ActiveModel {
            id: Set(Uuid::new_v4()),
            quotation_number: Set(format!("{prefix}-2")),
            recipient: Set("Imported".into()),
            title: Set("Legacy".into()),
            items: Set(serde_json::json!([])),
            supply_amount: Set(Decimal::ZERO),
            vat: Set(Decimal::ZERO),
            total_amount: Set(Decimal::ZERO),
            created_by: Set("import".into()),
            ..Default::default()
        }
        .insert(db.as_ref())
        .await
        .unwrap();

        let first = svc.create_quotation(input(), "admin").await.unwrap();
        let second = svc.create_quotation(input(), "admin").await.unwrap();
        assert_eq!(first.quotation_number, format!("{prefix}-3"));
        assert_eq!(second.quotation_number, format!("{prefix}-4"));
    }

    #[tokio::test]
    async fn empty_items_are_rejected() {
        let svc = QuotationService::new(
            testing::db().await,
            testing::events(),
            NumberingSettings::default(),
        );
        let mut empty = input();
        empty.items.clear();
        assert!(matches!(
            svc.create_quotation(empty, "admin").await,
            Err(ServiceError::ValidationError(_))
        ));
    }
}
