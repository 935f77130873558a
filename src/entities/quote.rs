use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{entity::prelude::*, ActiveValue::Set};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Priced proposal attached to a school request. Quotes are never updated
/// after insert.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "quotes")]
#[schema(as = Quote)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Display number, e.g. `QT-2025-001`.
    #[sea_orm(unique)]
    pub quote_number: String,
    pub request_id: Uuid,
    pub session_fee: Decimal,
    pub transport_fee: Decimal,
    pub material_cost: Decimal,
    pub assistant_fee: Decimal,
    pub overhead: Decimal,
    pub subtotal: Decimal,
    pub margin_rate: Decimal,
    pub margin_amount: Decimal,
    pub vat: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub final_total: Decimal,
    pub valid_until: NaiveDate,
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::school_request::Entity",
        from = "Column::RequestId",
        to = "super::school_request::Column::Id",
        on_delete = "Cascade"
    )]
    SchoolRequest,
}

impl Related<super::school_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SchoolRequest.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        if insert {
            active_model.created_at = Set(Utc::now());
        }
        Ok(active_model)
    }
}
