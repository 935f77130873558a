use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{entity::prelude::*, ActiveValue::Set};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Lifecycle of a school's service request.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum SchoolRequestStatus {
    #[sea_orm(string_value = "SUBMITTED")]
    Submitted,
    #[sea_orm(string_value = "QUOTED")]
    Quoted,
    #[sea_orm(string_value = "APPROVED")]
    Approved,
    #[sea_orm(string_value = "COMPLETED")]
    Completed,
    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,
}

impl SchoolRequestStatus {
    /// Forward-only transition table. Re-setting the current status is
    /// accepted as a no-op.
    pub fn can_transition_to(self, next: SchoolRequestStatus) -> bool {
        use SchoolRequestStatus::*;

        if self == next {
            return true;
        }

        matches!(
            (self, next),
            (Submitted, Quoted)
                | (Quoted, Approved)
                | (Approved, Completed)
                | (Submitted | Quoted | Approved, Cancelled)
        )
    }

    /// A quote may be attached (or re-attached) only before approval.
    pub fn accepts_quote(self) -> bool {
        matches!(self, Self::Submitted | Self::Quoted)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "school_requests")]
#[schema(as = SchoolRequest)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Display number, e.g. `REQ-2025-012`.
    #[sea_orm(unique)]
    pub request_number: String,
    pub school_id: Uuid,
    pub program_id: Option<Uuid>,
    pub desired_date: Option<NaiveDate>,
    pub alternate_date: Option<NaiveDate>,
    pub student_count: Option<i32>,
    pub budget: Option<Decimal>,
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
    pub status: SchoolRequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::school::Entity",
        from = "Column::SchoolId",
        to = "super::school::Column::Id"
    )]
    School,
    #[sea_orm(
        belongs_to = "super::program::Entity",
        from = "Column::ProgramId",
        to = "super::program::Column::Id"
    )]
    Program,
    #[sea_orm(has_many = "super::quote::Entity")]
    Quotes,
    #[sea_orm(has_many = "super::assignment::Entity")]
    Assignments,
}

impl Related<super::school::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::School.def()
    }
}

impl Related<super::program::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Program.def()
    }
}

impl Related<super::quote::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Quotes.def()
    }
}

impl Related<super::assignment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Assignments.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        let now = Utc::now();

        if insert {
            active_model.created_at = Set(now);
        } else {
            active_model.updated_at = Set(Some(now));
        }

        Ok(active_model)
    }
}

#[cfg(test)]
mod tests {
    use super::SchoolRequestStatus::{self, *};
    use rstest::rstest;
    use std::str::FromStr;

    #[rstest]
    #[case(Submitted, Quoted, true)]
    #[case(Quoted, Approved, true)]
    #[case(Approved, Completed, true)]
    #[case(Submitted, Cancelled, true)]
    #[case(Approved, Cancelled, true)]
    #[case(Quoted, Quoted, true)]
    #[case(Submitted, Approved, false)]
    #[case(Submitted, Completed, false)]
    #[case(Completed, Cancelled, false)]
    #[case(Cancelled, Submitted, false)]
    #[case(Approved, Quoted, false)]
    fn transition_table(
        #[case] from: SchoolRequestStatus,
        #[case] to: SchoolRequestStatus,
        #[case] allowed: bool,
    ) {
        assert_eq!(from.can_transition_to(to), allowed);
    }

    #[test]
    fn quoting_is_allowed_before_approval_only() {
        assert!(Submitted.accepts_quote());
        assert!(Quoted.accepts_quote());
        assert!(!Approved.accepts_quote());
        assert!(!Completed.accepts_quote());
        assert!(!Cancelled.accepts_quote());
    }

    #[test]
    fn wire_format_is_upper_case() {
        assert_eq!(Submitted.to_string(), "SUBMITTED");
        assert_eq!(SchoolRequestStatus::from_str("quoted").unwrap(), Quoted);
        assert_eq!(serde_json::to_string(&Cancelled).unwrap(), "\"CANCELLED\"");
    }
}
