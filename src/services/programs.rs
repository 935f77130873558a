use super::{clean, find_or_404, page_offset};
use crate::{db::DbPool, entities::program, errors::ServiceError};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
#[schema(example = json!({
    "title": "Coding with Robots",
    "category": "STEM",
    "duration_minutes": 90,
    "base_fee": "150000",
    "is_active": true
}))]
pub struct CreateProgramInput {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 100))]
    pub category: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[validate(range(min = 1, max = 1440))]
    pub duration_minutes: Option<i32>,
    pub base_fee: Option<Decimal>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate, ToSchema)]
pub struct UpdateProgramInput {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 100))]
    pub category: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[validate(range(min = 1, max = 1440))]
    pub duration_minutes: Option<i32>,
    pub base_fee: Option<Decimal>,
    pub is_active: Option<bool>,
}

fn check_fee(fee: Option<Decimal>) -> Result<(), ServiceError> {
    match fee {
        Some(f) if f < Decimal::ZERO => Err(ServiceError::ValidationError(
            "base_fee must not be negative".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Starter catalog inserted by `eduops-admin seed-programs`.
pub fn starter_catalog() -> Vec<CreateProgramInput> {
    [
        ("Coding with Robots", "STEM", 90, dec!(150000)),
        ("Drone Flight Basics", "STEM", 120, dec!(180000)),
        ("Creative Writing Workshop", "Humanities", 80, dec!(120000)),
        ("Career Exploration Day", "Careers", 100, dec!(130000)),
        ("Financial Literacy for Teens", "Life Skills", 60, dec!(100000)),
    ]
    .into_iter()
    .map(|(title, category, minutes, fee)| CreateProgramInput {
        title: title.to_string(),
        category: Some(category.to_string()),
        description: None,
        duration_minutes: Some(minutes),
        base_fee: Some(fee),
        is_active: Some(true),
    })
    .collect()
}

/// Service for the program catalog
#[derive(Clone)]
pub struct ProgramService {
    db_pool: Arc<DbPool>,
}

impl ProgramService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self, input), fields(title = %input.title))]
    pub async fn create_program(
        &self,
        input: CreateProgramInput,
    ) -> Result<program::Model, ServiceError> {
        input.validate()?;
        check_fee(input.base_fee)?;

        let model = program::ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(input.title.trim().to_string()),
            category: Set(clean(input.category)),
            description: Set(clean(input.description)),
            duration_minutes: Set(input.duration_minutes),
            base_fee: Set(input.base_fee),
            is_active: Set(input.is_active.unwrap_or(true)),
            ..Default::default()
        };

        let created = model
            .insert(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;
        info!(program_id = %created.id, "program created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get_program(&self, id: Uuid) -> Result<program::Model, ServiceError> {
        find_or_404::<program::Entity, _>(self.db_pool.as_ref(), id, "Program").await
    }

    /// Lists programs by title. `active_only` hides retired programs.
    #[instrument(skip(self))]
    pub async fn list_programs(
        &self,
        page: u64,
        limit: u64,
        active_only: bool,
    ) -> Result<(Vec<program::Model>, u64), ServiceError> {
        let db = self.db_pool.as_ref();
        let mut query = program::Entity::find();
        if active_only {
            query = query.filter(program::Column::IsActive.eq(true));
        }

        let total = query.clone().count(db).await.map_err(ServiceError::db_error)?;
        let programs = query
            .order_by_asc(program::Column::Title)
            .offset(page_offset(page, limit))
            .limit(limit)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok((programs, total))
    }

    #[instrument(skip(self, input))]
    pub async fn update_program(
        &self,
        id: Uuid,
        input: UpdateProgramInput,
    ) -> Result<program::Model, ServiceError> {
        input.validate()?;
        check_fee(input.base_fee)?;

        let db = self.db_pool.as_ref();
        let existing = find_or_404::<program::Entity, _>(db, id, "Program").await?;
        let mut active: program::ActiveModel = existing.into();

        if let Some(title) = input.title {
            active.title = Set(title.trim().to_string());
        }
        if input.category.is_some() {
            active.category = Set(clean(input.category));
        }
        if input.description.is_some() {
            active.description = Set(clean(input.description));
        }
        if input.duration_minutes.is_some() {
            active.duration_minutes = Set(input.duration_minutes);
        }
        if input.base_fee.is_some() {
            active.base_fee = Set(input.base_fee);
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }

        active.update(db).await.map_err(ServiceError::db_error)
    }

    #[instrument(skip(self))]
    pub async fn delete_program(&self, id: Uuid) -> Result<(), ServiceError> {
        let db = self.db_pool.as_ref();
        let existing = find_or_404::<program::Entity, _>(db, id, "Program").await?;
        existing.delete(db).await.map_err(ServiceError::db_error)?;
        info!(program_id = %id, "program deleted");
        Ok(())
    }

    /// Inserts each program whose title is not on file yet. Returns how many
    /// were added.
    #[instrument(skip(self, catalog))]
    pub async fn seed_catalog(&self, catalog: Vec<CreateProgramInput>) -> Result<usize, ServiceError> {
        let mut added = 0;
        for input in catalog {
            let exists = program::Entity::find()
                .filter(program::Column::Title.eq(input.title.trim()))
                .count(self.db_pool.as_ref())
                .await
                .map_err(ServiceError::db_error)?
                > 0;
            if !exists {
                self.create_program(input).await?;
                added += 1;
            }
        }
        info!(added, "program catalog seeded");
        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing;

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let svc = ProgramService::new(testing::db().await);
        let first = svc.seed_catalog(starter_catalog()).await.unwrap();
        let second = svc.seed_catalog(starter_catalog()).await.unwrap();

        assert_eq!(first, starter_catalog().len());
        assert_eq!(second, 0);
    }

    #[tokio::test]
    async fn active_filter_hides_retired_programs() {
        let svc = ProgramService::new(testing::db().await);
        svc.seed_catalog(starter_catalog()).await.unwrap();
        let (programs, _) = svc.list_programs(1, 50, false).await.unwrap();

        svc.update_program(
            programs[0].id,
            UpdateProgramInput {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let (_, all) = svc.list_programs(1, 50, false).await.unwrap();
        let (_, active) = svc.list_programs(1, 50, true).await.unwrap();
        assert_eq!(all, active + 1);
    }

    #[tokio::test]
    async fn negative_fee_is_rejected() {
        let svc = ProgramService::new(testing::db().await);
        let mut input = starter_catalog().remove(0);
        input.base_fee = Some(dec!(-1));
        assert!(matches!(
            svc.create_program(input).await,
            Err(ServiceError::ValidationError(_))
        ));
    }
}
