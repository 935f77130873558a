use super::{clean, find_or_404, page_offset};
use crate::{
    db::DbPool,
    entities::{assignment, instructor},
    errors::ServiceError,
};
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
    "name": "Park Minseo",
    "email": "minseo@instructors.example",
    "specialty": "Robotics"
}))]
pub struct CreateInstructorInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    #[validate(length(max = 100))]
    pub specialty: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate, ToSchema)]
pub struct UpdateInstructorInput {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    #[validate(length(max = 100))]
    pub specialty: Option<String>,
    pub is_active: Option<bool>,
}

/// Service for managing instructors
#[derive(Clone)]
pub struct InstructorService {
    db_pool: Arc<DbPool>,
}

impl InstructorService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_instructor(
        &self,
        input: CreateInstructorInput,
    ) -> Result<instructor::Model, ServiceError> {
        input.validate()?;

        let model = instructor::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name.trim().to_string()),
            email: Set(clean(input.email)),
            phone: Set(clean(input.phone)),
            specialty: Set(clean(input.specialty)),
            is_active: Set(input.is_active.unwrap_or(true)),
            ..Default::default()
        };

        let created = model
            .insert(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;
        info!(instructor_id = %created.id, "instructor created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get_instructor(&self, id: Uuid) -> Result<instructor::Model, ServiceError> {
        find_or_404::<instructor::Entity, _>(self.db_pool.as_ref(), id, "Instructor").await
    }

    #[instrument(skip(self))]
    pub async fn list_instructors(
        &self,
        page: u64,
        limit: u64,
        active: Option<bool>,
    ) -> Result<(Vec<instructor::Model>, u64), ServiceError> {
        let db = self.db_pool.as_ref();
        let mut query = instructor::Entity::find();
        if let Some(active) = active {
            query = query.filter(instructor::Column::IsActive.eq(active));
        }

        let total = query.clone().count(db).await.map_err(ServiceError::db_error)?;
        let instructors = query
            .order_by_asc(instructor::Column::Name)
            .offset(page_offset(page, limit))
            .limit(limit)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok((instructors, total))
    }

    #[instrument(skip(self, input))]
    pub async fn update_instructor(
        &self,
        id: Uuid,
        input: UpdateInstructorInput,
    ) -> Result<instructor::Model, ServiceError> {
        input.validate()?;
        let db = self.db_pool.as_ref();
        let existing = find_or_404::<instructor::Entity, _>(db, id, "Instructor").await?;
        let mut active: instructor::ActiveModel = existing.into();

        if let Some(name) = input.name {
            active.name = Set(name.trim().to_string());
        }
        if input.email.is_some() {
            active.email = Set(clean(input.email));
        }
        if input.phone.is_some() {
            active.phone = Set(clean(input.phone));
        }
        if input.specialty.is_some() {
            active.specialty = Set(clean(input.specialty));
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }

        active.update(db).await.map_err(ServiceError::db_error)
    }

    /// Deletes an instructor with no assignments; otherwise deactivate them.
    #[instrument(skip(self))]
    pub async fn delete_instructor(&self, id: Uuid) -> Result<(), ServiceError> {
        let db = self.db_pool.as_ref();
        let existing = find_or_404::<instructor::Entity, _>(db, id, "Instructor").await?;

        let assignments = existing
            .find_related(assignment::Entity)
            .count(db)
            .await
            .map_err(ServiceError::db_error)?;
        if assignments > 0 {
            return Err(ServiceError::InvalidOperation(format!(
                "Instructor {id} has assignments; deactivate instead of deleting"
            )));
        }

        existing.delete(db).await.map_err(ServiceError::db_error)?;
        info!(instructor_id = %id, "instructor deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing;

    fn input(name: &str, active: bool) -> CreateInstructorInput {
        CreateInstructorInput {
            name: name.into(),
            email: None,
            phone: None,
            specialty: Some("Robotics".into()),
            is_active: Some(active),
        }
    }

    #[tokio::test]
    async fn active_filter() {
        let svc = InstructorService::new(testing::db().await);
        svc.create_instructor(input("Kim", true)).await.unwrap();
        svc.create_instructor(input("Lee", false)).await.unwrap();

        let (_, total) = svc.list_instructors(1, 20, None).await.unwrap();
        assert_eq!(total, 2);
        let (active, total) = svc.list_instructors(1, 20, Some(true)).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(active[0].name, "Kim");
    }

    #[tokio::test]
    async fn invalid_email_is_rejected() {
        let svc = InstructorService::new(testing::db().await);
        let mut bad = input("Kim", true);
        bad.email = Some("not-an-email".into());
        assert!(matches!(
            svc.create_instructor(bad).await,
            Err(ServiceError::ValidationError(_))
        ));
    }
}
