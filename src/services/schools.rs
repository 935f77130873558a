use super::{clean, find_or_404, page_offset};
use crate::{db::DbPool, entities::school, errors::ServiceError};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Input for registering a school
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
#[schema(example = json!({
    "name": "Hanbit Elementary School",
    "region": "Seoul",
    "contact_name": "Lee Jiwon",
    "phone": "02-555-0100",
    "email": "office@hanbit.example"
}))]
pub struct CreateSchoolInput {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 100))]
    pub region: Option<String>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
    #[validate(length(max = 100))]
    pub contact_name: Option<String>,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
}

/// Input for updating a school; absent fields are left untouched
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate, ToSchema)]
pub struct UpdateSchoolInput {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 100))]
    pub region: Option<String>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
    #[validate(length(max = 100))]
    pub contact_name: Option<String>,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
}

/// Service for managing schools
#[derive(Clone)]
pub struct SchoolService {
    db_pool: Arc<DbPool>,
}

impl SchoolService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Inserts a school on `conn`, which may be an open transaction.
    pub(crate) async fn insert_on<C>(
        conn: &C,
        input: CreateSchoolInput,
    ) -> Result<school::Model, ServiceError>
    where
        C: ConnectionTrait,
    {
        input.validate()?;
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(ServiceError::ValidationError(
                "School name cannot be blank".to_string(),
            ));
        }

        let model = school::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            region: Set(clean(input.region)),
            address: Set(clean(input.address)),
            contact_name: Set(clean(input.contact_name)),
            phone: Set(clean(input.phone)),
            email: Set(clean(input.email)),
            ..Default::default()
        };

        model.insert(conn).await.map_err(ServiceError::db_error)
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_school(
        &self,
        input: CreateSchoolInput,
    ) -> Result<school::Model, ServiceError> {
        let created = Self::insert_on(self.db_pool.as_ref(), input).await?;
        info!(school_id = %created.id, "school created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get_school(&self, id: Uuid) -> Result<school::Model, ServiceError> {
        find_or_404::<school::Entity, _>(self.db_pool.as_ref(), id, "School").await
    }

    /// Lists schools alphabetically, optionally filtered by a name fragment.
    #[instrument(skip(self))]
    pub async fn list_schools(
        &self,
        page: u64,
        limit: u64,
        search: Option<String>,
    ) -> Result<(Vec<school::Model>, u64), ServiceError> {
        let db = self.db_pool.as_ref();
        let mut query = school::Entity::find();
        if let Some(term) = clean(search) {
            query = query.filter(school::Column::Name.contains(term.as_str()));
        }

        let total = query.clone().count(db).await.map_err(ServiceError::db_error)?;
        let schools = query
            .order_by_asc(school::Column::Name)
            .offset(page_offset(page, limit))
            .limit(limit)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok((schools, total))
    }

    #[instrument(skip(self, input))]
    pub async fn update_school(
        &self,
        id: Uuid,
        input: UpdateSchoolInput,
    ) -> Result<school::Model, ServiceError> {
        input.validate()?;
        let db = self.db_pool.as_ref();
        let existing = find_or_404::<school::Entity, _>(db, id, "School").await?;
        let mut active: school::ActiveModel = existing.into();

        if let Some(name) = input.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(ServiceError::ValidationError(
                    "School name cannot be blank".to_string(),
                ));
            }
            active.name = Set(name);
        }
        if input.region.is_some() {
            active.region = Set(clean(input.region));
        }
        if input.address.is_some() {
            active.address = Set(clean(input.address));
        }
        if input.contact_name.is_some() {
            active.contact_name = Set(clean(input.contact_name));
        }
        if input.phone.is_some() {
            active.phone = Set(clean(input.phone));
        }
        if input.email.is_some() {
            active.email = Set(clean(input.email));
        }

        active.update(db).await.map_err(ServiceError::db_error)
    }

    /// Deletes a school that has no requests on file.
    #[instrument(skip(self))]
    pub async fn delete_school(&self, id: Uuid) -> Result<(), ServiceError> {
        let db = self.db_pool.as_ref();
        let existing = find_or_404::<school::Entity, _>(db, id, "School").await?;

        let requests = existing
            .find_related(crate::entities::school_request::Entity)
            .count(db)
            .await
            .map_err(ServiceError::db_error)?;
        if requests > 0 {
            return Err(ServiceError::InvalidOperation(format!(
                "School {id} has {requests} request(s) and cannot be deleted"
            )));
        }

        existing.delete(db).await.map_err(ServiceError::db_error)?;
        info!(school_id = %id, "school deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing;
    use assert_matches::assert_matches;

    fn input(name: &str) -> CreateSchoolInput {
        CreateSchoolInput {
            name: name.to_string(),
            region: Some(" Busan ".into()),
            address: None,
            contact_name: None,
            phone: None,
            email: None,
        }
    }

    #[tokio::test]
    async fn create_update_delete() {
        let svc = SchoolService::new(testing::db().await);

        let created = svc.create_school(input("Namsan Middle")).await.unwrap();
        assert_eq!(created.region.as_deref(), Some("Busan"));

        let updated = svc
            .update_school(
                created.id,
                UpdateSchoolInput {
                    phone: Some("051-000-0000".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.phone.as_deref(), Some("051-000-0000"));
        assert_eq!(updated.name, "Namsan Middle");
        assert!(updated.updated_at.is_some());

        svc.delete_school(created.id).await.unwrap();
        assert_matches!(
            svc.get_school(created.id).await,
            Err(ServiceError::NotFound(_))
        );
    }

    #[tokio::test]
    async fn list_filters_by_name() {
        let svc = SchoolService::new(testing::db().await);
        svc.create_school(input("Hanbit Elementary")).await.unwrap();
        svc.create_school(input("Daehan High")).await.unwrap();

        let (all, total) = svc.list_schools(1, 10, None).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(all[0].name, "Daehan High");

        let (found, total) = svc
            .list_schools(1, 10, Some("Hanbit".into()))
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(found[0].name, "Hanbit Elementary");
    }

    #[tokio::test]
    async fn rejects_blank_name() {
        let svc = SchoolService::new(testing::db().await);
        assert_matches!(
            svc.create_school(input("   ")).await,
            Err(ServiceError::ValidationError(_))
        );
    }
}
