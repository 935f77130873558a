use super::{find_or_404, page_offset};
use crate::{db::DbPool, entities::notice, errors::ServiceError};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Select, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct CreateNoticeInput {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 20000))]
    pub content: String,
    #[serde(default)]
    pub is_pinned: bool,
    #[serde(default = "published_by_default")]
    pub is_published: bool,
}

fn published_by_default() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate, ToSchema)]
pub struct UpdateNoticeInput {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 20000))]
    pub content: Option<String>,
    pub is_pinned: Option<bool>,
    pub is_published: Option<bool>,
}

/// Pinned notices first, then newest first.
fn board_order(query: Select<notice::Entity>) -> Select<notice::Entity> {
    query
        .order_by_desc(notice::Column::IsPinned)
        .order_by_desc(notice::Column::CreatedAt)
}

/// Service for website notices
#[derive(Clone)]
pub struct NoticeService {
    db_pool: Arc<DbPool>,
}

impl NoticeService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self, input), fields(title = %input.title))]
    pub async fn create_notice(
        &self,
        input: CreateNoticeInput,
    ) -> Result<notice::Model, ServiceError> {
        input.validate()?;

        let created = notice::ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(input.title.trim().to_string()),
            content: Set(input.content),
            is_pinned: Set(input.is_pinned),
            is_published: Set(input.is_published),
            ..Default::default()
        }
        .insert(self.db_pool.as_ref())
        .await
        .map_err(ServiceError::db_error)?;

        info!(notice_id = %created.id, "notice created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get_notice(&self, id: Uuid) -> Result<notice::Model, ServiceError> {
        find_or_404::<notice::Entity, _>(self.db_pool.as_ref(), id, "Notice").await
    }

    #[instrument(skip(self))]
    pub async fn list_notices(
        &self,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<notice::Model>, u64), ServiceError> {
        self.page_of(notice::Entity::find(), page, limit).await
    }

    /// Published notices for the public website.
    #[instrument(skip(self))]
    pub async fn list_published(
        &self,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<notice::Model>, u64), ServiceError> {
        let query = notice::Entity::find().filter(notice::Column::IsPublished.eq(true));
        self.page_of(query, page, limit).await
    }

    async fn page_of(
        &self,
        query: Select<notice::Entity>,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<notice::Model>, u64), ServiceError> {
        let db = self.db_pool.as_ref();
        let total = query.clone().count(db).await.map_err(ServiceError::db_error)?;
        let notices = board_order(query)
            .offset(page_offset(page, limit))
            .limit(limit)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;
        Ok((notices, total))
    }

    #[instrument(skip(self, input))]
    pub async fn update_notice(
        &self,
        id: Uuid,
        input: UpdateNoticeInput,
    ) -> Result<notice::Model, ServiceError> {
        input.validate()?;
        let db = self.db_pool.as_ref();
        let existing = find_or_404::<notice::Entity, _>(db, id, "Notice").await?;
        let mut active: notice::ActiveModel = existing.into();

        if let Some(title) = input.title {
            active.title = Set(title.trim().to_string());
        }
        if let Some(content) = input.content {
            active.content = Set(content);
        }
        if let Some(pinned) = input.is_pinned {
            active.is_pinned = Set(pinned);
        }
        if let Some(published) = input.is_published {
            active.is_published = Set(published);
        }

        active.update(db).await.map_err(ServiceError::db_error)
    }

    #[instrument(skip(self))]
    pub async fn delete_notice(&self, id: Uuid) -> Result<(), ServiceError> {
        let db = self.db_pool.as_ref();
        let existing = find_or_404::<notice::Entity, _>(db, id, "Notice").await?;
        existing.delete(db).await.map_err(ServiceError::db_error)?;
        info!(notice_id = %id, "notice deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing;

    fn notice(title: &str, pinned: bool, published: bool) -> CreateNoticeInput {
        CreateNoticeInput {
            title: title.into(),
            content: "Body".into(),
            is_pinned: pinned,
            is_published: published,
        }
    }

    #[tokio::test]
    async fn public_board_hides_drafts_and_pins_first() {
        let svc = NoticeService::new(testing::db().await);
        svc.create_notice(notice("Older", false, true)).await.unwrap();
        svc.create_notice(notice("Pinned", true, true)).await.unwrap();
        svc.create_notice(notice("Draft", false, false)).await.unwrap();

        let (board, total) = svc.list_published(1, 10).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(board[0].title, "Pinned");
        assert_eq!(board[1].title, "Older");

        let (_, all) = svc.list_notices(1, 10).await.unwrap();
        assert_eq!(all, 3);
    }

    #[test]
    fn notices_publish_unless_told_otherwise() {
        let input: CreateNoticeInput =
            serde_json::from_str(r#"{"title": "Hello", "content": "World"}"#).unwrap();
        assert!(input.is_published);
        assert!(!input.is_pinned);
    }
}
