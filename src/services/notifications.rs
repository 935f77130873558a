use super::{clean, find_or_404, page_offset};
use crate::{
    db::DbPool,
    entities::{notification, NotificationKind},
    errors::ServiceError,
    events::{Event, EventSender},
};
use metrics::counter;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Message posted from the website's contact form.
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
#[schema(example = json!({
    "name": "Lee Jiwon",
    "email": "jiwon@hanbit.example",
    "organization": "Hanbit Elementary School",
    "message": "Do you run robotics classes for 4th graders?"
}))]
pub struct ContactInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    #[validate(length(max = 200))]
    pub organization: Option<String>,
    #[validate(length(min = 1, max = 5000))]
    pub message: String,
}

/// Service for the admin inbox
#[derive(Clone)]
pub struct NotificationService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl NotificationService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Stores a contact-form message as an unread CONTACT notification.
    #[instrument(skip(self, input))]
    pub async fn submit_contact(
        &self,
        input: ContactInput,
    ) -> Result<notification::Model, ServiceError> {
        input.validate()?;
        let name = input.name.trim().to_string();
        let organization = clean(input.organization);

        let title = match &organization {
            Some(org) => format!("Contact from {name} ({org})"),
            None => format!("Contact from {name}"),
        };
        let payload = json!({
            "name": name,
            "email": input.email.trim(),
            "phone": clean(input.phone),
            "organization": organization,
        });

        let created = notification::ActiveModel {
            id: Set(Uuid::new_v4()),
            kind: Set(NotificationKind::Contact),
            title: Set(title),
            message: Set(input.message),
            payload: Set(Some(payload)),
            is_read: Set(false),
            ..Default::default()
        }
        .insert(self.db_pool.as_ref())
        .await
        .map_err(ServiceError::db_error)?;

        counter!("eduops_contact.received", 1);
        info!(notification_id = %created.id, "contact message received");
        self.event_sender
            .send_or_log(Event::ContactReceived {
                notification_id: created.id,
            })
            .await;

        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn list_notifications(
        &self,
        page: u64,
        limit: u64,
        unread_only: bool,
    ) -> Result<(Vec<notification::Model>, u64), ServiceError> {
        let db = self.db_pool.as_ref();
        let mut query = notification::Entity::find();
        if unread_only {
            query = query.filter(notification::Column::IsRead.eq(false));
        }

        let total = query.clone().count(db).await.map_err(ServiceError::db_error)?;
        let items = query
            .order_by_desc(notification::Column::CreatedAt)
            .offset(page_offset(page, limit))
            .limit(limit)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok((items, total))
    }

    #[instrument(skip(self))]
    pub async fn mark_read(&self, id: Uuid) -> Result<notification::Model, ServiceError> {
        let db = self.db_pool.as_ref();
        let existing = find_or_404::<notification::Entity, _>(db, id, "Notification").await?;
        if existing.is_read {
            return Ok(existing);
        }

        let mut active: notification::ActiveModel = existing.into();
        active.is_read = Set(true);
        active.update(db).await.map_err(ServiceError::db_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing;

    fn contact() -> ContactInput {
        ContactInput {
            name: "Lee Jiwon".into(),
            email: "jiwon@hanbit.example".into(),
            phone: Some("010-0000-0000".into()),
            organization: Some("Hanbit Elementary".into()),
            message: "Hello".into(),
        }
    }

    #[tokio::test]
    async fn contact_becomes_unread_notification() {
        let svc = NotificationService::new(testing::db().await, testing::events());
        let created = svc.submit_contact(contact()).await.unwrap();

        assert_eq!(created.kind, NotificationKind::Contact);
        assert!(!created.is_read);
        let payload = created.payload.clone().unwrap();
        assert_eq!(payload["organization"], "Hanbit Elementary");
        assert_eq!(payload["email"], "jiwon@hanbit.example");

        let (_, unread) = svc.list_notifications(1, 10, true).await.unwrap();
        assert_eq!(unread, 1);

        svc.mark_read(created.id).await.unwrap();
        let (_, unread) = svc.list_notifications(1, 10, true).await.unwrap();
        let (_, all) = svc.list_notifications(1, 10, false).await.unwrap();
        assert_eq!((unread, all), (0, 1));
    }

    #[tokio::test]
    async fn contact_requires_valid_email() {
        let svc = NotificationService::new(testing::db().await, testing::events());
        let mut bad = contact();
        bad.email = "nope".into();
        assert!(matches!(
            svc.submit_contact(bad).await,
            Err(ServiceError::ValidationError(_))
        ));
    }
}
