// Core pipeline: numbering, pricing and the status machines they drive
pub mod numbering;
pub mod pricing;
pub mod quotations;
pub mod quotes;
pub mod school_requests;

// Delivery and settlement
pub mod assignments;
pub mod payments;

// Reference data
pub mod instructors;
pub mod programs;
pub mod schools;

// Website content and inbox
pub mod notices;
pub mod notifications;

use crate::{config::AppConfig, errors::ServiceError};
use numbering::BusinessCalendar;
use sea_orm::{ConnectionTrait, EntityTrait, PrimaryKeyTrait, QuerySelect, Select};

/// Settings shared by services that allocate display numbers.
#[derive(Debug, Clone, Copy)]
pub struct NumberingSettings {
    pub calendar: BusinessCalendar,
    pub max_attempts: u32,
}

impl NumberingSettings {
    pub fn from_config(cfg: &AppConfig) -> Result<Self, ServiceError> {
        Ok(Self {
            calendar: BusinessCalendar::from_offset_minutes(cfg.business_utc_offset_minutes)?,
            max_attempts: cfg.numbering_max_retries,
        })
    }
}

impl Default for NumberingSettings {
    fn default() -> Self {
        Self {
            calendar: BusinessCalendar::default(),
            max_attempts: 3,
        }
    }
}

/// Normalizes an optional free-text field: trims it and drops blanks.
pub(crate) fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Loads a row by primary key or fails with `NotFound` naming `label`.
pub(crate) async fn find_or_404<E, C>(
    conn: &C,
    id: <E::PrimaryKey as PrimaryKeyTrait>::ValueType,
    label: &str,
) -> Result<E::Model, ServiceError>
where
    E: EntityTrait,
    C: ConnectionTrait,
    <E::PrimaryKey as PrimaryKeyTrait>::ValueType: std::fmt::Display + Clone,
{
    E::find_by_id(id.clone())
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("{label} {id} not found")))
}

/// `SELECT .. FOR UPDATE` by primary key. SQLite has no row locks and
/// serializes writers instead, so the clause is dropped there.
pub(crate) fn locked_by_id<E>(id: <E::PrimaryKey as PrimaryKeyTrait>::ValueType) -> Select<E>
where
    E: EntityTrait,
{
    E::find_by_id(id).lock_exclusive()
}

/// Like [`find_or_404`] but takes `FOR UPDATE` on the row, so a status
/// check and the write that follows it see the same state. Run it inside the
/// transaction that performs the write.
pub(crate) async fn find_for_update<E, C>(
    conn: &C,
    id: <E::PrimaryKey as PrimaryKeyTrait>::ValueType,
    label: &str,
) -> Result<E::Model, ServiceError>
where
    E: EntityTrait,
    C: ConnectionTrait,
    <E::PrimaryKey as PrimaryKeyTrait>::ValueType: std::fmt::Display + Clone,
{
    locked_by_id::<E>(id.clone())
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("{label} {id} not found")))
}

/// Converts 1-based page/limit into an offset, capped at what a signed
/// `OFFSET` accepts.
pub(crate) fn page_offset(page: u64, limit: u64) -> u64 {
    page.max(1)
        .saturating_sub(1)
        .saturating_mul(limit)
        .min(i64::MAX as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_trims_and_drops_blank() {
        assert_eq!(clean(Some("  x ".into())), Some("x".into()));
        assert_eq!(clean(Some("   ".into())), None);
        assert_eq!(clean(None), None);
    }

    #[test]
    fn status_reads_lock_the_row_on_postgres() {
        use crate::entities::payment;
        use sea_orm::{DbBackend, QueryTrait};

        let id = uuid::Uuid::new_v4();
        let pg = locked_by_id::<payment::Entity>(id)
            .build(DbBackend::Postgres)
            .to_string();
        assert!(pg.contains("FOR UPDATE"), "{pg}");

        let sqlite = locked_by_id::<payment::Entity>(id)
            .build(DbBackend::Sqlite)
            .to_string();
        assert!(!sqlite.contains("FOR UPDATE"), "{sqlite}");
    }

    #[test]
    fn page_offset_is_one_based() {
        assert_eq!(page_offset(1, 20), 0);
        assert_eq!(page_offset(3, 20), 40);
        assert_eq!(page_offset(0, 20), 0);
        assert_eq!(page_offset(u64::MAX, 100), i64::MAX as u64);
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::db::{self, DbConfig, DbPool};
    use crate::events::{process_events, EventSender};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    /// Fresh migrated in-memory database. One pooled connection keeps the
    /// memory database alive and serializes transactions.
    pub async fn db() -> Arc<DbPool> {
        let pool = db::establish_connection_with_config(&DbConfig {
            url: "sqlite::memory:".into(),
            max_connections: 1,
            ..Default::default()
        })
        .await
        .expect("sqlite memory connection");
        db::run_migrations(&pool).await.expect("migrations");
        Arc::new(pool)
    }

    pub fn events() -> Arc<EventSender> {
        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(process_events(rx));
        Arc::new(EventSender::new(tx))
    }
}
