//! Display-number allocation for quotations, quotes and school requests.
//!
//! Numbers are `prefix + "-" + sequence` where the prefix encodes the reset
//! window (a day for quotations, a year for quotes and requests). Allocation
//! goes through the `document_sequences` table with an atomic
//! upsert-and-increment inside the caller's transaction, and the unique
//! index on each number column backs it up: a violating insert rolls the
//! whole transaction back and [`with_number_retry`] runs it again.

use crate::{
    entities::{document_sequence, quotation, quote, school_request},
    errors::ServiceError,
};
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Offset, Utc};
use metrics::counter;
use sea_orm::{
    sea_query::{Expr, OnConflict},
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter,
    QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use tracing::{debug, warn};

const SEPARATOR: char = '-';

/// Kind of numbered document.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum DocumentKind {
    /// Stand-alone quotation, numbered per day: `2025/03/14-7`.
    Quotation,
    /// Quote attached to a school request, numbered per year: `QT-2025-001`.
    Quote,
    /// School request, numbered per year: `REQ-2025-012`.
    Request,
}

impl DocumentKind {
    /// Minimum digit width of the sequence part.
    pub fn padding(self) -> usize {
        match self {
            DocumentKind::Quotation => 0,
            DocumentKind::Quote | DocumentKind::Request => 3,
        }
    }
}

/// Reset-window prefix for `kind` on `date`.
pub fn prefix_for(kind: DocumentKind, date: NaiveDate) -> String {
    match kind {
        DocumentKind::Quotation => date.format("%Y/%m/%d").to_string(),
        DocumentKind::Quote => format!("QT-{}", date.year()),
        DocumentKind::Request => format!("REQ-{}", date.year()),
    }
}

/// Renders a display number. Padding is a minimum width, so values past 999
/// print in full.
pub fn format_number(kind: DocumentKind, prefix: &str, seq: i64) -> String {
    format!(
        "{prefix}{SEPARATOR}{seq:0width$}",
        width = kind.padding()
    )
}

/// Resolves "today" in the business time zone, which decides the window.
#[derive(Debug, Clone, Copy)]
pub struct BusinessCalendar {
    offset: FixedOffset,
}

impl BusinessCalendar {
    pub fn from_offset_minutes(minutes: i32) -> Result<Self, ServiceError> {
        FixedOffset::east_opt(minutes * 60)
            .map(|offset| Self { offset })
            .ok_or_else(|| {
                ServiceError::InternalError(format!("invalid business UTC offset: {minutes} min"))
            })
    }

    pub fn date_of(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.offset).date_naive()
    }

    pub fn today(&self) -> NaiveDate {
        self.date_of(Utc::now())
    }
}

impl Default for BusinessCalendar {
    fn default() -> Self {
        Self { offset: Utc.fix() }
    }
}

/// Highest sequence value already used under `prefix`, including numbers
/// written outside the allocator (imports, restores, manual fixes).
async fn highest_existing<C>(conn: &C, kind: DocumentKind, prefix: &str) -> Result<i64, DbErr>
where
    C: ConnectionTrait,
{
    let pattern = format!("{prefix}{SEPARATOR}");
    let numbers: Vec<String> = match kind {
        DocumentKind::Quotation => {
            quotation::Entity::find()
                .select_only()
                .column(quotation::Column::QuotationNumber)
                .filter(quotation::Column::QuotationNumber.starts_with(pattern.as_str()))
                .into_tuple::<String>()
                .all(conn)
                .await?
        }
        DocumentKind::Quote => {
            quote::Entity::find()
                .select_only()
                .column(quote::Column::QuoteNumber)
                .filter(quote::Column::QuoteNumber.starts_with(pattern.as_str()))
                .into_tuple::<String>()
                .all(conn)
                .await?
        }
        DocumentKind::Request => {
            school_request::Entity::find()
                .select_only()
                .column(school_request::Column::RequestNumber)
                .filter(school_request::Column::RequestNumber.starts_with(pattern.as_str()))
                .into_tuple::<String>()
                .all(conn)
                .await?
        }
    };

    Ok(numbers
        .iter()
        .filter_map(|number| number.strip_prefix(pattern.as_str()))
        .filter_map(|seq| seq.parse::<i64>().ok())
        .max()
        .unwrap_or(0))
}

/// Allocates the next sequence value of `kind` for the window containing
/// `date`. Must run on the same transaction that inserts the document.
pub async fn next_sequence<C>(conn: &C, kind: DocumentKind, date: NaiveDate) -> Result<i64, DbErr>
where
    C: ConnectionTrait,
{
    let scope = prefix_for(kind, date);
    let existing = highest_existing(conn, kind, &scope).await?;

    let seed = document_sequence::ActiveModel {
        scope: Set(scope.clone()),
        last_value: Set(1),
        updated_at: Set(Utc::now()),
    };

    // Takes the row lock until the surrounding transaction ends.
    document_sequence::Entity::insert(seed)
        .on_conflict(
            OnConflict::column(document_sequence::Column::Scope)
                .value(
                    document_sequence::Column::LastValue,
                    Expr::col((
                        document_sequence::Entity,
                        document_sequence::Column::LastValue,
                    ))
                    .add(1),
                )
                .update_column(document_sequence::Column::UpdatedAt)
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;

    let row = document_sequence::Entity::find_by_id(scope.clone())
        .one(conn)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound(format!("document sequence {scope}")))?;

    // Counter lags numbers created outside the allocator.
    let value = if row.last_value <= existing {
        let bumped = existing + 1;
        let mut active: document_sequence::ActiveModel = row.into();
        active.last_value = Set(bumped);
        active.updated_at = Set(Utc::now());
        active.update(conn).await?;
        bumped
    } else {
        row.last_value
    };

    counter!("eduops_numbering.allocated", 1, "kind" => kind.to_string());
    debug!(%kind, %scope, value, "allocated sequence value");
    Ok(value)
}

/// Allocates and renders the next display number.
pub async fn next_number<C>(conn: &C, kind: DocumentKind, date: NaiveDate) -> Result<String, DbErr>
where
    C: ConnectionTrait,
{
    let seq = next_sequence(conn, kind, date).await?;
    Ok(format_number(kind, &prefix_for(kind, date), seq))
}

/// Next number without allocating it. Informational only; a concurrent
/// writer may take it first.
pub async fn preview_number<C>(conn: &C, kind: DocumentKind, date: NaiveDate) -> Result<String, DbErr>
where
    C: ConnectionTrait,
{
    let scope = prefix_for(kind, date);
    let existing = highest_existing(conn, kind, &scope).await?;
    let last = document_sequence::Entity::find_by_id(scope.clone())
        .one(conn)
        .await?
        .map(|row| row.last_value)
        .unwrap_or(0);

    Ok(format_number(kind, &scope, last.max(existing) + 1))
}

/// Runs `attempt` until it stops failing with a unique-constraint violation,
/// at most `max_attempts` times. Each attempt must open its own transaction.
pub async fn with_number_retry<T, F, Fut>(
    kind: DocumentKind,
    max_attempts: u32,
    mut attempt: F,
) -> Result<T, ServiceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    let max_attempts = max_attempts.max(1);

    for n in 1..=max_attempts {
        match attempt().await {
            Err(err) if err.is_unique_violation() => {
                counter!("eduops_numbering.retries", 1, "kind" => kind.to_string());
                warn!(%kind, attempt = n, max_attempts, "display number collision, retrying");
            }
            outcome => return outcome,
        }
    }

    counter!("eduops_numbering.exhausted", 1, "kind" => kind.to_string());
    Err(ServiceError::Conflict(format!(
        "could not allocate a unique {kind} number after {max_attempts} attempts"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[rstest]
    #[case(DocumentKind::Quotation, 7, "2025/03/14-7")]
    #[case(DocumentKind::Quote, 1, "QT-2025-001")]
    #[case(DocumentKind::Request, 12, "REQ-2025-012")]
    #[case(DocumentKind::Quote, 1234, "QT-2025-1234")]
    #[case(DocumentKind::Quotation, 1, "2025/03/14-1")]
    fn formats_per_kind(#[case] kind: DocumentKind, #[case] seq: i64, #[case] expected: &str) {
        let prefix = prefix_for(kind, date(2025, 3, 14));
        assert_eq!(format_number(kind, &prefix, seq), expected);
    }

    #[test]
    fn yearly_prefix_rolls_over_at_new_year() {
        assert_eq!(prefix_for(DocumentKind::Quote, date(2024, 12, 31)), "QT-2024");
        assert_eq!(prefix_for(DocumentKind::Quote, date(2025, 1, 1)), "QT-2025");
    }

    #[test]
    fn business_calendar_uses_offset() {
        let cal = BusinessCalendar::from_offset_minutes(540).unwrap();
        // 16:00 UTC on Dec 31 is already Jan 1 at UTC+9
        let at = Utc.with_ymd_and_hms(2024, 12, 31, 16, 0, 0).unwrap();
        assert_eq!(cal.date_of(at), date(2025, 1, 1));
        assert_eq!(BusinessCalendar::default().date_of(at), date(2024, 12, 31));
        assert!(BusinessCalendar::from_offset_minutes(100_000).is_err());
    }

    #[test]
    fn kind_parses_from_cli_names() {
        assert_eq!("quote".parse::<DocumentKind>().unwrap(), DocumentKind::Quote);
        assert_eq!(
            "Quotation".parse::<DocumentKind>().unwrap(),
            DocumentKind::Quotation
        );
        assert!("invoice".parse::<DocumentKind>().is_err());
    }

    #[tokio::test]
    async fn retry_stops_on_non_conflict_errors() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_number_retry(DocumentKind::Quote, 3, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ServiceError::ValidationError("bad".into())) }
        })
        .await;

        assert!(matches!(result, Err(ServiceError::ValidationError(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retry_returns_first_success() {
        let calls = AtomicU32::new(0);
        let result = with_number_retry(DocumentKind::Request, 3, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move { Ok::<_, ServiceError>(n) }
        })
        .await
        .unwrap();

        assert_eq!(result, 0);
    }
}
