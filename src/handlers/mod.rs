pub mod assignments;
pub mod common;
pub mod instructors;
pub mod notices;
pub mod notifications;
pub mod payments;
pub mod programs;
pub mod public;
pub mod quotations;
pub mod quotes;
pub mod school_requests;
pub mod schools;

use crate::{
    config::AppConfig,
    db::DbPool,
    errors::ServiceError,
    events::EventSender,
    services::{
        assignments::AssignmentService, instructors::InstructorService, notices::NoticeService,
        notifications::NotificationService, payments::PaymentService, programs::ProgramService,
        quotations::QuotationService, quotes::QuoteService,
        school_requests::SchoolRequestService, schools::SchoolService, NumberingSettings,
    },
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub schools: Arc<SchoolService>,
    pub programs: Arc<ProgramService>,
    pub instructors: Arc<InstructorService>,
    pub school_requests: Arc<SchoolRequestService>,
    pub quotes: Arc<QuoteService>,
    pub quotations: Arc<QuotationService>,
    pub assignments: Arc<AssignmentService>,
    pub payments: Arc<PaymentService>,
    pub notices: Arc<NoticeService>,
    pub notifications: Arc<NotificationService>,
}

impl AppServices {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        config: &AppConfig,
    ) -> Result<Self, ServiceError> {
        let numbering = NumberingSettings::from_config(config)?;

        Ok(Self {
            schools: Arc::new(SchoolService::new(db_pool.clone())),
            programs: Arc::new(ProgramService::new(db_pool.clone())),
            instructors: Arc::new(InstructorService::new(db_pool.clone())),
            school_requests: Arc::new(SchoolRequestService::new(
                db_pool.clone(),
                event_sender.clone(),
                numbering,
            )),
            quotes: Arc::new(QuoteService::new(
                db_pool.clone(),
                event_sender.clone(),
                numbering,
            )),
            quotations: Arc::new(QuotationService::new(
                db_pool.clone(),
                event_sender.clone(),
                numbering,
            )),
            assignments: Arc::new(AssignmentService::new(
                db_pool.clone(),
                event_sender.clone(),
            )),
            payments: Arc::new(PaymentService::new(
                db_pool.clone(),
                event_sender.clone(),
                config.payment_transition_policy,
                config.default_actor.clone(),
            )),
            notices: Arc::new(NoticeService::new(db_pool.clone())),
            notifications: Arc::new(NotificationService::new(db_pool, event_sender)),
        })
    }
}
