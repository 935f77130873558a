//! sea-orm entities, one module per table.

pub mod assignment;
pub mod document_sequence;
pub mod instructor;
pub mod notice;
pub mod notification;
pub mod payment;
pub mod program;
pub mod quotation;
pub mod quote;
pub mod school;
pub mod school_request;

pub use assignment::AssignmentStatus;
pub use notification::NotificationKind;
pub use payment::PaymentStatus;
pub use school_request::SchoolRequestStatus;
