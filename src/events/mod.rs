use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging instead of failing when the consumer is gone.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!(error = %e, "domain event dropped");
        }
    }
}

/// Domain events emitted after a write has committed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Event {
    SchoolRequestSubmitted {
        request_id: Uuid,
        request_number: String,
        school_id: Uuid,
    },
    SchoolRequestStatusChanged {
        request_id: Uuid,
        old_status: String,
        new_status: String,
    },
    QuoteCreated {
        quote_id: Uuid,
        request_id: Uuid,
        quote_number: String,
        final_total: Decimal,
    },
    QuotationIssued {
        quotation_id: Uuid,
        quotation_number: String,
        total_amount: Decimal,
    },
    AssignmentScheduled {
        assignment_id: Uuid,
        instructor_id: Uuid,
        session_date: NaiveDate,
    },
    AssignmentCompleted {
        assignment_id: Uuid,
        request_id: Uuid,
        payment_id: Option<Uuid>,
    },
    AssignmentCancelled(Uuid),
    PaymentCreated {
        payment_id: Uuid,
        instructor_id: Uuid,
        amount: Decimal,
    },
    PaymentStatusChanged {
        payment_id: Uuid,
        old_status: String,
        new_status: String,
        actor: String,
    },
    ContactReceived {
        notification_id: Uuid,
    },
}

impl Event {
    /// Stable name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Event::SchoolRequestSubmitted { .. } => "school_request.submitted",
            Event::SchoolRequestStatusChanged { .. } => "school_request.status_changed",
            Event::QuoteCreated { .. } => "quote.created",
            Event::QuotationIssued { .. } => "quotation.issued",
            Event::AssignmentScheduled { .. } => "assignment.scheduled",
            Event::AssignmentCompleted { .. } => "assignment.completed",
            Event::AssignmentCancelled(_) => "assignment.cancelled",
            Event::PaymentCreated { .. } => "payment.created",
            Event::PaymentStatusChanged { .. } => "payment.status_changed",
            Event::ContactReceived { .. } => "contact.received",
        }
    }
}

/// Drains the event channel until every sender is dropped.
///
/// Delivery to mail or chat integrations lives outside this service; here
/// events become structured log records.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match serde_json::to_string(&event) {
            Ok(payload) => info!(event = event.name(), %payload, "domain event"),
            Err(e) => warn!(event = event.name(), error = %e, "unserializable domain event"),
        }
    }

    info!("Event processing loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_delivers_to_receiver() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);
        let event = Event::ContactReceived {
            notification_id: Uuid::new_v4(),
        };

        sender.send(event.clone()).await.unwrap();
        assert_eq!(rx.recv().await, Some(event));
    }

    #[tokio::test]
    async fn send_fails_once_receiver_is_dropped() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);

        let result = sender.send(Event::AssignmentCancelled(Uuid::new_v4())).await;
        assert!(result.is_err());
        // Logging variant never panics or errors
        sender
            .send_or_log(Event::AssignmentCancelled(Uuid::new_v4()))
            .await;
    }

    #[tokio::test]
    async fn process_events_exits_when_senders_drop() {
        let (tx, rx) = mpsc::channel(4);
        let handle = tokio::spawn(process_events(rx));
        tx.send(Event::AssignmentCancelled(Uuid::new_v4()))
            .await
            .unwrap();
        drop(tx);
        handle.await.unwrap();
    }
}
