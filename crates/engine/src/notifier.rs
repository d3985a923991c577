use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use exemptd_core::{AlertSink, ChangeEvent, OperatorAlert};

/// Error returned by a change subscriber.
///
/// Subscriber failures never propagate to the write path; the notifier
/// records them as operator alerts and moves on. Nothing is retried.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Delivery to the downstream system failed.
    #[error("delivery failed: {0}")]
    Delivery(String),

    /// The subscriber could not assemble its outbound data.
    #[error("payload error: {0}")]
    Payload(String),
}

/// A downstream consumer of recognized fact changes.
#[async_trait]
pub trait ChangeSubscriber: Send + Sync {
    /// Unique name used in operator alerts.
    fn name(&self) -> &str;

    /// Handle one change event. Called at most once per real change.
    async fn on_change(&self, event: &ChangeEvent) -> Result<(), NotifyError>;
}

/// Fans recognized fact changes out to subscribers.
///
/// Firing contract: the caller publishes exactly one event per actually
/// changed fact per save operation; the notifier guarantees every
/// subscriber sees every published event, in registration order, and that
/// a failing subscriber cannot block either the remaining subscribers or
/// the underlying state change.
pub struct ChangeNotifier {
    subscribers: Vec<Arc<dyn ChangeSubscriber>>,
    alerts: Arc<dyn AlertSink>,
}

impl ChangeNotifier {
    pub fn new(alerts: Arc<dyn AlertSink>) -> Self {
        Self {
            subscribers: Vec::new(),
            alerts,
        }
    }

    /// Register a subscriber. Registration order is delivery order.
    #[must_use]
    pub fn with_subscriber(mut self, subscriber: Arc<dyn ChangeSubscriber>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    pub fn subscribe(&mut self, subscriber: Arc<dyn ChangeSubscriber>) {
        self.subscribers.push(subscriber);
    }

    /// Deliver `event` to every subscriber, recording failures as alerts.
    pub async fn publish(&self, event: &ChangeEvent) {
        debug!(kind = %event.kind(), customer = %event.customer(), "publishing change event");
        for subscriber in &self.subscribers {
            if let Err(e) = subscriber.on_change(event).await {
                self.alerts.record(OperatorAlert::error(format!(
                    "{} failed for {} ({}): {e}",
                    subscriber.name(),
                    event.customer(),
                    event.kind(),
                )));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use exemptd_core::{CustomerId, MemoryAlertSink};

    pub(super) struct RecordingSubscriber {
        pub events: Mutex<Vec<ChangeEvent>>,
        pub fail: bool,
    }

    impl RecordingSubscriber {
        fn new(fail: bool) -> Self {
            Self {
                events: Mutex::new(Vec::new()),
                fail,
            }
        }
    }

    #[async_trait]
    impl ChangeSubscriber for RecordingSubscriber {
        fn name(&self) -> &str {
            "recording"
        }

        async fn on_change(&self, event: &ChangeEvent) -> Result<(), NotifyError> {
            self.events.lock().unwrap().push(event.clone());
            if self.fail {
                Err(NotifyError::Delivery("boom".into()))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn delivers_to_every_subscriber() {
        let alerts = Arc::new(MemoryAlertSink::new());
        let first = Arc::new(RecordingSubscriber::new(false));
        let second = Arc::new(RecordingSubscriber::new(false));
        let notifier = ChangeNotifier::new(alerts.clone())
            .with_subscriber(first.clone())
            .with_subscriber(second.clone());

        let event = ChangeEvent::Nonprofit501c3Updated {
            customer: CustomerId::new(1),
            is_501c3: true,
        };
        notifier.publish(&event).await;

        assert_eq!(first.events.lock().unwrap().len(), 1);
        assert_eq!(second.events.lock().unwrap().len(), 1);
        assert!(alerts.alerts().is_empty());
    }

    #[tokio::test]
    async fn failure_alerts_and_continues() {
        let alerts = Arc::new(MemoryAlertSink::new());
        let failing = Arc::new(RecordingSubscriber::new(true));
        let healthy = Arc::new(RecordingSubscriber::new(false));
        let notifier = ChangeNotifier::new(alerts.clone())
            .with_subscriber(failing)
            .with_subscriber(healthy.clone());

        let event = ChangeEvent::StatusUpdated {
            customer: CustomerId::new(2),
            status: "wholesale".into(),
        };
        notifier.publish(&event).await;

        // The failing subscriber did not stop delivery to the healthy one.
        assert_eq!(healthy.events.lock().unwrap().len(), 1);
        assert!(alerts.contains("delivery failed: boom"));
    }
}
