//! Post-commit notification dispatch.
//!
//! Runs strictly after a transaction committed. Each delivery is awaited on
//! its own so one failure cannot mask the others, and no failure ever reaches
//! the caller of the mutation.

use std::sync::Arc;
use swapmeet_domain::Notice;
use tracing::{debug, warn};

use crate::ports::NotificationPort;

/// Delivery counts for one batch of notices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Deliveries the port accepted
    pub delivered: usize,
    /// Deliveries that failed and were dropped
    pub failed: usize,
}

/// Best-effort fan-out of committed events to a [`NotificationPort`].
pub struct NotificationDispatcher<N: NotificationPort> {
    port: Arc<N>,
    in_app: bool,
}

impl<N: NotificationPort> NotificationDispatcher<N> {
    /// Create a dispatcher; `in_app` also writes in-app list entries.
    pub fn new(port: Arc<N>, in_app: bool) -> Self {
        Self { port, in_app }
    }

    /// The wrapped port.
    pub fn port(&self) -> &N {
        &self.port
    }

    /// Deliver every notice. Never fails.
    pub async fn dispatch(&self, notices: Vec<Notice>) -> DispatchReport {
        let mut report = DispatchReport::default();

        for notice in notices {
            let event = &notice.event;
            let exchange_id = event.exchange_id();

            match serde_json::to_value(event) {
                Ok(payload) => {
                    match self.port.notify(notice.recipient, event.kind(), payload).await {
                        Ok(()) => report.delivered += 1,
                        Err(e) => {
                            warn!(
                                recipient = %notice.recipient,
                                %exchange_id,
                                kind = event.kind(),
                                error = %e,
                                "Push notification failed, dropping"
                            );
                            report.failed += 1;
                        },
                    }
                },
                Err(e) => {
                    warn!(%exchange_id, error = %e, "Could not encode notification payload");
                    report.failed += 1;
                },
            }

            if self.in_app {
                let result = self
                    .port
                    .create_in_app_notification(
                        notice.recipient,
                        event.title(),
                        &event.message(),
                        exchange_id,
                    )
                    .await;

                match result {
                    Ok(()) => report.delivered += 1,
                    Err(e) => {
                        warn!(
                            recipient = %notice.recipient,
                            %exchange_id,
                            error = %e,
                            "In-app notification failed, dropping"
                        );
                        report.failed += 1;
                    },
                }
            }
        }

        debug!(delivered = report.delivered, failed = report.failed, "Notifications dispatched");
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub::RecordingNotifier;
    use chrono::Utc;
    use swapmeet_domain::ExchangeEvent;
    use uuid::Uuid;

    fn accepted_notice(recipient: Uuid) -> Notice {
        Notice::new(
            recipient,
            ExchangeEvent::Accepted {
                exchange_id: Uuid::now_v7(),
                item_title: "Camera".to_string(),
                timestamp: Utc::now(),
            },
        )
    }

    #[tokio::test]
    async fn test_dispatch_pushes_and_writes_in_app() {
        let notifier = Arc::new(RecordingNotifier::new());
        let dispatcher = NotificationDispatcher::new(Arc::clone(&notifier), true);
        let recipient = Uuid::now_v7();

        let report = dispatcher.dispatch(vec![accepted_notice(recipient)]).await;

        assert_eq!(report, DispatchReport { delivered: 2, failed: 0 });
        assert_eq!(notifier.kinds_for(recipient), vec!["exchange_accepted"]);
        assert_eq!(notifier.pushes()[0].payload["type"], "accepted");
        assert_eq!(notifier.in_app()[0].title, "Request accepted");
    }

    #[tokio::test]
    async fn test_push_failure_does_not_stop_in_app_or_later_notices() {
        let notifier = Arc::new(RecordingNotifier::new());
        notifier.set_fail_push(true);
        let dispatcher = NotificationDispatcher::new(Arc::clone(&notifier), true);

        let report = dispatcher
            .dispatch(vec![accepted_notice(Uuid::now_v7()), accepted_notice(Uuid::now_v7())])
            .await;

        assert_eq!(report, DispatchReport { delivered: 2, failed: 2 });
        assert_eq!(notifier.in_app().len(), 2);
    }

    #[tokio::test]
    async fn test_in_app_can_be_disabled() {
        let notifier = Arc::new(RecordingNotifier::new());
        let dispatcher = NotificationDispatcher::new(Arc::clone(&notifier), false);

        dispatcher.dispatch(vec![accepted_notice(Uuid::now_v7())]).await;

        assert_eq!(notifier.pushes().len(), 1);
        assert!(notifier.in_app().is_empty());
    }
}
