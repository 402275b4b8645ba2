//! Concurrent fan-out of rendered messages to every device of every recipient.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::audience::Recipient;
use super::composer::MessageComposer;
use super::transport::PushTransport;
use crate::database::repositories::SentNotificationRepository;
use crate::domain::{PushMessage, SentNotification, User};

/// Outcome counters for one dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchReport {
    /// Number of (user, token) sends attempted.
    pub attempted: usize,
    /// Sends the transport confirmed.
    pub delivered: usize,
    /// Sends the transport rejected or that failed in flight.
    pub failed: usize,
}

struct Delivery<'a> {
    user: &'a User,
    message: PushMessage,
}

/// Sends one message per (user, token) and records the confirmed ones.
pub struct DispatchEngine {
    transport: Arc<dyn PushTransport>,
    sent_notifications: Arc<dyn SentNotificationRepository>,
    send_concurrency: usize,
}

impl DispatchEngine {
    /// `send_concurrency = 0` places no bound on in-flight sends.
    pub fn new(
        transport: Arc<dyn PushTransport>,
        sent_notifications: Arc<dyn SentNotificationRepository>,
        send_concurrency: usize,
    ) -> Self {
        Self {
            transport,
            sent_notifications,
            send_concurrency,
        }
    }

    /// Deliver to every token of every recipient.
    ///
    /// Never fails: each send is independent, failures are logged and counted.
    pub async fn dispatch(
        &self,
        composer: &MessageComposer,
        audience: &[Recipient],
    ) -> DispatchReport {
        let deliveries: Vec<Delivery<'_>> = audience
            .iter()
            .flat_map(|recipient| {
                let body = composer.body(&recipient.alarms);
                recipient
                    .user
                    .delivery_tokens()
                    .into_iter()
                    .flatten()
                    .map(move |token| Delivery {
                        user: &recipient.user,
                        message: PushMessage::new(token.clone(), composer.title(), body.clone()),
                    })
            })
            .collect();

        let attempted = deliveries.len();
        let delivered = AtomicUsize::new(0);
        let failed = AtomicUsize::new(0);
        let limit = (self.send_concurrency > 0).then_some(self.send_concurrency);

        stream::iter(deliveries)
            .for_each_concurrent(limit, |delivery| {
                let delivered = &delivered;
                let failed = &failed;
                async move {
                    if self.deliver(delivery).await {
                        delivered.fetch_add(1, Ordering::Relaxed);
                    } else {
                        failed.fetch_add(1, Ordering::Relaxed);
                    }
                }
            })
            .await;

        DispatchReport {
            attempted,
            delivered: delivered.into_inner(),
            failed: failed.into_inner(),
        }
    }

    /// Returns whether the transport confirmed the send.
    async fn deliver(&self, delivery: Delivery<'_>) -> bool {
        let Delivery { user, message } = delivery;

        info!(
            user = %user.email,
            transport = self.transport.transport_type(),
            "Sending message to user"
        );
        debug!(title = %message.title, body = %message.body, "Message");

        if let Err(e) = self.transport.send(&message).await {
            warn!(user = %user.email, error = %e, "Error sending message to user");
            return false;
        }

        debug!(user = %user.email, "Message sent, saving sent notification");
        let sent = SentNotification::new(message, user);
        if let Err(e) = self.sent_notifications.save(&sent).await {
            warn!(
                user = %user.email,
                notification_id = %sent.id,
                error = %e,
                "Failed to save sent notification"
            );
        }
        true
    }
}
