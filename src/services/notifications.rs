use async_trait::async_trait;
use futures_util::future::join_all;
use sqlx::PgPool;

use super::{RequestHandler, Service};
use crate::repositories::registrations;
use crate::webhooks::signature;

pub enum NotificationRequest {
    /// Fire-and-forget delivery of an event to the merchant's registered
    /// webhook endpoints. No response channel: senders never block on it.
    Dispatch {
        user_id: String,
        event: serde_json::Value,
    },
}

#[derive(Clone)]
pub struct NotificationRequestHandler {
    conn: PgPool,
    client: reqwest::Client,
}

impl NotificationRequestHandler {
    pub fn new(conn: PgPool) -> Self {
        NotificationRequestHandler {
            conn,
            client: reqwest::Client::new(),
        }
    }

    async fn dispatch(&self, user_id: &str, event: serde_json::Value) {
        let registrations = match registrations::active_for_user(&self.conn, user_id).await {
            Ok(registrations) => registrations,
            Err(e) => {
                log::warn!(
                    "Could not load webhook registrations for {}: {}",
                    user_id,
                    e
                );
                return;
            }
        };

        if registrations.is_empty() {
            return;
        }

        let body = event.to_string();
        let deliveries = registrations.into_iter().map(|registration| {
            let client = self.client.clone();
            let body = body.clone();

            async move {
                let signature = signature::sign(body.as_bytes(), &registration.secret);
                let result = client
                    .post(&registration.url)
                    .header("content-type", "application/json")
                    .header("x-signature", signature)
                    .body(body)
                    .send()
                    .await;

                match result {
                    Ok(response) if response.status().is_success() => {}
                    Ok(response) => log::warn!(
                        "Webhook {} answered {}.",
                        registration.url,
                        response.status()
                    ),
                    Err(e) => log::warn!("Webhook {} delivery failed: {}", registration.url, e),
                }
            }
        });

        join_all(deliveries).await;
    }
}

#[async_trait]
impl RequestHandler<NotificationRequest> for NotificationRequestHandler {
    async fn handle_request(&self, request: NotificationRequest) {
        match request {
            NotificationRequest::Dispatch { user_id, event } => {
                self.dispatch(&user_id, event).await;
            }
        }
    }
}

pub struct NotificationService;

impl NotificationService {
    pub fn new() -> Self {
        NotificationService {}
    }
}

#[async_trait]
impl Service<NotificationRequest, NotificationRequestHandler> for NotificationService {}
