use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use tracing::{debug, instrument, warn};

use exemptd_core::{ChangeEvent, WebhookTargets};
use exemptd_engine::{ChangeSubscriber, NotifyError};

use crate::payload::{form_encode, payload_for};

const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Wire format for the notification body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyFormat {
    /// `application/x-www-form-urlencoded` with bracket-flattened keys.
    /// The default; what no-code automation targets decode natively.
    #[default]
    FormEncoded,
    Json,
}

/// Delivers change events to per-kind webhook targets.
///
/// One POST per event. A kind with no configured target, or a target that
/// is not a parseable URL, is skipped without error; delivery failures are
/// returned so the notifier can surface them as operator alerts.
pub struct WebhookNotifier {
    client: Client,
    targets: WebhookTargets,
    format: BodyFormat,
}

impl WebhookNotifier {
    pub fn new(targets: WebhookTargets) -> Self {
        let client = Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .expect("failed to build HTTP client");
        Self {
            client,
            targets,
            format: BodyFormat::default(),
        }
    }

    /// Use a custom client, e.g. to share a connection pool.
    pub fn with_client(targets: WebhookTargets, client: Client) -> Self {
        Self {
            client,
            targets,
            format: BodyFormat::default(),
        }
    }

    #[must_use]
    pub fn with_format(mut self, format: BodyFormat) -> Self {
        self.format = format;
        self
    }

    async fn deliver(&self, url: Url, event: &ChangeEvent) -> Result<(), NotifyError> {
        let payload = payload_for(event);
        let request = match self.format {
            BodyFormat::FormEncoded => {
                let body = form_encode(&payload)
                    .map_err(|e| NotifyError::Payload(e.to_string()))?;
                self.client
                    .post(url.clone())
                    .header("Content-Type", "application/x-www-form-urlencoded")
                    .body(body)
            }
            BodyFormat::Json => self.client.post(url.clone()).json(&payload),
        };

        let response = request
            .send()
            .await
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            debug!(%url, %status, "webhook delivered");
            Ok(())
        } else {
            Err(NotifyError::Delivery(format!("{url} returned {status}")))
        }
    }
}

#[async_trait]
impl ChangeSubscriber for WebhookNotifier {
    fn name(&self) -> &str {
        "webhook"
    }

    #[instrument(skip(self, event), fields(kind = %event.kind(), customer = %event.customer()))]
    async fn on_change(&self, event: &ChangeEvent) -> Result<(), NotifyError> {
        let Some(target) = self.targets.target(event.kind()) else {
            debug!("no webhook target configured, skipping");
            return Ok(());
        };
        let Ok(url) = Url::parse(target) else {
            warn!(target, "webhook target is not a valid URL, skipping");
            return Ok(());
        };
        self.deliver(url, event).await
    }
}
