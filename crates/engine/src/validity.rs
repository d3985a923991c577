use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use exemptd_core::{AlertSink, CertificateRecord, OperatorAlert};

/// Bounded timeout for the certificate URL probe.
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Checks whether a certificate URL still answers.
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    /// Returns `true` if the URL responds successfully (2xx).
    async fn is_reachable(&self, url: &str) -> bool;
}

/// HTTP `HEAD` probe with redirects followed and a 10-second timeout.
pub struct HttpProbe {
    client: reqwest::Client,
}

impl HttpProbe {
    /// Create a probe with its own HTTP client.
    ///
    /// # Panics
    ///
    /// Panics if the TLS backend cannot be initialized.
    #[must_use]
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(PROBE_TIMEOUT)
            .redirect(reqwest::redirect::Policy::default())
            .build()
            .expect("failed to build HTTP client");
        Self { client }
    }
}

impl Default for HttpProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReachabilityProbe for HttpProbe {
    async fn is_reachable(&self, url: &str) -> bool {
        match self.client.head(url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(url, error = %e, "certificate URL probe failed");
                false
            }
        }
    }
}

/// Is this certificate record well-formed and reachable?
///
/// Fails closed: a missing record, missing url/path/label, a path that does
/// not exist on disk, or an unreachable URL are all invalid. Each distinct
/// failure reason raises its own operator alert; the check never errors.
pub async fn certificate_is_valid(
    certificate: Option<&CertificateRecord>,
    probe: &dyn ReachabilityProbe,
    alerts: &dyn AlertSink,
) -> bool {
    let Some(record) = certificate else {
        alerts.record(OperatorAlert::error("Invalid certificate: no record"));
        return false;
    };

    let path = record.path.as_deref().unwrap_or_default();
    if record.url.is_empty() || record.label.is_empty() || path.is_empty() {
        alerts.record(OperatorAlert::error(format!(
            "Invalid certificate: incomplete record (url: {:?}, path: {:?}, label: {:?})",
            record.url, record.path, record.label
        )));
        return false;
    }

    match tokio::fs::try_exists(path).await {
        Ok(true) => {}
        _ => {
            alerts.record(OperatorAlert::error(format!(
                "Certificate file not found: {path}"
            )));
            return false;
        }
    }

    if !probe.is_reachable(&record.url).await {
        alerts.record(OperatorAlert::error(format!(
            "Certificate URL not reachable: {}",
            record.url
        )));
        return false;
    }

    true
}

/// Is this expiration still valid?
///
/// A 501(c)(3) certificate never expires, so the flag short-circuits to
/// valid regardless of the timestamp. Otherwise an absent/zero timestamp or
/// one strictly before `now` is invalid. The stored timestamp already
/// represents end-of-day in the owner's time zone, so no day rounding
/// happens here.
pub fn expiration_is_valid(
    expiration: Option<i64>,
    is_501c3: bool,
    now: i64,
    alerts: &dyn AlertSink,
) -> bool {
    if is_501c3 {
        return true;
    }
    match expiration {
        Some(ts) if ts != 0 && ts >= now => true,
        other => {
            alerts.record(OperatorAlert::error(format!(
                "Expired tax certificate: {:?} < {now}",
                other.unwrap_or(0)
            )));
            false
        }
    }
}
