use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use exemptd_engine::ExpirationScanner;

use crate::config::ScannerConfig;
use crate::error::ServerError;

/// Compute the next occurrence of a cron expression after `after` in the
/// given timezone.
///
/// Returns `None` if the cron expression has no future occurrences.
#[must_use]
pub fn next_occurrence(
    cron: &croner::Cron,
    tz: chrono_tz::Tz,
    after: &DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let after_tz = after.with_timezone(&tz);
    cron.find_next_occurrence(&after_tz, false)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse and validate the configured cron expression.
pub fn parse_cron(expr: &str) -> Result<croner::Cron, ServerError> {
    croner::Cron::new(expr)
        .parse()
        .map_err(|e| ServerError::Config(format!("invalid scanner cron expression: {e}")))
}

/// Drive the expiration sweep on its cron schedule.
///
/// Optionally runs one sweep immediately, then sleeps until each next
/// occurrence. A failing sweep is logged and the schedule continues.
pub async fn run_scanner(
    scanner: Arc<ExpirationScanner>,
    config: ScannerConfig,
    tz: chrono_tz::Tz,
) -> Result<(), ServerError> {
    let cron = parse_cron(&config.cron)?;

    if config.run_on_start {
        sweep(&scanner).await;
    }

    loop {
        let now = Utc::now();
        let Some(next) = next_occurrence(&cron, tz, &now) else {
            warn!(cron = %config.cron, "cron expression has no future occurrences, scanner stopped");
            return Ok(());
        };
        let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
        info!(next = %next, "expiration sweep scheduled");
        tokio::time::sleep(wait).await;
        sweep(&scanner).await;
    }
}

async fn sweep(scanner: &ExpirationScanner) {
    match scanner.run(Utc::now().timestamp()).await {
        Ok(alerted) => info!(alerted, "expiration sweep finished"),
        Err(e) => error!(error = %e, "expiration sweep failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn daily_cron_parses_and_advances() {
        let cron = parse_cron("0 8 * * *").unwrap();
        let after = DateTime::parse_from_rfc3339("2026-03-02T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);

        let next = next_occurrence(&cron, chrono_tz::UTC, &after).unwrap();
        assert_eq!(next.to_rfc3339(), "2026-03-03T08:00:00+00:00");
    }

    #[test]
    fn occurrence_respects_timezone() {
        let cron = parse_cron("0 8 * * *").unwrap();
        let after = DateTime::parse_from_rfc3339("2026-03-02T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);

        // 08:00 in Denver is 15:00 UTC during MST.
        let next = next_occurrence(&cron, chrono_tz::America::Denver, &after).unwrap();
        assert_eq!(next.to_rfc3339(), "2026-03-02T15:00:00+00:00");
    }

    #[test]
    fn invalid_cron_is_a_config_error() {
        let err = parse_cron("not a cron").unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));
    }
}
