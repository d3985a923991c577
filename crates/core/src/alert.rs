use std::sync::Mutex;

/// Severity of an operator-visible alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertSeverity {
    Error,
    Warning,
    Info,
    Success,
}

/// An operator-visible diagnostic.
///
/// Alerts surface integration and validation failures without ever blocking
/// the local write path; nothing that raises one is fatal to the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorAlert {
    pub severity: AlertSeverity,
    pub message: String,
}

impl OperatorAlert {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: AlertSeverity::Error,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: AlertSeverity::Warning,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            severity: AlertSeverity::Info,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            severity: AlertSeverity::Success,
            message: message.into(),
        }
    }
}

/// Destination for operator alerts.
///
/// Recording must be infallible from the caller's point of view; a sink
/// that can fail internally has to swallow its own errors.
pub trait AlertSink: Send + Sync {
    fn record(&self, alert: OperatorAlert);
}

/// Sink that emits alerts as `tracing` events.
///
/// With `log_all` unset, only errors and warnings are logged; info and
/// success alerts are kept at debug level (the operator-log toggle).
#[derive(Debug, Default)]
pub struct TracingAlertSink {
    pub log_all: bool,
}

impl TracingAlertSink {
    #[must_use]
    pub fn new(log_all: bool) -> Self {
        Self { log_all }
    }
}

impl AlertSink for TracingAlertSink {
    fn record(&self, alert: OperatorAlert) {
        match alert.severity {
            AlertSeverity::Error => tracing::error!(message = %alert.message, "operator alert"),
            AlertSeverity::Warning => tracing::warn!(message = %alert.message, "operator alert"),
            AlertSeverity::Info | AlertSeverity::Success if self.log_all => {
                tracing::info!(message = %alert.message, "operator alert");
            }
            AlertSeverity::Info | AlertSeverity::Success => {
                tracing::debug!(message = %alert.message, "operator alert");
            }
        }
    }
}

/// Sink that collects alerts in memory for assertions.
#[derive(Debug, Default)]
pub struct MemoryAlertSink {
    alerts: Mutex<Vec<OperatorAlert>>,
}

impl MemoryAlertSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of recorded alerts, oldest first.
    #[must_use]
    pub fn alerts(&self) -> Vec<OperatorAlert> {
        self.alerts.lock().map(|a| a.clone()).unwrap_or_default()
    }

    /// Returns `true` if any recorded alert message contains `needle`.
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        self.alerts().iter().any(|a| a.message.contains(needle))
    }
}

impl AlertSink for MemoryAlertSink {
    fn record(&self, alert: OperatorAlert) {
        if let Ok(mut alerts) = self.alerts.lock() {
            alerts.push(alert);
        }
    }
}
