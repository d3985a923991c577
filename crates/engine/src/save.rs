use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{NaiveDate, TimeZone, offset::LocalResult};
use tracing::{info, warn};

use exemptd_core::{CertificateRecord, ChangeEvent, CustomerId, Notice, Settings};

use crate::error::EngineError;
use crate::evaluator::{Evaluator, FactsOverride, StatusChange};
use crate::notifier::ChangeNotifier;
use crate::profile::ProfileStore;
use crate::roles::RoleContext;

/// One profile form submission.
///
/// `certificate_upload` replaces the stored record; `delete_certificate`
/// wins over an upload in the same request. An absent or empty
/// `expiration_date` clears the stored expiration.
#[derive(Debug, Clone, Default)]
pub struct ProfileInput {
    pub certificate_upload: Option<CertificateRecord>,
    pub delete_certificate: bool,
    pub is_501c3: bool,
    pub expiration_date: Option<String>,
    pub roles: RoleContext,
}

/// What a save did, for rendering back to the submitter.
#[derive(Debug, Clone)]
pub struct SaveOutcome {
    pub notices: Vec<Notice>,
    pub status_change: StatusChange,
}

/// The profile save path: persist submitted facts, emit one event per
/// real change, then re-derive the exemption status.
///
/// Event order is fixed (certificate, 501c3, expiration, status) so
/// downstream consumers always see facts before the status they produced.
pub struct ProfileService {
    profile: ProfileStore,
    evaluator: Arc<Evaluator>,
    notifier: Arc<ChangeNotifier>,
    settings: Settings,
}

impl ProfileService {
    pub fn new(
        profile: ProfileStore,
        evaluator: Arc<Evaluator>,
        notifier: Arc<ChangeNotifier>,
        settings: Settings,
    ) -> Self {
        Self {
            profile,
            evaluator,
            notifier,
            settings,
        }
    }

    /// Normalize a `YYYY-MM-DD` date to 23:59:59 of that calendar day in
    /// the configured time zone. Returns `None` for unparseable input.
    fn parse_expiration(&self, raw: &str) -> Option<i64> {
        let date = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()?;
        let eod = date.and_hms_opt(23, 59, 59)?;
        match self.settings.timezone.from_local_datetime(&eod) {
            LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => Some(dt.timestamp()),
            LocalResult::None => None,
        }
    }

    /// Apply a form submission for `customer`.
    pub async fn save_exemption_fields(
        &self,
        customer: CustomerId,
        mut input: ProfileInput,
        now: i64,
    ) -> Result<SaveOutcome, EngineError> {
        let mut notices = Vec::new();
        let mut events = Vec::new();

        // Certificate: deletion beats a simultaneous upload.
        let old_certificate = self.profile.certificate(customer).await?;
        let new_certificate = if input.delete_certificate {
            None
        } else {
            input
                .certificate_upload
                .take()
                .or_else(|| old_certificate.clone())
        };
        if new_certificate != old_certificate {
            match &new_certificate {
                Some(record) => self.profile.set_certificate(customer, record).await?,
                None => {
                    self.profile.clear_certificate(customer).await?;
                }
            }
            if input.delete_certificate {
                notices.push(Notice::success("Certificate removed."));
            }
            events.push(ChangeEvent::CertificateUpdated {
                customer,
                certificate: new_certificate.clone(),
            });
        }

        // 501c3 flag.
        let old_501c3 = self.profile.is_501c3(customer).await?;
        if input.is_501c3 != old_501c3 {
            self.profile.set_501c3(customer, input.is_501c3).await?;
            events.push(ChangeEvent::Nonprofit501c3Updated {
                customer,
                is_501c3: input.is_501c3,
            });
        }

        // Expiration: a 501c3 org carries no expiration date.
        let old_expiration = self.profile.expiration(customer).await?;
        let new_expiration = if input.is_501c3 {
            None
        } else {
            input
                .expiration_date
                .as_deref()
                .filter(|raw| !raw.trim().is_empty())
                .and_then(|raw| self.parse_expiration(raw))
        };
        if new_expiration != old_expiration {
            self.profile.set_expiration(customer, new_expiration).await?;
            events.push(ChangeEvent::ExpirationUpdated {
                customer,
                expiration: new_expiration,
                old_expiration,
            });
        }
        // A backdated expiration is stored as submitted; the evaluator
        // will revoke the status and the submitter is told why.
        if matches!(new_expiration, Some(ts) if ts < now) {
            notices.push(Notice::error("Certificate has expired."));
        }

        let overrides = FactsOverride {
            certificate: Some(new_certificate),
            is_501c3: Some(input.is_501c3),
            expiration: Some(new_expiration),
        };
        let mut roles = input.roles;
        let evaluation = self
            .evaluator
            .evaluate(customer, overrides, &mut roles, now)
            .await?;

        // The evaluator voided the stored record (file kept); downstream
        // systems need to hear about it unless this request already
        // announced the certificate going away.
        if evaluation.certificate_cleared
            && !events
                .iter()
                .any(|e| matches!(e, ChangeEvent::CertificateUpdated { certificate: None, .. }))
        {
            events.push(ChangeEvent::CertificateUpdated {
                customer,
                certificate: None,
            });
        }

        match &evaluation.change {
            StatusChange::Unchanged => {}
            StatusChange::Exempt(tag) => {
                notices.push(Notice::success("Tax status changed to Exempt!"));
                events.push(ChangeEvent::StatusUpdated {
                    customer,
                    status: tag.clone(),
                });
            }
            StatusChange::NotExempt => {
                notices.push(Notice::success("Tax status changed to Not Exempt!"));
                events.push(ChangeEvent::StatusUpdated {
                    customer,
                    status: String::new(),
                });
            }
        }

        for event in &events {
            self.notifier.publish(event).await;
        }

        Ok(SaveOutcome {
            notices,
            status_change: evaluation.change,
        })
    }

    /// Re-derive status for every customer with exemption data on file.
    ///
    /// Covers records written before auto-assignment was enabled, or while
    /// it was misconfigured. Status changes are published; unchanged
    /// customers are silently re-synced.
    pub async fn backfill(&self, now: i64) -> Result<usize, EngineError> {
        let store = self.profile.raw();
        let mut customers = BTreeSet::new();
        for (customer, _) in store.scan_kind(exemptd_state::AttrKind::Certificate).await? {
            customers.insert(customer);
        }
        for (customer, tag) in store.scan_kind(exemptd_state::AttrKind::ExemptionType).await? {
            if !tag.is_empty() {
                customers.insert(customer);
            }
        }

        let mut changed = 0;
        for customer in customers {
            let evaluation = self
                .evaluator
                .evaluate(customer, FactsOverride::default(), &mut RoleContext::default(), now)
                .await;
            let evaluation = match evaluation {
                Ok(e) => e,
                Err(e) => {
                    warn!(%customer, error = %e, "backfill evaluation failed");
                    continue;
                }
            };
            if evaluation.certificate_cleared {
                self.notifier
                    .publish(&ChangeEvent::CertificateUpdated {
                        customer,
                        certificate: None,
                    })
                    .await;
            }
            if let Some(tag) = evaluation.change.new_tag() {
                changed += 1;
                self.notifier
                    .publish(&ChangeEvent::StatusUpdated {
                        customer,
                        status: tag.to_owned(),
                    })
                    .await;
            }
        }
        info!(changed, "exemption backfill complete");
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use exemptd_core::{EXEMPT_ROLE, MemoryAlertSink, NotificationKind};
    use exemptd_state_memory::MemoryAttributeStore;

    use crate::notifier::ChangeSubscriber;
    use crate::roles::{MemoryRoleBackend, RoleAssigner, RoleBackend};
    use crate::validity::ReachabilityProbe;

    struct StubProbe;

    #[async_trait]
    impl ReachabilityProbe for StubProbe {
        async fn is_reachable(&self, _url: &str) -> bool {
            true
        }
    }

    #[derive(Default)]
    struct RecordingSubscriber {
        seen: std::sync::Mutex<Vec<ChangeEvent>>,
    }

    impl RecordingSubscriber {
        fn kinds(&self) -> Vec<NotificationKind> {
            self.seen.lock().unwrap().iter().map(ChangeEvent::kind).collect()
        }
    }

    #[async_trait]
    impl ChangeSubscriber for RecordingSubscriber {
        fn name(&self) -> &str {
            "recorder"
        }

        async fn on_change(&self, event: &ChangeEvent) -> Result<(), crate::notifier::NotifyError> {
            self.seen.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    struct Fixture {
        profile: ProfileStore,
        backend: Arc<MemoryRoleBackend>,
        recorder: Arc<RecordingSubscriber>,
        service: ProfileService,
    }

    fn fixture() -> Fixture {
        let profile = ProfileStore::new(Arc::new(MemoryAttributeStore::new()));
        let backend = Arc::new(MemoryRoleBackend::new());
        let alerts = Arc::new(MemoryAlertSink::new());
        let settings = Settings {
            default_category: "wholesale".to_owned(),
            ..Settings::default()
        };
        let evaluator = Arc::new(Evaluator::new(
            profile.clone(),
            Arc::new(RoleAssigner::new(backend.clone())),
            Arc::new(StubProbe),
            alerts.clone(),
            settings.clone(),
        ));
        let recorder = Arc::new(RecordingSubscriber::default());
        let notifier =
            Arc::new(ChangeNotifier::new(alerts).with_subscriber(recorder.clone()));
        let service = ProfileService::new(profile.clone(), evaluator, notifier, settings);
        Fixture {
            profile,
            backend,
            recorder,
            service,
        }
    }

    fn upload(name: &str) -> CertificateRecord {
        let path = std::env::temp_dir().join(name);
        std::fs::write(&path, b"bytes").unwrap();
        CertificateRecord::new(
            path.to_string_lossy(),
            "https://shop.example/certs/cert.pdf",
            "cert.pdf",
            "application/pdf",
        )
    }

    const NOW: i64 = 1_700_000_000;

    #[tokio::test]
    async fn upload_with_future_date_becomes_exempt() {
        let fx = fixture();
        let customer = CustomerId::new(21);
        let input = ProfileInput {
            certificate_upload: Some(upload("save-future.pdf")),
            expiration_date: Some("2099-06-30".into()),
            ..ProfileInput::default()
        };

        let outcome = fx.service.save_exemption_fields(customer, input, NOW).await.unwrap();

        assert_eq!(outcome.status_change, StatusChange::Exempt("wholesale".into()));
        assert!(outcome
            .notices
            .iter()
            .any(|n| n.message == "Tax status changed to Exempt!"));
        assert_eq!(
            fx.recorder.kinds(),
            vec![
                NotificationKind::CertificateUpdated,
                NotificationKind::ExpirationUpdated,
                NotificationKind::StatusUpdated,
            ]
        );
        assert!(fx.backend.has_role(customer, EXEMPT_ROLE).await.unwrap());
    }

    #[tokio::test]
    async fn resubmitting_identical_facts_emits_nothing() {
        let fx = fixture();
        let customer = CustomerId::new(22);
        let input = ProfileInput {
            certificate_upload: Some(upload("save-idem.pdf")),
            expiration_date: Some("2099-06-30".into()),
            ..ProfileInput::default()
        };
        fx.service.save_exemption_fields(customer, input.clone(), NOW).await.unwrap();
        let before = fx.recorder.kinds().len();

        let outcome = fx
            .service
            .save_exemption_fields(
                customer,
                ProfileInput {
                    certificate_upload: None,
                    ..input
                },
                NOW,
            )
            .await
            .unwrap();

        assert_eq!(outcome.status_change, StatusChange::Unchanged);
        assert!(outcome.notices.is_empty());
        assert_eq!(fx.recorder.kinds().len(), before);
    }

    #[tokio::test]
    async fn deleting_certificate_revokes_and_notices() {
        let fx = fixture();
        let customer = CustomerId::new(23);
        fx.service
            .save_exemption_fields(
                customer,
                ProfileInput {
                    certificate_upload: Some(upload("save-delete.pdf")),
                    expiration_date: Some("2099-06-30".into()),
                    ..ProfileInput::default()
                },
                NOW,
            )
            .await
            .unwrap();

        let outcome = fx
            .service
            .save_exemption_fields(
                customer,
                ProfileInput {
                    delete_certificate: true,
                    expiration_date: Some("2099-06-30".into()),
                    ..ProfileInput::default()
                },
                NOW,
            )
            .await
            .unwrap();

        assert_eq!(outcome.status_change, StatusChange::NotExempt);
        assert!(outcome.notices.iter().any(|n| n.message == "Certificate removed."));
        assert!(outcome
            .notices
            .iter()
            .any(|n| n.message == "Tax status changed to Not Exempt!"));
        assert!(fx.profile.certificate(customer).await.unwrap().is_none());
        assert!(!fx.backend.has_role(customer, EXEMPT_ROLE).await.unwrap());
    }

    #[tokio::test]
    async fn past_date_is_stored_and_flagged() {
        let fx = fixture();
        let customer = CustomerId::new(24);
        let outcome = fx
            .service
            .save_exemption_fields(
                customer,
                ProfileInput {
                    certificate_upload: Some(upload("save-past.pdf")),
                    expiration_date: Some("2001-01-01".into()),
                    ..ProfileInput::default()
                },
                NOW,
            )
            .await
            .unwrap();

        assert!(outcome.notices.iter().any(|n| n.message == "Certificate has expired."));
        assert_eq!(outcome.status_change, StatusChange::Unchanged);
        // The submitted date is kept so the customer can see what they entered.
        assert!(fx.profile.expiration(customer).await.unwrap().is_some());
        assert!(!fx.backend.has_role(customer, EXEMPT_ROLE).await.unwrap());
    }

    #[tokio::test]
    async fn nonprofit_checkbox_clears_expiration() {
        let fx = fixture();
        let customer = CustomerId::new(25);
        fx.service
            .save_exemption_fields(
                customer,
                ProfileInput {
                    certificate_upload: Some(upload("save-501c3.pdf")),
                    expiration_date: Some("2099-06-30".into()),
                    ..ProfileInput::default()
                },
                NOW,
            )
            .await
            .unwrap();

        let outcome = fx
            .service
            .save_exemption_fields(
                customer,
                ProfileInput {
                    is_501c3: true,
                    expiration_date: Some("2099-06-30".into()),
                    ..ProfileInput::default()
                },
                NOW,
            )
            .await
            .unwrap();

        assert_eq!(outcome.status_change, StatusChange::Unchanged);
        assert!(fx.profile.is_501c3(customer).await.unwrap());
        assert!(fx.profile.expiration(customer).await.unwrap().is_none());
        let kinds = fx.recorder.kinds();
        assert!(kinds.contains(&NotificationKind::Nonprofit501c3Updated));
        assert!(kinds.contains(&NotificationKind::ExpirationUpdated));
    }

    #[tokio::test]
    async fn backfill_assigns_missed_customers() {
        let fx = fixture();
        let customer = CustomerId::new(26);
        // Facts written directly, as if saved while auto-assignment was off.
        fx.profile
            .set_certificate(customer, &upload("save-backfill.pdf"))
            .await
            .unwrap();
        fx.profile.set_501c3(customer, true).await.unwrap();

        let changed = fx.service.backfill(NOW).await.unwrap();

        assert_eq!(changed, 1);
        assert_eq!(fx.profile.exemption_type(customer).await.unwrap(), "wholesale");
        assert!(fx
            .recorder
            .kinds()
            .contains(&NotificationKind::StatusUpdated));
    }
}
