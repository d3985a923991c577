use serde_json::{Value, json};

use exemptd_core::ChangeEvent;

fn date_fields(timestamp: Option<i64>) -> (Value, Value, Value) {
    match timestamp.filter(|ts| *ts != 0) {
        Some(ts) => {
            let ts_value = Value::from(ts);
            match chrono::DateTime::from_timestamp(ts, 0) {
                Some(dt) => (
                    ts_value,
                    Value::from(dt.format("%Y-%m-%d").to_string()),
                    Value::from(dt.format("%b %d, %Y").to_string()),
                ),
                None => (ts_value, Value::Bool(false), Value::Bool(false)),
            }
        }
        // Consumers key off falsy placeholders rather than absent fields.
        None => (Value::from(0), Value::Bool(false), Value::Bool(false)),
    }
}

/// Build the notification body for an event.
///
/// Shapes are part of the external contract; several fields are duplicated
/// in human-readable form for consumers that cannot post-process (e.g.
/// no-code automation targets).
#[must_use]
pub fn payload_for(event: &ChangeEvent) -> Value {
    match event {
        ChangeEvent::CertificateUpdated {
            customer,
            certificate,
        } => {
            let certificate = certificate
                .as_ref()
                .and_then(|record| serde_json::to_value(record).ok())
                .unwrap_or(Value::Bool(false));
            json!({
                "user_id": customer.as_u64(),
                "certificate": certificate,
            })
        }
        ChangeEvent::Nonprofit501c3Updated { customer, is_501c3 } => json!({
            "user_id": customer.as_u64(),
            "501c3": is_501c3,
        }),
        ChangeEvent::ExpirationUpdated {
            customer,
            expiration,
            ..
        } => {
            let (timestamp, ymd, date) = date_fields(*expiration);
            json!({
                "user_id": customer.as_u64(),
                "timestamp": timestamp,
                "Y-m-d": ymd,
                "date": date,
            })
        }
        ChangeEvent::StatusUpdated { customer, status } => {
            let status = if status.is_empty() {
                Value::Bool(false)
            } else {
                Value::from(status.clone())
            };
            json!({
                "user_id": customer.as_u64(),
                "exemption_status": status,
            })
        }
        ChangeEvent::ExpirationApproaching {
            customer,
            contact,
            expiration,
            days_left,
        } => {
            let (timestamp, ymd, _) = date_fields(Some(*expiration));
            json!({
                "user_id": customer.as_u64(),
                "user_email": contact.email,
                "user_first_name": contact.first_name,
                "user_last_name": contact.last_name,
                "expiration_timestamp": timestamp,
                "expiration_date": ymd,
                "days_left": days_left,
            })
        }
    }
}

fn flatten(prefix: &str, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (key, nested) in map {
                let key = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}[{key}]")
                };
                flatten(&key, nested, out);
            }
        }
        Value::Array(items) => {
            for (index, nested) in items.iter().enumerate() {
                flatten(&format!("{prefix}[{index}]"), nested, out);
            }
        }
        // Booleans encode as 1/0, matching common form-decoder expectations.
        Value::Bool(flag) => out.push((prefix.to_owned(), if *flag { "1" } else { "0" }.into())),
        Value::Number(n) => out.push((prefix.to_owned(), n.to_string())),
        Value::String(s) => out.push((prefix.to_owned(), s.clone())),
        Value::Null => {}
    }
}

/// Form-encode a payload, flattening nested objects to bracketed keys
/// (`certificate[label]=...`).
pub fn form_encode(payload: &Value) -> Result<String, serde_urlencoded::ser::Error> {
    let mut pairs = Vec::new();
    flatten("", payload, &mut pairs);
    serde_urlencoded::to_string(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use exemptd_core::{CertificateRecord, CustomerContact, CustomerId};

    #[test]
    fn certificate_payload_carries_record_or_false() {
        let customer = CustomerId::new(9);
        let record = CertificateRecord::new(
            "/files/cert.pdf",
            "https://shop.example/cert.pdf",
            "cert.pdf",
            "application/pdf",
        );
        let payload = payload_for(&ChangeEvent::CertificateUpdated {
            customer,
            certificate: Some(record),
        });
        assert_eq!(payload["user_id"], 9);
        assert_eq!(payload["certificate"]["label"], "cert.pdf");
        assert_eq!(payload["certificate"]["type"], "application/pdf");

        let deleted = payload_for(&ChangeEvent::CertificateUpdated {
            customer,
            certificate: None,
        });
        assert_eq!(deleted["certificate"], false);
    }

    #[test]
    fn expiration_payload_duplicates_human_dates() {
        let payload = payload_for(&ChangeEvent::ExpirationUpdated {
            customer: CustomerId::new(9),
            expiration: Some(1_719_791_999), // 2024-06-30T23:59:59Z
            old_expiration: None,
        });
        assert_eq!(payload["timestamp"], 1_719_791_999_i64);
        assert_eq!(payload["Y-m-d"], "2024-06-30");
        assert_eq!(payload["date"], "Jun 30, 2024");
    }

    #[test]
    fn cleared_expiration_uses_falsy_placeholders() {
        let payload = payload_for(&ChangeEvent::ExpirationUpdated {
            customer: CustomerId::new(9),
            expiration: None,
            old_expiration: Some(1_719_791_999),
        });
        assert_eq!(payload["timestamp"], 0);
        assert_eq!(payload["Y-m-d"], false);
        assert_eq!(payload["date"], false);
    }

    #[test]
    fn status_payload_uses_false_for_not_exempt() {
        let exempt = payload_for(&ChangeEvent::StatusUpdated {
            customer: CustomerId::new(9),
            status: "wholesale".into(),
        });
        assert_eq!(exempt["exemption_status"], "wholesale");

        let revoked = payload_for(&ChangeEvent::StatusUpdated {
            customer: CustomerId::new(9),
            status: String::new(),
        });
        assert_eq!(revoked["exemption_status"], false);
    }

    #[test]
    fn approaching_payload_carries_contact() {
        let payload = payload_for(&ChangeEvent::ExpirationApproaching {
            customer: CustomerId::new(9),
            contact: CustomerContact {
                email: "pat@example.com".into(),
                first_name: "Pat".into(),
                last_name: "Lee".into(),
            },
            expiration: 1_719_791_999,
            days_left: 12,
        });
        assert_eq!(payload["user_email"], "pat@example.com");
        assert_eq!(payload["expiration_date"], "2024-06-30");
        assert_eq!(payload["days_left"], 12);
    }

    #[test]
    fn form_encoding_flattens_nested_keys() {
        let payload = json!({
            "user_id": 9,
            "certificate": {
                "label": "cert one.pdf",
                "type": "application/pdf",
            },
        });
        let encoded = form_encode(&payload).unwrap();
        assert!(encoded.contains("user_id=9"));
        assert!(encoded.contains("certificate%5Blabel%5D=cert+one.pdf"));
        assert!(encoded.contains("certificate%5Btype%5D=application%2Fpdf"));
    }

    #[test]
    fn form_encoding_booleans_and_nulls() {
        let payload = json!({"501c3": true, "certificate": false, "gone": null});
        let encoded = form_encode(&payload).unwrap();
        assert!(encoded.contains("501c3=1"));
        assert!(encoded.contains("certificate=0"));
        assert!(!encoded.contains("gone"));
    }
}
